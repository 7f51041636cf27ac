//! Query-aggregate dispatch.
//!
//! A call on an enumerable receiver (`xs.Any(...)`, `xs.Sum(...)`) is
//! resolved against a fixed signature table rather than the receiver's own
//! methods, and assembled into a call on the host's sequence-operator
//! surface with explicit type arguments. The body argument, if any, was
//! parsed with a fresh iteration-scope parameter; it becomes a lambda over
//! that parameter — except for `Contains`, whose argument is a plain value.

use std::sync::LazyLock;

use crate::ast::{CallTarget, Expr, Parameter};
use crate::promote::Promoter;
use crate::resolve::{resolve_overloads, Resolution};
use crate::types::{self, TypeCode, TypeRef};

struct AggregateSig {
    name: &'static str,
    params: Vec<TypeRef>,
}

fn sig(name: &'static str, params: Vec<TypeRef>) -> AggregateSig {
    AggregateSig { name, params }
}

fn numeric_selectors(name: &'static str) -> Vec<AggregateSig> {
    [&*types::INT32, &*types::INT64, &*types::SINGLE, &*types::DOUBLE, &*types::DECIMAL]
        .iter()
        .flat_map(|t| {
            [
                sig(name, vec![(*t).clone()]),
                sig(name, vec![TypeRef::nullable_of((*t).clone())]),
            ]
        })
        .collect()
}

static TABLE: LazyLock<Vec<AggregateSig>> = LazyLock::new(|| {
    let boolean = || types::BOOL.clone();
    let any = || types::OBJECT.clone();
    let mut table = vec![
        sig("Where", vec![boolean()]),
        sig("Any", vec![]),
        sig("Any", vec![boolean()]),
        sig("All", vec![boolean()]),
        sig("Count", vec![]),
        sig("Count", vec![boolean()]),
        sig("First", vec![]),
        sig("First", vec![boolean()]),
        sig("FirstOrDefault", vec![]),
        sig("FirstOrDefault", vec![boolean()]),
        sig("Min", vec![any()]),
        sig("Max", vec![any()]),
        sig("Select", vec![any()]),
        sig("SelectMany", vec![any()]),
        sig("GroupBy", vec![any()]),
        sig("Distinct", vec![]),
        sig("Distinct", vec![boolean()]),
        sig("Union", vec![]),
        sig("Union", vec![boolean()]),
        sig("Concat", vec![]),
        sig("Concat", vec![boolean()]),
    ];
    table.extend(numeric_selectors("Sum"));
    table.extend(numeric_selectors("Average"));
    for t in [
        &*types::INT32,
        &*types::UINT32,
        &*types::INT64,
        &*types::UINT64,
        &*types::SINGLE,
        &*types::DOUBLE,
        &*types::DECIMAL,
    ] {
        table.push(sig("Contains", vec![t.clone()]));
        table.push(sig("Contains", vec![TypeRef::nullable_of(t.clone())]));
    }
    table.push(sig("Contains", vec![types::STRING.clone()]));
    table
});

/// A fully-assembled sequence-operator call.
pub struct ResolvedAggregate {
    pub method: &'static str,
    pub type_args: Vec<TypeRef>,
    pub args: Vec<Expr>,
    pub ty: TypeRef,
}

/// Resolve `name(args)` on an enumerable of `element`, where `inner` is the
/// iteration parameter the arguments were parsed against. `None` means no
/// aggregate form applies.
pub fn dispatch(
    promoter: &Promoter,
    name: &str,
    receiver: Expr,
    element: &TypeRef,
    inner: &Parameter,
    parsed_args: &[Expr],
) -> Option<ResolvedAggregate> {
    let matches: Vec<&AggregateSig> =
        TABLE.iter().filter(|s| s.name.eq_ignore_ascii_case(name)).collect();
    if matches.is_empty() {
        return None;
    }

    let param_lists: Vec<&[TypeRef]> = matches.iter().map(|s| s.params.as_slice()).collect();
    let (entry, promoted) = match resolve_overloads(promoter, &param_lists, parsed_args) {
        Resolution::Matched { index, args } => (matches[index], args),
        _ => return None,
    };

    let body = promoted.into_iter().next();
    let ty = result_type(entry, element, body.as_ref())?;

    let type_args = match entry.name {
        "Min" | "Max" => vec![element.clone(), body.as_ref().unwrap().ty().clone()],
        _ => vec![element.clone()],
    };

    let args = match body {
        None => vec![receiver],
        Some(arg) if entry.name == "Contains" => vec![receiver, arg],
        Some(arg) => vec![receiver, Expr::lambda(vec![inner.clone()], arg)],
    };

    Some(ResolvedAggregate { method: entry.name, type_args, args, ty })
}

fn result_type(entry: &AggregateSig, element: &TypeRef, body: Option<&Expr>) -> Option<TypeRef> {
    let ty = match entry.name {
        "Where" | "Distinct" | "Union" | "Concat" => TypeRef::sequence_of(element.clone()),
        "Any" | "All" | "Contains" => types::BOOL.clone(),
        "Count" => types::INT32.clone(),
        "First" | "FirstOrDefault" => element.clone(),
        "Min" | "Max" => body?.ty().clone(),
        "Sum" => entry.params[0].clone(),
        "Average" => average_type(&entry.params[0]),
        "Select" => TypeRef::sequence_of(body?.ty().clone()),
        "SelectMany" => TypeRef::sequence_of(body?.ty().element_type()?),
        "GroupBy" => {
            TypeRef::sequence_of(TypeRef::grouping_of(body?.ty().clone(), element.clone()))
        }
        _ => return None,
    };
    Some(ty)
}

fn average_type(param: &TypeRef) -> TypeRef {
    let base = match param.non_nullable().code() {
        TypeCode::Int32 | TypeCode::Int64 => types::DOUBLE.clone(),
        TypeCode::Single => types::SINGLE.clone(),
        TypeCode::Decimal => types::DECIMAL.clone(),
        _ => types::DOUBLE.clone(),
    };
    if param.is_nullable() {
        TypeRef::nullable_of(base)
    } else {
        base
    }
}

/// Build the IR node for a resolved aggregate.
pub fn into_call(resolved: ResolvedAggregate) -> Expr {
    Expr::Call {
        target: CallTarget::Sequence,
        method: resolved.method.to_string(),
        type_args: resolved.type_args,
        args: resolved.args,
        ty: resolved.ty,
    }
}
