//! The promotion engine: retyping literals, widening numerics, lifting to
//! nullable, and coercing enum constants.
//!
//! Promotion is the only way operand types ever change. It either returns
//! an expression whose type equals the requested target, or reports failure
//! by returning `None`; the caller decides which error that becomes.
//!
//! Integer, real, and string literals are re-lexed from their source text
//! (tracked in a parse-local [`LiteralTable`]) so that, e.g., `5` can
//! become a `Byte` constant without an intermediate conversion node.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use rust_decimal::Decimal;

use crate::ast::{Expr, LiteralId};
use crate::types::{self, is_compatible_with, TypeCode, TypeKind, TypeRef};
use crate::value::Value;

/// Source text of each tracked literal constant, local to one parse.
#[derive(Debug, Default)]
pub struct LiteralTable {
    texts: HashMap<LiteralId, String>,
    next: LiteralId,
}

impl LiteralTable {
    pub fn new() -> Self {
        LiteralTable::default()
    }

    /// Remember the source text of a literal; returns its id.
    pub fn track(&mut self, text: &str) -> LiteralId {
        let id = self.next;
        self.next += 1;
        self.texts.insert(id, text.to_string());
        id
    }

    pub fn text_of(&self, id: LiteralId) -> Option<&str> {
        self.texts.get(&id).map(|s| s.as_str())
    }
}

/// Promotion over one parse's literal table.
pub struct Promoter<'a> {
    literals: &'a LiteralTable,
}

impl<'a> Promoter<'a> {
    pub fn new(literals: &'a LiteralTable) -> Self {
        Promoter { literals }
    }

    /// Produce an expression of exactly `target` type, or `None`.
    ///
    /// `exact` forces a conversion node even for reference-compatible
    /// operands; it is set for enum comparisons, conditional reconciliation,
    /// and top-level result typing.
    pub fn promote(&self, expr: &Expr, target: &TypeRef, exact: bool) -> Option<Expr> {
        if expr.ty() == target {
            return Some(expr.clone());
        }

        if let Expr::Constant { value, ty, literal } = expr {
            if expr.is_null_literal() {
                if !target.is_value_type() || target.is_nullable() {
                    return Some(Expr::typed_constant(Value::Null, target.clone()));
                }
            } else if let Some(id) = literal {
                if let Some(text) = self.literals.text_of(*id) {
                    let inner = target.non_nullable();
                    let retyped = match ty.code() {
                        TypeCode::Int32 | TypeCode::UInt32 | TypeCode::Int64 | TypeCode::UInt64 => {
                            parse_number(text, &inner)
                        }
                        TypeCode::Double if inner == *types::DECIMAL => {
                            parse_number(text, &inner)
                        }
                        TypeCode::String => parse_enum(value, &inner),
                        _ => None,
                    };
                    if let Some(value) = retyped {
                        return Some(Expr::typed_constant(value, target.clone()));
                    }
                }
            }
        }

        if is_compatible_with(expr.ty(), target) {
            if target.is_value_type() || exact {
                return Some(Expr::Convert {
                    expr: Box::new(expr.clone()),
                    ty: target.clone(),
                    checked: true,
                });
            }
            return Some(expr.clone());
        }

        None
    }
}

/// Re-lex a numeric literal's source text as the given scalar type.
fn parse_number(text: &str, target: &TypeRef) -> Option<Value> {
    match target.code() {
        TypeCode::SByte => text.parse::<i8>().ok().map(Value::SByte),
        TypeCode::Byte => text.parse::<u8>().ok().map(Value::Byte),
        TypeCode::Int16 => text.parse::<i16>().ok().map(Value::Int16),
        TypeCode::UInt16 => text.parse::<u16>().ok().map(Value::UInt16),
        TypeCode::Int32 => text.parse::<i32>().ok().map(Value::Int32),
        TypeCode::UInt32 => text.parse::<u32>().ok().map(Value::UInt32),
        TypeCode::Int64 => text.parse::<i64>().ok().map(Value::Int64),
        TypeCode::UInt64 => text.parse::<u64>().ok().map(Value::UInt64),
        TypeCode::Single => text.parse::<f32>().ok().map(Value::Single),
        TypeCode::Double => text.parse::<f64>().ok().map(Value::Double),
        TypeCode::Decimal => Decimal::from_str(text).ok().map(Value::Decimal),
        _ => None,
    }
}

/// Look a string constant up as an enum member, case-insensitively.
fn parse_enum(value: &Value, target: &TypeRef) -> Option<Value> {
    let TypeKind::Enum(def) = target.kind() else {
        return None;
    };
    let Value::String(name) = value else {
        return None;
    };
    def.find_member(name).map(|(member, v)| Value::Enum {
        ty: target.clone(),
        member: member.to_string(),
        value: v,
    })
}

fn lifted_unary(tys: &[&TypeRef]) -> Vec<Vec<TypeRef>> {
    let mut out = Vec::new();
    for t in tys {
        out.push(vec![(*t).clone()]);
        out.push(vec![TypeRef::nullable_of((*t).clone())]);
    }
    out
}

fn lifted_pair(t: &TypeRef) -> Vec<Vec<TypeRef>> {
    let nullable = TypeRef::nullable_of(t.clone());
    vec![vec![t.clone(), t.clone()], vec![nullable.clone(), nullable]]
}

fn arithmetic_pairs() -> Vec<Vec<TypeRef>> {
    [
        &*types::INT32,
        &*types::UINT32,
        &*types::INT64,
        &*types::UINT64,
        &*types::SINGLE,
        &*types::DOUBLE,
        &*types::DECIMAL,
    ]
    .iter()
    .flat_map(|t| lifted_pair(t))
    .collect()
}

/// `{bool, bool?} × same` for `&&` and `||`.
pub static LOGICAL_SIGNATURES: LazyLock<Vec<Vec<TypeRef>>> =
    LazyLock::new(|| lifted_pair(&types::BOOL));

/// Arithmetic operand pairs for `* / %` and plain `+ -`.
pub static ARITHMETIC_SIGNATURES: LazyLock<Vec<Vec<TypeRef>>> = LazyLock::new(arithmetic_pairs);

/// Relational operand pairs: arithmetic plus string, char, DateTime,
/// TimeSpan (with nullables where they exist).
pub static RELATIONAL_SIGNATURES: LazyLock<Vec<Vec<TypeRef>>> = LazyLock::new(|| {
    let mut sigs = arithmetic_pairs();
    sigs.push(vec![types::STRING.clone(), types::STRING.clone()]);
    sigs.extend(lifted_pair(&types::CHAR));
    sigs.extend(lifted_pair(&types::DATETIME));
    sigs.extend(lifted_pair(&types::TIMESPAN));
    sigs
});

/// Equality operand pairs: relational plus bool and Guid.
pub static EQUALITY_SIGNATURES: LazyLock<Vec<Vec<TypeRef>>> = LazyLock::new(|| {
    let mut sigs = RELATIONAL_SIGNATURES.clone();
    sigs.extend(lifted_pair(&types::BOOL));
    sigs.extend(lifted_pair(&types::GUID));
    sigs
});

/// Additive pairs: arithmetic plus `DateTime + TimeSpan` and
/// `TimeSpan + TimeSpan`.
pub static ADD_SIGNATURES: LazyLock<Vec<Vec<TypeRef>>> = LazyLock::new(|| {
    let mut sigs = arithmetic_pairs();
    sigs.push(vec![types::DATETIME.clone(), types::TIMESPAN.clone()]);
    sigs.push(vec![
        TypeRef::nullable_of(types::DATETIME.clone()),
        TypeRef::nullable_of(types::TIMESPAN.clone()),
    ]);
    sigs.extend(lifted_pair(&types::TIMESPAN));
    sigs
});

/// Subtractive pairs: additive plus `DateTime - DateTime`.
pub static SUBTRACT_SIGNATURES: LazyLock<Vec<Vec<TypeRef>>> = LazyLock::new(|| {
    let mut sigs = ADD_SIGNATURES.clone();
    sigs.extend(lifted_pair(&types::DATETIME));
    sigs
});

/// Unary minus operands.
pub static NEGATION_SIGNATURES: LazyLock<Vec<Vec<TypeRef>>> = LazyLock::new(|| {
    lifted_unary(&[
        &*types::INT32,
        &*types::INT64,
        &*types::SINGLE,
        &*types::DOUBLE,
        &*types::DECIMAL,
    ])
});

/// Unary not operands.
pub static NOT_SIGNATURES: LazyLock<Vec<Vec<TypeRef>>> =
    LazyLock::new(|| lifted_unary(&[&*types::BOOL]));
