//! Thin query-builder surface over the parser.
//!
//! A [`DynamicQuery`] starts from a named, sequence-typed root and chains
//! sequence-operator calls whose bodies are parsed expression strings, the
//! element type standing in as `it`. The result is a single typed
//! expression tree a host query provider can translate.

use crate::ast::{CallTarget, Expr, Parameter};
use crate::error::ParseError;
use crate::parser;
use crate::types::{self, TypeRef};
use crate::value::Value;

/// A chain of sequence operations over a typed source.
#[derive(Debug, Clone)]
pub struct DynamicQuery {
    expr: Expr,
    element: TypeRef,
    extra_types: Vec<TypeRef>,
}

fn sequence_call(
    method: &str,
    type_args: Vec<TypeRef>,
    args: Vec<Expr>,
    ty: TypeRef,
) -> Expr {
    Expr::Call { target: CallTarget::Sequence, method: method.to_string(), type_args, args, ty }
}

impl DynamicQuery {
    /// Query rooted at a parameter named `source_name`, enumerating
    /// `element` values.
    pub fn new(source_name: &str, element: TypeRef) -> Self {
        let root = Expr::Parameter(Parameter::new(
            source_name,
            TypeRef::sequence_of(element.clone()),
        ));
        DynamicQuery { expr: root, element, extra_types: Vec::new() }
    }

    /// Make additional types referenceable inside expression strings.
    pub fn with_types(mut self, extra_types: &[TypeRef]) -> Self {
        self.extra_types = extra_types.to_vec();
        self
    }

    pub fn element(&self) -> &TypeRef {
        &self.element
    }

    /// Finish the chain and take the accumulated tree.
    pub fn into_expr(self) -> Expr {
        self.expr
    }

    fn parse_body(&self, result: Option<&TypeRef>, text: &str) -> Result<Expr, ParseError> {
        parser::parse_lambda_it(
            self.element.clone(),
            result,
            text,
            &self.extra_types,
            vec![],
        )
    }

    /// `Where` with a boolean predicate.
    pub fn filter(mut self, predicate: &str) -> Result<Self, ParseError> {
        let lambda = self.parse_body(Some(&types::BOOL), predicate)?;
        let ty = TypeRef::sequence_of(self.element.clone());
        self.expr = sequence_call(
            "Where",
            vec![self.element.clone()],
            vec![self.expr, lambda],
            ty,
        );
        Ok(self)
    }

    /// `Select`; the element type becomes the selector's result type.
    pub fn select(mut self, selector: &str) -> Result<Self, ParseError> {
        let lambda = self.parse_body(None, selector)?;
        let Expr::Lambda { ref body, .. } = lambda else {
            unreachable!("parse_lambda_it always yields a lambda");
        };
        let result = body.ty().clone();
        let ty = TypeRef::sequence_of(result.clone());
        self.expr = sequence_call(
            "Select",
            vec![self.element.clone(), result.clone()],
            vec![self.expr, lambda],
            ty,
        );
        self.element = result;
        Ok(self)
    }

    /// `OrderBy`/`ThenBy` chain from a comma-separated ordering string.
    pub fn order_by(mut self, ordering: &str) -> Result<Self, ParseError> {
        let clauses =
            parser::parse_ordering(self.element.clone(), ordering, &self.extra_types, vec![])?;
        let ty = TypeRef::sequence_of(self.element.clone());
        for (i, clause) in clauses.into_iter().enumerate() {
            let method = match (i, clause.ascending) {
                (0, true) => "OrderBy",
                (0, false) => "OrderByDescending",
                (_, true) => "ThenBy",
                (_, false) => "ThenByDescending",
            };
            let key_ty = clause.selector.ty().clone();
            let lambda = Expr::lambda(vec![clause.parameter], clause.selector);
            self.expr = sequence_call(
                method,
                vec![self.element.clone(), key_ty],
                vec![self.expr, lambda],
                ty.clone(),
            );
        }
        Ok(self)
    }

    pub fn take(mut self, count: i32) -> Self {
        let ty = TypeRef::sequence_of(self.element.clone());
        self.expr = sequence_call(
            "Take",
            vec![self.element.clone()],
            vec![self.expr, Expr::constant(Value::Int32(count))],
            ty,
        );
        self
    }

    pub fn skip(mut self, count: i32) -> Self {
        let ty = TypeRef::sequence_of(self.element.clone());
        self.expr = sequence_call(
            "Skip",
            vec![self.element.clone()],
            vec![self.expr, Expr::constant(Value::Int32(count))],
            ty,
        );
        self
    }

    /// `Any`, optionally with a predicate; ends the chain.
    pub fn any(self, predicate: Option<&str>) -> Result<Expr, ParseError> {
        self.terminal("Any", types::BOOL.clone(), predicate)
    }

    /// `Count`, optionally with a predicate; ends the chain.
    pub fn count(self, predicate: Option<&str>) -> Result<Expr, ParseError> {
        self.terminal("Count", types::INT32.clone(), predicate)
    }

    /// `FirstOrDefault`, optionally with a predicate; ends the chain.
    pub fn first_or_default(self, predicate: Option<&str>) -> Result<Expr, ParseError> {
        let element = self.element.clone();
        self.terminal("FirstOrDefault", element, predicate)
    }

    fn terminal(
        self,
        method: &str,
        ty: TypeRef,
        predicate: Option<&str>,
    ) -> Result<Expr, ParseError> {
        let mut args = vec![];
        if let Some(text) = predicate {
            args.push(self.parse_body(Some(&types::BOOL), text)?);
        }
        let mut call_args = vec![self.expr];
        call_args.extend(args);
        Ok(sequence_call(method, vec![self.element], call_args, ty))
    }
}
