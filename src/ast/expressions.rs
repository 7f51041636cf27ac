//! The typed expression tree the parser emits.
//!
//! Every node knows its host type ([`Expr::ty`]); the parser only builds a
//! node after the promotion engine and overload resolver have agreed on the
//! operand types, so a constructed tree is always well-typed.

use crate::ast::{BinaryOp, UnaryOp};
use crate::types::{self, TypeRef};
use crate::value::Value;

/// A named, typed parameter (lambda input or iteration-scope variable).
///
/// Iteration-scope parameters pushed by aggregate calls are anonymous
/// (empty name).
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
}

impl Parameter {
    pub fn new(name: &str, ty: TypeRef) -> Self {
        Parameter { name: name.to_string(), ty }
    }

    pub fn anonymous(ty: TypeRef) -> Self {
        Parameter { name: String::new(), ty }
    }
}

/// Receiver of a call node.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// Instance method call
    Instance(Box<Expr>),
    /// Static method call on the named type
    Static(TypeRef),
    /// A standard set operation on the host's sequence-operator surface
    /// (`Where`, `Any`, `Select`, ...)
    Sequence,
}

/// Identifier of a tracked literal constant, local to one parse.
pub type LiteralId = u32;

/// Typed expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal or substituted constant
    ///
    /// `literal` links integer, real, and string literals back to the
    /// parse-local source-text table so promotion can re-lex them into a
    /// narrower target type. Re-typed constants drop the link.
    Constant { value: Value, ty: TypeRef, literal: Option<LiteralId> },

    /// Reference to a lambda parameter or iteration-scope variable
    Parameter(Parameter),

    /// `-x`, `!x`
    Unary { op: UnaryOp, operand: Box<Expr>, ty: TypeRef },

    /// Arithmetic, comparison, or short-circuit logical operation
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr>, ty: TypeRef },

    /// `test ? if_true : if_false` (also spelled `iif(...)`)
    Conditional { test: Box<Expr>, if_true: Box<Expr>, if_false: Box<Expr>, ty: TypeRef },

    /// Numeric/enum/nullable conversion; `checked` converts trap overflow
    Convert { expr: Box<Expr>, ty: TypeRef, checked: bool },

    /// `x is T`
    TypeIs { expr: Box<Expr>, target: TypeRef },

    /// `x as T`
    TypeAs { expr: Box<Expr>, ty: TypeRef },

    /// Property or field access
    Member { instance: Box<Expr>, name: String, ty: TypeRef },

    /// Single-dimensional array element access
    ArrayIndex { array: Box<Expr>, index: Box<Expr>, ty: TypeRef },

    /// Indexer access on a non-array type
    Index { instance: Box<Expr>, args: Vec<Expr>, ty: TypeRef },

    /// Method call; sequence-operator calls carry explicit type arguments
    Call {
        target: CallTarget,
        method: String,
        type_args: Vec<TypeRef>,
        args: Vec<Expr>,
        ty: TypeRef,
    },

    /// Invocation of a lambda-valued substitution
    Invoke { lambda: Box<Expr>, args: Vec<Expr>, ty: TypeRef },

    /// Lambda abstraction; `ty` is the corresponding `Function` type
    Lambda { params: Vec<Parameter>, body: Box<Expr>, ty: TypeRef },

    /// Constructor call
    New { ty: TypeRef, args: Vec<Expr> },

    /// Anonymous-record construction: bind each synthesized property
    MemberInit { ty: TypeRef, bindings: Vec<(String, Expr)> },
}

impl Expr {
    /// Constant with the value's natural type, not linked to source text.
    pub fn constant(value: Value) -> Expr {
        let ty = value.type_of();
        Expr::Constant { value, ty, literal: None }
    }

    /// Constant re-typed by promotion or substitution.
    pub fn typed_constant(value: Value, ty: TypeRef) -> Expr {
        Expr::Constant { value, ty, literal: None }
    }

    pub fn parameter(param: Parameter) -> Expr {
        Expr::Parameter(param)
    }

    /// Wrap a body in a lambda over `params`.
    pub fn lambda(params: Vec<Parameter>, body: Expr) -> Expr {
        let ty = TypeRef::function_of(
            params.iter().map(|p| p.ty.clone()).collect(),
            body.ty().clone(),
        );
        Expr::Lambda { params, body: Box::new(body), ty }
    }

    /// The host type of this node.
    pub fn ty(&self) -> &TypeRef {
        match self {
            Expr::Constant { ty, .. } => ty,
            Expr::Parameter(param) => &param.ty,
            Expr::Unary { ty, .. } => ty,
            Expr::Binary { ty, .. } => ty,
            Expr::Conditional { ty, .. } => ty,
            Expr::Convert { ty, .. } => ty,
            Expr::TypeIs { .. } => &types::BOOL,
            Expr::TypeAs { ty, .. } => ty,
            Expr::Member { ty, .. } => ty,
            Expr::ArrayIndex { ty, .. } => ty,
            Expr::Index { ty, .. } => ty,
            Expr::Call { ty, .. } => ty,
            Expr::Invoke { ty, .. } => ty,
            Expr::Lambda { ty, .. } => ty,
            Expr::New { ty, .. } => ty,
            Expr::MemberInit { ty, .. } => ty,
        }
    }

    /// The untyped `null` keyword, before promotion gives it a type.
    pub fn is_null_literal(&self) -> bool {
        matches!(
            self,
            Expr::Constant { value: Value::Null, ty, .. } if *ty == *types::OBJECT
        )
    }
}
