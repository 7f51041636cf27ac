//! Constant values carried by expression-tree nodes.
//!
//! The language never executes expressions, but constants still need a
//! concrete representation: literals produced by the lexer, re-typed
//! literals produced by the promotion engine, and host values handed in
//! through the positional substitution table (`@0`, `@1`, ...).
//!
//! The distinction between every member of the numeric tower is preserved;
//! `Decimal` is exact ([`rust_decimal::Decimal`]), dates and durations use
//! chrono, and the GUID-equivalent is a [`uuid::Uuid`].

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ast::Expr;
use crate::types::{self, TypeRef};

/// A typed constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The untyped null literal (and typed nulls after promotion)
    Null,
    Bool(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    Char(char),
    String(String),
    DateTime(NaiveDateTime),
    TimeSpan(Duration),
    Guid(Uuid),
    /// A member of a named enumeration
    Enum { ty: TypeRef, member: String, value: i64 },
    /// A pre-parsed lambda handed in as a substitution value
    Lambda(Box<Expr>),
    /// String-keyed bundle; legal only as the final substitution value,
    /// where it becomes the externals table
    Dict(HashMap<String, Value>),
}

impl Value {
    /// The host type of this constant. `Null` reports `Object` until a
    /// promotion assigns it a typed-null form.
    pub fn type_of(&self) -> TypeRef {
        match self {
            Value::Null => types::OBJECT.clone(),
            Value::Bool(_) => types::BOOL.clone(),
            Value::SByte(_) => types::SBYTE.clone(),
            Value::Byte(_) => types::BYTE.clone(),
            Value::Int16(_) => types::INT16.clone(),
            Value::UInt16(_) => types::UINT16.clone(),
            Value::Int32(_) => types::INT32.clone(),
            Value::UInt32(_) => types::UINT32.clone(),
            Value::Int64(_) => types::INT64.clone(),
            Value::UInt64(_) => types::UINT64.clone(),
            Value::Single(_) => types::SINGLE.clone(),
            Value::Double(_) => types::DOUBLE.clone(),
            Value::Decimal(_) => types::DECIMAL.clone(),
            Value::Char(_) => types::CHAR.clone(),
            Value::String(_) => types::STRING.clone(),
            Value::DateTime(_) => types::DATETIME.clone(),
            Value::TimeSpan(_) => types::TIMESPAN.clone(),
            Value::Guid(_) => types::GUID.clone(),
            Value::Enum { ty, .. } => ty.clone(),
            Value::Lambda(lambda) => lambda.ty().clone(),
            Value::Dict(_) => types::OBJECT.clone(),
        }
    }

    /// Render the constant the way it would appear in source text.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::SByte(n) => n.to_string(),
            Value::Byte(n) => n.to_string(),
            Value::Int16(n) => n.to_string(),
            Value::UInt16(n) => n.to_string(),
            Value::Int32(n) => n.to_string(),
            Value::UInt32(n) => n.to_string(),
            Value::Int64(n) => n.to_string(),
            Value::UInt64(n) => n.to_string(),
            Value::Single(n) => n.to_string(),
            Value::Double(n) => n.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Char(c) => format!("'{}'", c),
            Value::String(s) => format!("\"{}\"", s),
            Value::DateTime(dt) => dt.to_string(),
            Value::TimeSpan(d) => d.to_string(),
            Value::Guid(g) => g.to_string(),
            Value::Enum { ty, member, .. } => format!("{}.{}", ty, member),
            Value::Lambda(_) => "<lambda>".to_string(),
            Value::Dict(_) => "<externals>".to_string(),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::SByte(n) => n.hash(state),
            Value::Byte(n) => n.hash(state),
            Value::Int16(n) => n.hash(state),
            Value::UInt16(n) => n.hash(state),
            Value::Int32(n) => n.hash(state),
            Value::UInt32(n) => n.hash(state),
            Value::Int64(n) => n.hash(state),
            Value::UInt64(n) => n.hash(state),
            Value::Single(n) => n.to_bits().hash(state),
            Value::Double(n) => n.to_bits().hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::Char(c) => c.hash(state),
            Value::String(s) => s.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            Value::TimeSpan(d) => {
                d.num_seconds().hash(state);
                d.subsec_nanos().hash(state);
            }
            Value::Guid(g) => g.hash(state),
            Value::Enum { ty, member, value } => {
                ty.hash(state);
                member.hash(state);
                value.hash(state);
            }
            // Lambdas and externals bundles never live in record slots;
            // the discriminant alone is enough
            Value::Lambda(_) | Value::Dict(_) => {}
        }
    }
}
