//! The host type system the expression language is typed against.
//!
//! [`TypeRef`] is a cheap, clonable handle over a [`TypeKind`]. The
//! predefined scalar types (the numeric tower, `String`, `DateTime`,
//! `TimeSpan`, `Guid`, ...) are exposed as lazily-built statics; composite
//! forms (`Nullable`, arrays, sequences, functions) and caller-defined
//! nominal types ([`ClassDef`], [`EnumDef`]) are built through the
//! constructor helpers.
//!
//! The module also carries the type predicates the promotion engine and
//! overload resolver are built on: nullable detection, numeric-kind
//! classification, assignability, and the widening-based compatibility
//! relation [`is_compatible_with`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, LazyLock};

/// Shape of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The root reference type; everything is assignable to it
    Object,
    Bool,
    Char,
    String,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    DateTime,
    TimeSpan,
    Guid,
    /// Return "type" of methods that produce no value; never a valid operand
    Void,
    /// Value-type wrapper with a single inner type
    Nullable(TypeRef),
    /// Indexable, enumerable storage; `rank` is 1 for ordinary arrays
    Array { element: TypeRef, rank: usize },
    /// The generic-enumerable interface
    Sequence(TypeRef),
    /// Result element of `GroupBy`: enumerable of `element` with a `Key`
    Grouping { key: TypeRef, element: TypeRef },
    /// Lambda values handed in through the substitution table
    Function { params: Vec<TypeRef>, result: TypeRef },
    Enum(Arc<EnumDef>),
    Class(Arc<ClassDef>),
}

/// Handle to a type. Clones share the underlying definition.
#[derive(Clone)]
pub struct TypeRef(Arc<TypeKind>);

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self)
    }
}

/// Scalar classification used by the widening matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Object,
    Bool,
    Char,
    String,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    DateTime,
    TimeSpan,
    Guid,
}

/// Broad numeric grouping of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    NotNumeric,
    /// Char and the floating/decimal types
    Floating,
    Signed,
    Unsigned,
}

impl TypeRef {
    pub fn new(kind: TypeKind) -> Self {
        TypeRef(Arc::new(kind))
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    pub fn nullable_of(inner: TypeRef) -> TypeRef {
        TypeRef::new(TypeKind::Nullable(inner))
    }

    pub fn sequence_of(element: TypeRef) -> TypeRef {
        TypeRef::new(TypeKind::Sequence(element))
    }

    pub fn array_of(element: TypeRef) -> TypeRef {
        TypeRef::new(TypeKind::Array { element, rank: 1 })
    }

    pub fn array_with_rank(element: TypeRef, rank: usize) -> TypeRef {
        TypeRef::new(TypeKind::Array { element, rank })
    }

    pub fn grouping_of(key: TypeRef, element: TypeRef) -> TypeRef {
        TypeRef::new(TypeKind::Grouping { key, element })
    }

    pub fn function_of(params: Vec<TypeRef>, result: TypeRef) -> TypeRef {
        TypeRef::new(TypeKind::Function { params, result })
    }

    /// Is this the single-inner-type value wrapper?
    pub fn is_nullable(&self) -> bool {
        matches!(self.kind(), TypeKind::Nullable(_))
    }

    /// Unwrap one level of `Nullable`, otherwise identity.
    pub fn non_nullable(&self) -> TypeRef {
        match self.kind() {
            TypeKind::Nullable(inner) => inner.clone(),
            _ => self.clone(),
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind(), TypeKind::Enum(_))
    }

    pub fn is_value_type(&self) -> bool {
        !matches!(
            self.kind(),
            TypeKind::Object
                | TypeKind::String
                | TypeKind::Void
                | TypeKind::Array { .. }
                | TypeKind::Sequence(_)
                | TypeKind::Grouping { .. }
                | TypeKind::Function { .. }
                | TypeKind::Class(_)
        )
    }

    /// Interface-like types, for the explicit-conversion rule.
    pub fn is_interface(&self) -> bool {
        matches!(self.kind(), TypeKind::Sequence(_) | TypeKind::Grouping { .. })
    }

    /// Element type if this type is enumerable. `String` deliberately is not.
    pub fn element_type(&self) -> Option<TypeRef> {
        match self.kind() {
            TypeKind::Sequence(element) => Some(element.clone()),
            TypeKind::Array { element, rank: 1 } => Some(element.clone()),
            TypeKind::Grouping { element, .. } => Some(element.clone()),
            _ => None,
        }
    }

    /// Scalar classification of this exact type (no nullable unwrapping).
    pub fn code(&self) -> TypeCode {
        match self.kind() {
            TypeKind::Bool => TypeCode::Bool,
            TypeKind::Char => TypeCode::Char,
            TypeKind::String => TypeCode::String,
            TypeKind::SByte => TypeCode::SByte,
            TypeKind::Byte => TypeCode::Byte,
            TypeKind::Int16 => TypeCode::Int16,
            TypeKind::UInt16 => TypeCode::UInt16,
            TypeKind::Int32 => TypeCode::Int32,
            TypeKind::UInt32 => TypeCode::UInt32,
            TypeKind::Int64 => TypeCode::Int64,
            TypeKind::UInt64 => TypeCode::UInt64,
            TypeKind::Single => TypeCode::Single,
            TypeKind::Double => TypeCode::Double,
            TypeKind::Decimal => TypeCode::Decimal,
            TypeKind::DateTime => TypeCode::DateTime,
            TypeKind::TimeSpan => TypeCode::TimeSpan,
            TypeKind::Guid => TypeCode::Guid,
            _ => TypeCode::Object,
        }
    }

    /// Numeric grouping of the non-nullable form. Enums are not numeric.
    pub fn numeric_kind(&self) -> NumericKind {
        match self.non_nullable().code() {
            TypeCode::Char | TypeCode::Single | TypeCode::Double | TypeCode::Decimal => {
                NumericKind::Floating
            }
            TypeCode::SByte | TypeCode::Int16 | TypeCode::Int32 | TypeCode::Int64 => {
                NumericKind::Signed
            }
            TypeCode::Byte | TypeCode::UInt16 | TypeCode::UInt32 | TypeCode::UInt64 => {
                NumericKind::Unsigned
            }
            _ => NumericKind::NotNumeric,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_kind() != NumericKind::NotNumeric
    }

    pub fn is_signed_integral(&self) -> bool {
        self.numeric_kind() == NumericKind::Signed
    }

    pub fn is_unsigned_integral(&self) -> bool {
        self.numeric_kind() == NumericKind::Unsigned
    }

    /// Can a value of `source` be assigned to a slot of this type without
    /// conversion? Reference-side rule only; widening is handled by
    /// [`is_compatible_with`].
    pub fn is_assignable_from(&self, source: &TypeRef) -> bool {
        if self == source {
            return true;
        }
        match self.kind() {
            TypeKind::Object => true,
            TypeKind::Sequence(element) => source.element_type().as_ref() == Some(element),
            TypeKind::Class(_) => {
                let mut current = source.clone();
                loop {
                    let base = match current.kind() {
                        TypeKind::Class(def) => def.base.clone(),
                        _ => None,
                    };
                    match base {
                        Some(b) => {
                            if &b == self {
                                return true;
                            }
                            current = b;
                        }
                        None => return false,
                    }
                }
            }
            _ => false,
        }
    }

    /// This type followed by its base types, ending at `Object`.
    pub fn self_and_bases(&self) -> Vec<TypeRef> {
        let mut chain = vec![self.clone()];
        let mut current = self.clone();
        loop {
            let base = match current.kind() {
                TypeKind::Class(def) => def.base.clone(),
                _ => None,
            };
            match base {
                Some(base) => {
                    chain.push(base.clone());
                    current = base;
                }
                None => break,
            }
        }
        if !matches!(self.kind(), TypeKind::Object) {
            chain.push(OBJECT.clone());
        }
        chain
    }

    /// Short display name, e.g. `Int32`, `Int32?`, `String[]`.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Dotted name used by qualified type references, e.g. `System.String`.
    pub fn full_name(&self) -> String {
        match self.kind() {
            TypeKind::Enum(def) => def.name.clone(),
            TypeKind::Class(def) => def.name.clone(),
            TypeKind::Nullable(_)
            | TypeKind::Array { .. }
            | TypeKind::Sequence(_)
            | TypeKind::Grouping { .. }
            | TypeKind::Function { .. } => self.to_string(),
            _ => format!("System.{}", self),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TypeKind::Object => write!(f, "Object"),
            TypeKind::Bool => write!(f, "Boolean"),
            TypeKind::Char => write!(f, "Char"),
            TypeKind::String => write!(f, "String"),
            TypeKind::SByte => write!(f, "SByte"),
            TypeKind::Byte => write!(f, "Byte"),
            TypeKind::Int16 => write!(f, "Int16"),
            TypeKind::UInt16 => write!(f, "UInt16"),
            TypeKind::Int32 => write!(f, "Int32"),
            TypeKind::UInt32 => write!(f, "UInt32"),
            TypeKind::Int64 => write!(f, "Int64"),
            TypeKind::UInt64 => write!(f, "UInt64"),
            TypeKind::Single => write!(f, "Single"),
            TypeKind::Double => write!(f, "Double"),
            TypeKind::Decimal => write!(f, "Decimal"),
            TypeKind::DateTime => write!(f, "DateTime"),
            TypeKind::TimeSpan => write!(f, "TimeSpan"),
            TypeKind::Guid => write!(f, "Guid"),
            TypeKind::Void => write!(f, "Void"),
            TypeKind::Nullable(inner) => write!(f, "{}?", inner),
            TypeKind::Array { element, rank } => {
                write!(f, "{}[{}]", element, ",".repeat(rank.saturating_sub(1)))
            }
            TypeKind::Sequence(element) => write!(f, "Sequence<{}>", element),
            TypeKind::Grouping { key, element } => write!(f, "Grouping<{}, {}>", key, element),
            TypeKind::Function { params, result } => {
                write!(f, "Func<")?;
                for p in params {
                    write!(f, "{}, ", p)?;
                }
                write!(f, "{}>", result)
            }
            TypeKind::Enum(def) => write!(f, "{}", def.name),
            TypeKind::Class(def) => write!(f, "{}", def.name),
        }
    }
}

/// Named enumeration type with explicit member values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<(String, i64)>,
}

impl EnumDef {
    pub fn new(name: &str, members: Vec<(&str, i64)>) -> TypeRef {
        TypeRef::new(TypeKind::Enum(Arc::new(EnumDef {
            name: name.to_string(),
            members: members.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
        })))
    }

    /// Case-insensitive member lookup; returns the canonical name and value.
    pub fn find_member(&self, name: &str) -> Option<(&str, i64)> {
        self.members
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(n, v)| (n.as_str(), *v))
    }

    /// The widening matrix sees an enum source through its underlying type.
    pub fn underlying_code(&self) -> TypeCode {
        TypeCode::Int32
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
    pub is_static: bool,
}

impl MethodDef {
    pub fn instance(name: &str, params: Vec<TypeRef>, ret: TypeRef) -> Self {
        MethodDef { name: name.to_string(), params, ret, is_static: false }
    }

    pub fn static_method(name: &str, params: Vec<TypeRef>, ret: TypeRef) -> Self {
        MethodDef { name: name.to_string(), params, ret, is_static: true }
    }
}

#[derive(Debug, Clone)]
pub struct IndexerDef {
    pub params: Vec<TypeRef>,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct CtorDef {
    pub params: Vec<TypeRef>,
}

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Caller-defined (or record-factory-synthesized) nominal type.
///
/// Identity is nominal: two `ClassDef`s are the same type only if they came
/// from the same `ClassDef::new` call, regardless of member shape.
#[derive(Debug)]
pub struct ClassDef {
    id: u64,
    pub name: String,
    pub base: Option<TypeRef>,
    pub properties: Vec<PropertyDef>,
    pub methods: Vec<MethodDef>,
    pub indexers: Vec<IndexerDef>,
    pub constructors: Vec<CtorDef>,
}

impl ClassDef {
    pub fn new(name: &str) -> ClassDef {
        ClassDef {
            id: NEXT_CLASS_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: name.to_string(),
            base: None,
            properties: Vec::new(),
            methods: Vec::new(),
            indexers: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_property(mut self, name: &str, ty: TypeRef) -> Self {
        self.properties.push(PropertyDef { name: name.to_string(), ty });
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_indexer(mut self, params: Vec<TypeRef>, ty: TypeRef) -> Self {
        self.indexers.push(IndexerDef { params, ty });
        self
    }

    pub fn with_constructor(mut self, params: Vec<TypeRef>) -> Self {
        self.constructors.push(CtorDef { params });
        self
    }

    pub fn into_type(self) -> TypeRef {
        TypeRef::new(TypeKind::Class(Arc::new(self)))
    }
}

impl PartialEq for ClassDef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassDef {}

impl Hash for ClassDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

pub static OBJECT: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Object));
pub static BOOL: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Bool));
pub static CHAR: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Char));
pub static STRING: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::String));
pub static SBYTE: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::SByte));
pub static BYTE: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Byte));
pub static INT16: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Int16));
pub static UINT16: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::UInt16));
pub static INT32: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Int32));
pub static UINT32: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::UInt32));
pub static INT64: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Int64));
pub static UINT64: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::UInt64));
pub static SINGLE: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Single));
pub static DOUBLE: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Double));
pub static DECIMAL: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Decimal));
pub static DATETIME: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::DateTime));
pub static TIMESPAN: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::TimeSpan));
pub static GUID: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Guid));
pub static VOID: LazyLock<TypeRef> = LazyLock::new(|| TypeRef::new(TypeKind::Void));

/// Which targets a scalar source implicitly widens to.
fn widens_to(source: TypeCode, target: TypeCode) -> bool {
    use TypeCode::*;
    match source {
        SByte => matches!(target, SByte | Int16 | Int32 | Int64 | Single | Double | Decimal),
        Byte => matches!(
            target,
            Byte | Int16 | UInt16 | Int32 | UInt32 | Int64 | UInt64 | Single | Double | Decimal
        ),
        Int16 => matches!(target, Int16 | Int32 | Int64 | Single | Double | Decimal),
        UInt16 => {
            matches!(target, UInt16 | Int32 | UInt32 | Int64 | UInt64 | Single | Double | Decimal)
        }
        Int32 => matches!(target, Int32 | Int64 | Single | Double | Decimal),
        UInt32 => matches!(target, UInt32 | Int64 | UInt64 | Single | Double | Decimal),
        Int64 => matches!(target, Int64 | Single | Double | Decimal),
        UInt64 => matches!(target, UInt64 | Single | Double | Decimal),
        Single => matches!(target, Single | Double),
        _ => false,
    }
}

/// The implicit compatibility relation.
///
/// Identity, reference assignability, nullable lifting, and numeric
/// widening. An enum target accepts only the identical enum; an enum source
/// is seen through its underlying type.
pub fn is_compatible_with(source: &TypeRef, target: &TypeRef) -> bool {
    if source == target {
        return true;
    }
    if !target.is_value_type() {
        return target.is_assignable_from(source);
    }
    let st = source.non_nullable();
    let tt = target.non_nullable();
    if st != *source && tt == *target {
        return false;
    }
    let (sc, tc) = if tt.is_enum() {
        (TypeCode::Object, TypeCode::Object)
    } else {
        let sc = match st.kind() {
            TypeKind::Enum(def) => def.underlying_code(),
            _ => st.code(),
        };
        (sc, tt.code())
    };
    if sc == TypeCode::Object || tc == TypeCode::Object {
        return st == tt;
    }
    widens_to(sc, tc) || st == tt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_unwraps_once() {
        let ty = TypeRef::nullable_of(TypeRef::nullable_of(INT32.clone()));
        assert!(ty.is_nullable());
        assert!(ty.non_nullable().is_nullable());
        assert_eq!(ty.non_nullable().non_nullable(), *INT32);
    }

    #[test]
    fn nominal_class_identity() {
        let a = ClassDef::new("Point").with_property("X", INT32.clone()).into_type();
        let b = ClassDef::new("Point").with_property("X", INT32.clone()).into_type();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn enum_target_rejects_numeric_source() {
        let color = EnumDef::new("Color", vec![("Red", 0), ("Green", 1)]);
        assert!(!is_compatible_with(&INT32, &color));
        assert!(is_compatible_with(&color, &INT32));
        assert!(is_compatible_with(&color, &INT64));
    }
}
