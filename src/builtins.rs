//! Predefined types and their members.
//!
//! The parser resolves unqualified type names, member accesses, and static
//! utility calls against the tables in this module. Caller-supplied types
//! (via the allowed-types list) are consulted through the same lookup
//! functions; [`ClassDef`]/[`EnumDef`] instances carry their own members.

use std::sync::LazyLock;

use crate::types::{
    self, ClassDef, CtorDef, IndexerDef, MethodDef, PropertyDef, TypeKind, TypeRef,
};

/// The `Math` utility type: static numeric helpers.
pub static MATH: LazyLock<TypeRef> = LazyLock::new(|| {
    let int32 = types::INT32.clone();
    let int64 = types::INT64.clone();
    let double = types::DOUBLE.clone();
    let decimal = types::DECIMAL.clone();
    ClassDef::new("Math")
        .with_method(MethodDef::static_method("Abs", vec![int32.clone()], int32.clone()))
        .with_method(MethodDef::static_method("Abs", vec![int64.clone()], int64.clone()))
        .with_method(MethodDef::static_method("Abs", vec![double.clone()], double.clone()))
        .with_method(MethodDef::static_method("Abs", vec![decimal.clone()], decimal.clone()))
        .with_method(MethodDef::static_method("Ceiling", vec![double.clone()], double.clone()))
        .with_method(MethodDef::static_method("Ceiling", vec![decimal.clone()], decimal.clone()))
        .with_method(MethodDef::static_method("Floor", vec![double.clone()], double.clone()))
        .with_method(MethodDef::static_method("Floor", vec![decimal.clone()], decimal.clone()))
        .with_method(MethodDef::static_method("Round", vec![double.clone()], double.clone()))
        .with_method(MethodDef::static_method(
            "Round",
            vec![double.clone(), int32.clone()],
            double.clone(),
        ))
        .with_method(MethodDef::static_method("Round", vec![decimal.clone()], decimal.clone()))
        .with_method(MethodDef::static_method("Sqrt", vec![double.clone()], double.clone()))
        .with_method(MethodDef::static_method(
            "Pow",
            vec![double.clone(), double.clone()],
            double.clone(),
        ))
        .with_method(MethodDef::static_method(
            "Min",
            vec![int32.clone(), int32.clone()],
            int32.clone(),
        ))
        .with_method(MethodDef::static_method(
            "Min",
            vec![int64.clone(), int64.clone()],
            int64.clone(),
        ))
        .with_method(MethodDef::static_method(
            "Min",
            vec![double.clone(), double.clone()],
            double.clone(),
        ))
        .with_method(MethodDef::static_method(
            "Min",
            vec![decimal.clone(), decimal.clone()],
            decimal.clone(),
        ))
        .with_method(MethodDef::static_method(
            "Max",
            vec![int32.clone(), int32.clone()],
            int32.clone(),
        ))
        .with_method(MethodDef::static_method(
            "Max",
            vec![int64.clone(), int64.clone()],
            int64.clone(),
        ))
        .with_method(MethodDef::static_method(
            "Max",
            vec![double.clone(), double.clone()],
            double.clone(),
        ))
        .with_method(MethodDef::static_method(
            "Max",
            vec![decimal.clone(), decimal.clone()],
            decimal.clone(),
        ))
        .with_method(MethodDef::static_method("Sign", vec![double.clone()], int32.clone()))
        .with_method(MethodDef::static_method("Sign", vec![int32.clone()], int32.clone()))
        .into_type()
});

/// The `Convert` utility type: one static conversion per scalar target.
pub static CONVERT: LazyLock<TypeRef> = LazyLock::new(|| {
    let object = types::OBJECT.clone();
    let conversions: &[(&str, &LazyLock<TypeRef>)] = &[
        ("ToBoolean", &types::BOOL),
        ("ToChar", &types::CHAR),
        ("ToString", &types::STRING),
        ("ToSByte", &types::SBYTE),
        ("ToByte", &types::BYTE),
        ("ToInt16", &types::INT16),
        ("ToUInt16", &types::UINT16),
        ("ToInt32", &types::INT32),
        ("ToUInt32", &types::UINT32),
        ("ToInt64", &types::INT64),
        ("ToUInt64", &types::UINT64),
        ("ToSingle", &types::SINGLE),
        ("ToDouble", &types::DOUBLE),
        ("ToDecimal", &types::DECIMAL),
        ("ToDateTime", &types::DATETIME),
    ];
    let mut class = ClassDef::new("Convert");
    for (name, target) in conversions {
        class = class.with_method(MethodDef::static_method(
            name,
            vec![object.clone()],
            (**target).clone(),
        ));
    }
    class.into_type()
});

/// Types referenceable by short name without being passed in by the caller.
pub static PREDEFINED: LazyLock<Vec<TypeRef>> = LazyLock::new(|| {
    vec![
        types::OBJECT.clone(),
        types::BOOL.clone(),
        types::CHAR.clone(),
        types::STRING.clone(),
        types::SBYTE.clone(),
        types::BYTE.clone(),
        types::INT16.clone(),
        types::UINT16.clone(),
        types::INT32.clone(),
        types::UINT32.clone(),
        types::INT64.clone(),
        types::UINT64.clone(),
        types::SINGLE.clone(),
        types::DOUBLE.clone(),
        types::DECIMAL.clone(),
        types::DATETIME.clone(),
        types::TIMESPAN.clone(),
        types::GUID.clone(),
        MATH.clone(),
        CONVERT.clone(),
    ]
});

/// Resolve a possibly-qualified type name against the predefined set and
/// the caller's allowed types (`Int32`, `System.String`, `My.Custom.Type`).
pub fn resolve_type_name(name: &str, extras: &[TypeRef]) -> Option<TypeRef> {
    PREDEFINED
        .iter()
        .chain(extras.iter())
        .find(|t| t.name().eq_ignore_ascii_case(name) || t.full_name().eq_ignore_ascii_case(name))
        .cloned()
}

/// Properties and fields declared directly on `ty` (no base walk).
pub fn declared_properties(ty: &TypeRef) -> Vec<PropertyDef> {
    let int32 = || types::INT32.clone();
    let double = || types::DOUBLE.clone();
    let prop = |name: &str, ty: TypeRef| PropertyDef { name: name.to_string(), ty };
    match ty.kind() {
        TypeKind::String => vec![prop("Length", int32())],
        TypeKind::Array { .. } => vec![prop("Length", int32())],
        TypeKind::DateTime => vec![
            prop("Year", int32()),
            prop("Month", int32()),
            prop("Day", int32()),
            prop("Hour", int32()),
            prop("Minute", int32()),
            prop("Second", int32()),
            prop("Millisecond", int32()),
            prop("DayOfYear", int32()),
            prop("DayOfWeek", int32()),
            prop("Date", types::DATETIME.clone()),
            prop("TimeOfDay", types::TIMESPAN.clone()),
        ],
        TypeKind::TimeSpan => vec![
            prop("Days", int32()),
            prop("Hours", int32()),
            prop("Minutes", int32()),
            prop("Seconds", int32()),
            prop("Milliseconds", int32()),
            prop("TotalDays", double()),
            prop("TotalHours", double()),
            prop("TotalMinutes", double()),
            prop("TotalSeconds", double()),
            prop("TotalMilliseconds", double()),
            prop("Ticks", types::INT64.clone()),
        ],
        TypeKind::Nullable(inner) => {
            vec![prop("HasValue", types::BOOL.clone()), prop("Value", inner.clone())]
        }
        TypeKind::Grouping { key, .. } => vec![prop("Key", key.clone())],
        TypeKind::Class(def) => def.properties.clone(),
        _ => vec![],
    }
}

/// Methods declared directly on `ty` (no base walk).
pub fn declared_methods(ty: &TypeRef) -> Vec<MethodDef> {
    let string = || types::STRING.clone();
    let int32 = || types::INT32.clone();
    let bool_ty = || types::BOOL.clone();
    match ty.kind() {
        TypeKind::Object => vec![
            MethodDef::instance("ToString", vec![], string()),
            MethodDef::instance("Equals", vec![types::OBJECT.clone()], bool_ty()),
        ],
        TypeKind::String => vec![
            MethodDef::instance("StartsWith", vec![string()], bool_ty()),
            MethodDef::instance("EndsWith", vec![string()], bool_ty()),
            MethodDef::instance("Contains", vec![string()], bool_ty()),
            MethodDef::instance("IndexOf", vec![string()], int32()),
            MethodDef::instance("IndexOf", vec![types::CHAR.clone()], int32()),
            MethodDef::instance("Substring", vec![int32()], string()),
            MethodDef::instance("Substring", vec![int32(), int32()], string()),
            MethodDef::instance("ToLower", vec![], string()),
            MethodDef::instance("ToUpper", vec![], string()),
            MethodDef::instance("Trim", vec![], string()),
            MethodDef::instance("Replace", vec![string(), string()], string()),
            MethodDef::instance("CompareTo", vec![string()], int32()),
            MethodDef::static_method("Compare", vec![string(), string()], int32()),
            MethodDef::static_method(
                "Concat",
                vec![types::OBJECT.clone(), types::OBJECT.clone()],
                string(),
            ),
            MethodDef::static_method("IsNullOrEmpty", vec![string()], bool_ty()),
        ],
        TypeKind::DateTime => vec![
            MethodDef::instance("AddYears", vec![int32()], types::DATETIME.clone()),
            MethodDef::instance("AddMonths", vec![int32()], types::DATETIME.clone()),
            MethodDef::instance("AddDays", vec![types::DOUBLE.clone()], types::DATETIME.clone()),
            MethodDef::instance("AddHours", vec![types::DOUBLE.clone()], types::DATETIME.clone()),
            MethodDef::instance(
                "AddMinutes",
                vec![types::DOUBLE.clone()],
                types::DATETIME.clone(),
            ),
            MethodDef::instance(
                "AddSeconds",
                vec![types::DOUBLE.clone()],
                types::DATETIME.clone(),
            ),
            MethodDef::instance("CompareTo", vec![types::DATETIME.clone()], int32()),
        ],
        TypeKind::Nullable(inner) => {
            vec![MethodDef::instance("GetValueOrDefault", vec![], inner.clone())]
        }
        TypeKind::Class(def) => def.methods.clone(),
        _ => vec![],
    }
}

/// Default-member indexers declared directly on `ty`.
pub fn declared_indexers(ty: &TypeRef) -> Vec<IndexerDef> {
    match ty.kind() {
        TypeKind::String => {
            vec![IndexerDef { params: vec![types::INT32.clone()], ty: types::CHAR.clone() }]
        }
        TypeKind::Class(def) => def.indexers.clone(),
        _ => vec![],
    }
}

/// Declared constructors of `ty`. Scalar types have none; conversion-style
/// calls (`Int32(x)`) fall back to the explicit-conversion rule.
pub fn constructors_of(ty: &TypeRef) -> Vec<CtorDef> {
    match ty.kind() {
        TypeKind::Class(def) => def.constructors.clone(),
        _ => vec![],
    }
}
