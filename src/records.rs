//! The anonymous-record factory.
//!
//! `new(...)` expressions and direct callers ask for a nominal type with a
//! given list of named, typed fields. Types are interned process-wide by
//! structural signature: the same field list (names and types, in order)
//! always yields the identical type, for the life of the process.
//!
//! The cache is guarded for many concurrent readers; a miss upgrades to the
//! exclusive guard and re-checks before minting, so a signature is never
//! emitted twice.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{LazyLock, RwLock};

use crate::types::{ClassDef, TypeKind, TypeRef};
use crate::value::Value;

/// A named, typed field of a record to synthesize.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicProperty {
    name: String,
    ty: TypeRef,
}

impl DynamicProperty {
    /// Panics if `name` is empty; every field must be addressable.
    pub fn new(name: &str, ty: TypeRef) -> Self {
        assert!(!name.is_empty(), "record field name must be non-empty");
        DynamicProperty { name: name.to_string(), ty }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }
}

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Ordered field list with a precomputed structural hash.
///
/// Equality is positional and exact on both name and type; the hash is the
/// XOR of `hash(name) ^ hash(type)` over all fields, so hash-equal
/// signatures of different shapes still compare unequal.
#[derive(Debug, Clone)]
pub struct ClassSignature {
    properties: Vec<DynamicProperty>,
    hash: u64,
}

impl ClassSignature {
    pub fn new(properties: &[DynamicProperty]) -> Self {
        let hash = properties
            .iter()
            .fold(0u64, |acc, p| acc ^ hash_of(p.name.as_str()) ^ hash_of(&p.ty));
        ClassSignature { properties: properties.to_vec(), hash }
    }

    pub fn properties(&self) -> &[DynamicProperty] {
        &self.properties
    }
}

impl PartialEq for ClassSignature {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.properties == other.properties
    }
}

impl Eq for ClassSignature {}

impl Hash for ClassSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

static CACHE: LazyLock<RwLock<HashMap<ClassSignature, TypeRef>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

static NEXT_INDEX: AtomicUsize = AtomicUsize::new(1);

/// Return the interned record type for `properties`, minting it on first
/// request.
pub fn create_class(properties: &[DynamicProperty]) -> TypeRef {
    let signature = ClassSignature::new(properties);

    {
        let cache = CACHE.read().expect("record type cache poisoned");
        if let Some(ty) = cache.get(&signature) {
            return ty.clone();
        }
    }

    let mut cache = CACHE.write().expect("record type cache poisoned");
    // Another writer may have minted this signature while we waited
    if let Some(ty) = cache.get(&signature) {
        return ty.clone();
    }

    let index = NEXT_INDEX.fetch_add(1, AtomicOrdering::Relaxed);
    let mut class = ClassDef::new(&format!("DynamicClass{}", index));
    for p in &signature.properties {
        class = class.with_property(&p.name, p.ty.clone());
    }
    let ty = class.into_type();
    cache.insert(signature, ty.clone());
    ty
}

/// A value of a synthesized record type: one slot per field.
#[derive(Debug, Clone)]
pub struct RecordValue {
    ty: TypeRef,
    slots: Vec<Value>,
}

impl RecordValue {
    /// Panics if `ty` is not a synthesized record type or the slot count
    /// does not match its field count.
    pub fn new(ty: TypeRef, slots: Vec<Value>) -> Self {
        let TypeKind::Class(def) = ty.kind() else {
            panic!("record values require a record type, got {}", ty);
        };
        assert_eq!(
            def.properties.len(),
            slots.len(),
            "record type {} has {} fields",
            ty,
            def.properties.len()
        );
        RecordValue { ty, slots }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn slot(&self, name: &str) -> Option<&Value> {
        let TypeKind::Class(def) = self.ty.kind() else {
            return None;
        };
        def.properties
            .iter()
            .position(|p| p.name == name)
            .map(|i| &self.slots[i])
    }

    /// Structural hash: zero, XORed with each slot's hash in turn.
    pub fn hash_code(&self) -> u64 {
        self.slots.iter().fold(0u64, |acc, slot| acc ^ hash_of(slot))
    }
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &Self) -> bool {
        // Same synthesized type first, then slot by slot
        self.ty == other.ty && self.slots == other.slots
    }
}
