//! Codec planning: deciding, once per type, how each field is read and written.

use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tessera_core::{
    ConfigError, FieldDescriptor, Predicate, Resolver, SemanticKind, TypeDecl, TypeDescriptor,
};

use crate::PlanCache;

/// How to decode one readable field.
#[derive(Clone, Debug)]
pub struct ReadSlot {
    /// Declared field name; decoded records are keyed by it.
    pub name: String,
    /// Name matched against field-name tokens.
    pub wire_name: String,
    /// Kind that selects the token-level read operation.
    pub kind: SemanticKind,
    /// Whether a `null` token is accepted.
    pub nullable: bool,
    /// Plan of the nested type, for object fields.
    pub nested: Option<Arc<CodecPlan>>,
}

/// Wire-name lookup over the readable fields of one type.
#[derive(Clone, Debug, Default)]
pub struct ReadTable {
    slots: Vec<ReadSlot>,
    by_wire: HashMap<String, usize>,
    by_folded: HashMap<String, usize>,
}

impl ReadTable {
    /// Slots in planned order.
    pub fn slots(&self) -> &[ReadSlot] {
        &self.slots
    }

    /// Index of the slot a field-name token dispatches to.
    ///
    /// Matching is byte-exact. With `case_insensitive`, a miss is retried
    /// against the lower-cased wire names.
    pub fn lookup(&self, wire_name: &str, case_insensitive: bool) -> Option<usize> {
        if let Some(&idx) = self.by_wire.get(wire_name) {
            return Some(idx);
        }
        if case_insensitive {
            return self.by_folded.get(&fold(wire_name)).copied();
        }
        None
    }

    /// Number of readable fields.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the type has no readable field.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// How to encode one writable field.
#[derive(Clone, Debug)]
pub struct WriteStep {
    /// Declared field name; values are fetched from records by it.
    pub name: String,
    /// Name emitted before the value.
    pub wire_name: String,
    /// Kind that selects the token-level write operation.
    pub kind: SemanticKind,
    /// Whether null may be written.
    pub nullable: bool,
    /// Skipped when read-only properties are ignored.
    pub read_only: bool,
    /// Skipped when present and false for the record being encoded.
    pub should_serialize: Option<Predicate>,
    /// Plan of the declared nested type, for object fields.
    pub nested: Option<Arc<CodecPlan>>,
}

/// Lookahead plan of a polymorphic base type.
#[derive(Clone, Debug)]
pub struct DiscriminatorPlan {
    /// How the discriminator field itself is read.
    pub slot: ReadSlot,
    folded_wire_name: String,
    /// Maps the decoded discriminator to the concrete type.
    pub resolver: Resolver,
}

impl DiscriminatorPlan {
    /// Whether a field-name token names the discriminator.
    pub fn matches(&self, wire_name: &str, case_insensitive: bool) -> bool {
        wire_name == self.slot.wire_name
            || (case_insensitive && fold(wire_name) == self.folded_wire_name)
    }
}

/// Decode side of a [`CodecPlan`].
#[derive(Clone, Debug)]
pub enum DecodePlan {
    /// Dispatch field-name tokens through a read table.
    Fields(ReadTable),
    /// Find the discriminator first, then decode as the concrete type.
    Discriminated(DiscriminatorPlan),
}

/// Everything a format needs to decode and encode one type.
#[derive(Clone, Debug)]
pub struct CodecPlan {
    descriptor: Arc<TypeDescriptor>,
    decode: DecodePlan,
    encode: Option<Vec<WriteStep>>,
}

impl CodecPlan {
    /// The merged descriptor this plan was built from.
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// The planned declaration.
    pub fn decl(&self) -> &Arc<TypeDecl> {
        &self.descriptor.decl
    }

    /// Name of the planned type.
    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    /// Decode side of the plan.
    pub fn decode_plan(&self) -> &DecodePlan {
        &self.decode
    }

    /// Ordered write steps.
    ///
    /// Polymorphic base types have none: their values are encoded with the
    /// plan of their concrete type.
    pub fn encode_plan(&self) -> Result<&[WriteStep], ConfigError> {
        self.encode
            .as_deref()
            .ok_or_else(|| ConfigError::AbstractEncode {
                type_name: self.type_name().to_owned(),
            })
    }

    /// Whether decoding starts with a discriminator lookahead.
    pub fn is_discriminated(&self) -> bool {
        matches!(self.decode, DecodePlan::Discriminated(_))
    }
}

/// Plan a type, resolving nested object types through the global cache.
pub fn plan(descriptor: TypeDescriptor) -> Result<CodecPlan, ConfigError> {
    plan_in(PlanCache::global(), descriptor)
}

/// Plan a type, resolving nested object types through `cache`.
///
/// Nested types are planned eagerly, so a configuration error anywhere below
/// this type fails here.
pub fn plan_in(cache: &PlanCache, descriptor: TypeDescriptor) -> Result<CodecPlan, ConfigError> {
    let type_name = descriptor.name().to_owned();

    if let Some(disc) = &descriptor.discriminator {
        let Some(field) = descriptor.field(&disc.field_name) else {
            return Err(ConfigError::DiscriminatorNotFound {
                type_name,
                field: disc.field_name.clone(),
            });
        };
        let slot = read_slot(cache, field)?;
        debug!(
            type_name = %type_name,
            discriminator = %slot.wire_name,
            resolver = disc.resolver.name(),
            "plan: discriminated type"
        );
        let decode = DecodePlan::Discriminated(DiscriminatorPlan {
            folded_wire_name: fold(&slot.wire_name),
            slot,
            resolver: disc.resolver.clone(),
        });
        check_unique_wire_names(&type_name, descriptor.readable_fields())?;
        return Ok(CodecPlan {
            descriptor: Arc::new(descriptor),
            decode,
            encode: None,
        });
    }

    let mut table = ReadTable::default();
    for field in descriptor.readable_fields() {
        let slot = read_slot(cache, field)?;
        let idx = table.slots.len();
        match table.by_wire.entry(slot.wire_name.clone()) {
            Entry::Occupied(_) => {
                return Err(ConfigError::DuplicateWireName {
                    type_name,
                    wire_name: slot.wire_name,
                });
            }
            Entry::Vacant(v) => {
                v.insert(idx);
            }
        }
        // first declaration wins when names differ only by case
        table.by_folded.entry(fold(&slot.wire_name)).or_insert(idx);
        trace!(field = %slot.name, wire = %slot.wire_name, kind = %slot.kind, "plan: read slot");
        table.slots.push(slot);
    }

    check_unique_wire_names(&type_name, descriptor.writable_fields())?;
    let mut steps = Vec::new();
    for field in descriptor.writable_fields() {
        steps.push(WriteStep {
            name: field.name.clone(),
            wire_name: field.wire_name.clone(),
            kind: field.kind.clone(),
            nullable: field.nullable,
            read_only: field.read_only,
            should_serialize: field.should_serialize.clone(),
            nested: nested_plan(cache, &field.kind)?,
        });
    }

    debug!(
        type_name = %type_name,
        read_slots = table.slots.len(),
        write_steps = steps.len(),
        "plan: planned type"
    );
    Ok(CodecPlan {
        descriptor: Arc::new(descriptor),
        decode: DecodePlan::Fields(table),
        encode: Some(steps),
    })
}

fn read_slot(cache: &PlanCache, field: &FieldDescriptor) -> Result<ReadSlot, ConfigError> {
    Ok(ReadSlot {
        name: field.name.clone(),
        wire_name: field.wire_name.clone(),
        kind: field.kind.clone(),
        nullable: field.nullable,
        nested: nested_plan(cache, &field.kind)?,
    })
}

fn nested_plan(
    cache: &PlanCache,
    kind: &SemanticKind,
) -> Result<Option<Arc<CodecPlan>>, ConfigError> {
    match kind.object_decl() {
        Some(decl) => cache.get_or_plan(decl).map(Some),
        None => Ok(None),
    }
}

fn check_unique_wire_names<'a>(
    type_name: &str,
    fields: impl Iterator<Item = &'a FieldDescriptor>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.wire_name.as_str()) {
            return Err(ConfigError::DuplicateWireName {
                type_name: type_name.to_owned(),
                wire_name: field.wire_name.clone(),
            });
        }
    }
    Ok(())
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{FieldDecl, Value, describe};

    fn plan_of(decl: &Arc<TypeDecl>) -> Result<CodecPlan, ConfigError> {
        plan_in(&PlanCache::new(), describe(decl)?)
    }

    #[test]
    fn write_steps_follow_field_order() {
        let decl = TypeDecl::builder("Point")
            .field(FieldDecl::new("Y", SemanticKind::F64))
            .field(FieldDecl::new("X", SemanticKind::F64).order(-1))
            .field(FieldDecl::new("Label", SemanticKind::String).write_only())
            .build();
        let plan = plan_of(&decl).unwrap();

        let steps: Vec<_> = plan
            .encode_plan()
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        // write-only fields have no getter
        assert_eq!(steps, ["X", "Y"]);

        let DecodePlan::Fields(table) = plan.decode_plan() else {
            panic!("expected a read table");
        };
        assert_eq!(table.len(), 3);
        assert!(table.lookup("Label", false).is_some());
    }

    #[test]
    fn folded_lookup_only_when_asked() {
        let decl = TypeDecl::builder("Person")
            .field(FieldDecl::new("Name", SemanticKind::String).rename("fullName"))
            .build();
        let plan = plan_of(&decl).unwrap();
        let DecodePlan::Fields(table) = plan.decode_plan() else {
            panic!("expected a read table");
        };
        assert_eq!(table.lookup("fullName", false), Some(0));
        assert_eq!(table.lookup("FULLNAME", false), None);
        assert_eq!(table.lookup("FULLNAME", true), Some(0));
    }

    #[test]
    fn discriminated_types_have_no_encode_plan() {
        let base = TypeDecl::builder("Shape")
            .field(FieldDecl::new("Kind", SemanticKind::I32).rename("kind"))
            .discriminator("Kind", Resolver::new("ShapeByKind", |_: &Value| None))
            .build();
        let plan = plan_of(&base).unwrap();
        assert!(plan.is_discriminated());
        assert_eq!(
            plan.encode_plan().unwrap_err(),
            ConfigError::AbstractEncode {
                type_name: "Shape".into()
            }
        );
        let DecodePlan::Discriminated(disc) = plan.decode_plan() else {
            panic!("expected a discriminator plan");
        };
        assert!(disc.matches("kind", false));
        assert!(!disc.matches("KIND", false));
        assert!(disc.matches("KIND", true));
    }

    #[test]
    fn missing_discriminator_field_is_a_config_error() {
        let base = TypeDecl::builder("Shape")
            .field(FieldDecl::new("Kind", SemanticKind::I32))
            .discriminator("Type", Resolver::new("ShapeByType", |_: &Value| None))
            .build();
        assert_eq!(
            plan_of(&base).unwrap_err().code(),
            "config::discriminator_not_found"
        );
    }

    #[test]
    fn duplicate_wire_names_are_rejected() {
        let decl = TypeDecl::builder("Clash")
            .field(FieldDecl::new("A", SemanticKind::I32).rename("x"))
            .field(FieldDecl::new("B", SemanticKind::I32).rename("x"))
            .build();
        assert!(matches!(
            plan_of(&decl),
            Err(ConfigError::DuplicateWireName { wire_name, .. }) if wire_name == "x"
        ));
    }

    #[test]
    fn nested_errors_abort_the_outer_plan() {
        let inner = TypeDecl::builder("Inner")
            .field(FieldDecl::new("A", SemanticKind::I32).rename("x"))
            .field(FieldDecl::new("B", SemanticKind::I32).rename("x"))
            .build();
        let outer = TypeDecl::builder("Outer")
            .field(FieldDecl::new("Inner", SemanticKind::Object(inner)))
            .build();
        assert!(matches!(
            plan_of(&outer),
            Err(ConfigError::DuplicateWireName { type_name, .. }) if type_name == "Inner"
        ));
    }
}
