use std::sync::Arc;

use crate::{DeclId, Predicate, Resolver, SemanticKind, TypeDecl};

/// Canonical per-field codec metadata, after override merging.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    /// Declared name, unique within the type.
    pub name: String,

    /// Name used on the wire (the declared name unless renamed).
    pub wire_name: String,

    /// What the codec reads and writes for this field.
    pub kind: SemanticKind,

    /// Whether null is a legal value.
    pub nullable: bool,

    /// Whether the decoder may set this field.
    pub read_eligible: bool,

    /// Whether the encoder may emit this field.
    pub write_eligible: bool,

    /// Explicit ordering priority.
    pub order: Option<i32>,

    /// Conditional-serialize predicate.
    pub should_serialize: Option<Predicate>,

    /// The field cannot be supplied at construction time.
    pub read_only: bool,
}

/// Resolved discriminator of a polymorphic base type.
#[derive(Clone, Debug)]
pub struct DiscriminatorDescriptor {
    /// Declared name of the discriminator field.
    pub field_name: String,
    /// Maps the decoded discriminator value to the concrete type.
    pub resolver: Resolver,
}

/// A type's full identity for codec purposes.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    /// The declaration this was derived from.
    pub decl: Arc<TypeDecl>,
    /// Merged fields in planned order.
    pub fields: Vec<FieldDescriptor>,
    /// Present on polymorphic base types.
    pub discriminator: Option<DiscriminatorDescriptor>,
}

impl TypeDescriptor {
    /// Id of the originating declaration.
    pub fn id(&self) -> DeclId {
        self.decl.id()
    }

    /// Type name.
    pub fn name(&self) -> &str {
        self.decl.name()
    }

    /// Look up a merged field by declared name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields the decoder handles, in planned order.
    pub fn readable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.read_eligible)
    }

    /// Fields the encoder handles, in planned order.
    pub fn writable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.write_eligible)
    }
}
