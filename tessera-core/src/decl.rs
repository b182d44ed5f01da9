//! The type-description source: declarations as a host type system would
//! report them, before any merging.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{Record, SemanticKind, Value};

/// Process-unique identity of a [`TypeDecl`], used as the plan cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u64);

impl DeclId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DeclId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Visibility of a field accessor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Access {
    /// Visible to everyone.
    #[default]
    Public,
    /// Visible within the declaring unit.
    Internal,
    /// Visible to the declaring type and its subtypes only.
    Protected,
    /// Visible to the declaring type only.
    Private,
}

impl Access {
    /// Whether a generated codec may call an accessor with this visibility.
    pub const fn is_codec_visible(self) -> bool {
        matches!(self, Access::Public | Access::Internal)
    }
}

/// A named predicate evaluated against the record being encoded.
///
/// When it returns false the field is left out of the output.
#[derive(Clone)]
pub struct Predicate {
    name: Arc<str>,
    func: Arc<dyn Fn(&Record) -> bool + Send + Sync>,
}

impl Predicate {
    /// Wrap a function under a name (the name shows up in `Debug` output).
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Predicate {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    /// Name the predicate was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate against a record.
    pub fn evaluate(&self, record: &Record) -> bool {
        (self.func)(record)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.name)
    }
}

/// Maps a decoded discriminator value to the concrete type to decode.
#[derive(Clone)]
pub struct Resolver {
    name: Arc<str>,
    func: Arc<dyn Fn(&Value) -> Option<Arc<TypeDecl>> + Send + Sync>,
}

impl Resolver {
    /// Wrap a function under a name (the name shows up in `Debug` output).
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Value) -> Option<Arc<TypeDecl>> + Send + Sync + 'static,
    {
        Resolver {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    /// Name the resolver was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a discriminator value. `None` means the value names no known type.
    pub fn resolve(&self, value: &Value) -> Option<Arc<TypeDecl>> {
        (self.func)(value)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolver({})", self.name)
    }
}

/// One field as declared on one level of a type hierarchy.
///
/// Built with chained calls:
///
/// ```
/// use tessera_core::{FieldDecl, SemanticKind};
///
/// let id = FieldDecl::new("Id", SemanticKind::I32).rename("id").order(-1);
/// assert_eq!(id.wire_name(), Some("id"));
/// ```
#[derive(Clone, Debug)]
pub struct FieldDecl {
    name: String,
    kind: Option<SemanticKind>,
    nullable: bool,
    getter: Option<Access>,
    setter: Option<Access>,
    is_override: bool,
    wire_name: Option<String>,
    order: Option<i32>,
    ignored: bool,
    should_serialize: Option<Predicate>,
}

impl FieldDecl {
    /// A public read/write field of the given kind.
    pub fn new(name: impl Into<String>, kind: SemanticKind) -> Self {
        FieldDecl {
            name: name.into(),
            kind: Some(kind),
            nullable: false,
            getter: Some(Access::Public),
            setter: Some(Access::Public),
            is_override: false,
            wire_name: None,
            order: None,
            ignored: false,
            should_serialize: None,
        }
    }

    /// A field whose kind the description source could not determine.
    pub fn unclassified(name: impl Into<String>) -> Self {
        FieldDecl {
            kind: None,
            ..FieldDecl::new(name, SemanticKind::Fallback)
        }
    }

    /// The field's type permits null.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set the getter's visibility.
    pub fn getter(mut self, access: Access) -> Self {
        self.getter = Some(access);
        self
    }

    /// Set the setter's visibility.
    pub fn setter(mut self, access: Access) -> Self {
        self.setter = Some(access);
        self
    }

    /// The field has no setter: it cannot be supplied at construction time.
    pub fn read_only(mut self) -> Self {
        self.setter = None;
        self
    }

    /// The field has no getter.
    pub fn write_only(mut self) -> Self {
        self.getter = None;
        self
    }

    /// This declaration overrides a same-named field of a base type.
    pub fn overrides(mut self) -> Self {
        self.is_override = true;
        self
    }

    /// Use `wire_name` on the wire instead of the declared name.
    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    /// Explicit ordering priority (lower first; unset counts as 0).
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Exclude the field from both decoding and encoding.
    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Only encode the field when `func` returns true for the record.
    pub fn should_serialize<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.should_serialize = Some(Predicate::new(name, func));
        self
    }

    /// Declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind, if the source could classify it.
    pub fn kind(&self) -> Option<&SemanticKind> {
        self.kind.as_ref()
    }

    /// Whether the declared type permits null.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Getter visibility, `None` if there is no getter.
    pub fn getter_access(&self) -> Option<Access> {
        self.getter
    }

    /// Setter visibility, `None` if there is no setter.
    pub fn setter_access(&self) -> Option<Access> {
        self.setter
    }

    /// Whether this declaration overrides a base declaration.
    pub fn is_override(&self) -> bool {
        self.is_override
    }

    /// Explicit wire name, if any.
    pub fn wire_name(&self) -> Option<&str> {
        self.wire_name.as_deref()
    }

    /// Explicit order, if any.
    pub fn explicit_order(&self) -> Option<i32> {
        self.order
    }

    /// Whether the field is excluded.
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Conditional-serialize predicate, if any.
    pub fn should_serialize_predicate(&self) -> Option<&Predicate> {
        self.should_serialize.as_ref()
    }

    /// Encoding needs a getter the codec can call.
    pub fn is_gettable(&self) -> bool {
        self.getter.is_some_and(Access::is_codec_visible)
    }

    /// Decoding needs a setter the codec can call.
    pub fn is_settable(&self) -> bool {
        self.setter.is_some_and(Access::is_codec_visible)
    }

    /// No setter at all.
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }
}

/// The discriminator declared on a polymorphic base type.
#[derive(Clone, Debug)]
pub struct DiscriminatorDecl {
    /// Declared name of the discriminator field.
    pub field: String,
    /// Maps the decoded discriminator to the concrete type.
    pub resolver: Resolver,
}

/// A type declaration: one level of a hierarchy plus a link to its base.
///
/// Declarations are immutable and shared behind [`Arc`]; each one gets a
/// process-unique [`DeclId`] when built.
#[derive(Debug)]
pub struct TypeDecl {
    id: DeclId,
    name: String,
    base: Option<Arc<TypeDecl>>,
    fields: Vec<FieldDecl>,
    discriminator: Option<DiscriminatorDecl>,
}

impl TypeDecl {
    /// Start building a declaration.
    pub fn builder(name: impl Into<String>) -> TypeDeclBuilder {
        TypeDeclBuilder {
            name: name.into(),
            base: None,
            fields: Vec::new(),
            discriminator: None,
        }
    }

    /// Unique id.
    pub fn id(&self) -> DeclId {
        self.id
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct base type.
    pub fn base(&self) -> Option<&Arc<TypeDecl>> {
        self.base.as_ref()
    }

    /// Fields declared on this level only.
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Discriminator declared on this level. Discriminators are not inherited.
    pub fn discriminator(&self) -> Option<&DiscriminatorDecl> {
        self.discriminator.as_ref()
    }

    /// This type and all its bases, most-base first.
    pub fn ancestry(&self) -> Vec<&TypeDecl> {
        let mut chain = vec![self];
        let mut current = self.base.as_deref();
        while let Some(decl) = current {
            chain.push(decl);
            current = decl.base.as_deref();
        }
        chain.reverse();
        chain
    }

    /// Whether `self` is `other` or derives from it.
    pub fn is_subtype_of(&self, other: &TypeDecl) -> bool {
        self.ancestry().iter().any(|decl| decl.id == other.id)
    }
}

/// Builder for [`TypeDecl`].
#[derive(Debug)]
pub struct TypeDeclBuilder {
    name: String,
    base: Option<Arc<TypeDecl>>,
    fields: Vec<FieldDecl>,
    discriminator: Option<DiscriminatorDecl>,
}

impl TypeDeclBuilder {
    /// Derive from `base`.
    pub fn base(mut self, base: &Arc<TypeDecl>) -> Self {
        self.base = Some(Arc::clone(base));
        self
    }

    /// Declare a field on this level.
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare several fields on this level.
    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDecl>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Make this a polymorphic base: `field` selects the concrete type through `resolver`.
    pub fn discriminator(mut self, field: impl Into<String>, resolver: Resolver) -> Self {
        self.discriminator = Some(DiscriminatorDecl {
            field: field.into(),
            resolver,
        });
        self
    }

    /// Finish the declaration.
    pub fn build(self) -> Arc<TypeDecl> {
        Arc::new(TypeDecl {
            id: DeclId::next(),
            name: self.name,
            base: self.base,
            fields: self.fields,
            discriminator: self.discriminator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_drive_eligibility() {
        let plain = FieldDecl::new("A", SemanticKind::I32);
        assert!(plain.is_gettable() && plain.is_settable() && !plain.is_read_only());

        let read_only = FieldDecl::new("B", SemanticKind::I32).read_only();
        assert!(read_only.is_gettable());
        assert!(!read_only.is_settable());
        assert!(read_only.is_read_only());

        let protected_setter = FieldDecl::new("C", SemanticKind::I32).setter(Access::Protected);
        assert!(!protected_setter.is_settable());
        assert!(!protected_setter.is_read_only());

        let internal_getter = FieldDecl::new("D", SemanticKind::I32).getter(Access::Internal);
        assert!(internal_getter.is_gettable());
    }

    #[test]
    fn ancestry_runs_base_first() {
        let root = TypeDecl::builder("Root").build();
        let mid = TypeDecl::builder("Mid").base(&root).build();
        let leaf = TypeDecl::builder("Leaf").base(&mid).build();

        let names: Vec<_> = leaf.ancestry().iter().map(|d| d.name()).collect();
        assert_eq!(names, ["Root", "Mid", "Leaf"]);
        assert!(leaf.is_subtype_of(&root));
        assert!(!root.is_subtype_of(&leaf));
        assert_ne!(root.id(), mid.id());
    }
}
