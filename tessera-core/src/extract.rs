//! Folding a declaration's ancestry into merged field descriptors.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    ConfigError, DiscriminatorDescriptor, FieldDecl, FieldDescriptor, Predicate, SemanticKind,
    TypeDecl, TypeDescriptor,
};

/// A run of same-named declarations, merged left to right.
struct Run {
    name: String,
    wire_name: Option<String>,
    kind: SemanticKind,
    nullable: bool,
    read_eligible: bool,
    write_eligible: bool,
    order: Option<i32>,
    should_serialize: Option<Predicate>,
    read_only: bool,
    /// Ancestry level of the most recent declaration in the run.
    level: usize,
}

impl Run {
    fn start(field: &FieldDecl, level: usize) -> Self {
        let excluded = field.is_ignored();
        Run {
            name: field.name().to_owned(),
            wire_name: field.wire_name().map(str::to_owned),
            kind: field.kind().cloned().unwrap_or(SemanticKind::Fallback),
            nullable: field.is_nullable(),
            read_eligible: !excluded && field.is_settable(),
            write_eligible: !excluded && field.is_gettable(),
            order: field.explicit_order(),
            should_serialize: field.should_serialize_predicate().cloned(),
            read_only: field.is_read_only(),
            level,
        }
    }

    /// Fold an overriding declaration into the run.
    ///
    /// Nullability stays with the base declaration; exclusion at any level is
    /// permanent.
    fn merge(&mut self, over: Run) {
        if over.wire_name.is_some() {
            self.wire_name = over.wire_name;
        }
        self.kind = over.kind;
        self.read_eligible &= over.read_eligible;
        self.write_eligible &= over.write_eligible;
        if over.order.is_some() {
            self.order = over.order;
        }
        if over.should_serialize.is_some() {
            self.should_serialize = over.should_serialize;
        }
        self.read_only = over.read_only;
        self.level = over.level;
    }

    fn finish(self) -> FieldDescriptor {
        FieldDescriptor {
            wire_name: self.wire_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            kind: self.kind,
            nullable: self.nullable,
            read_eligible: self.read_eligible,
            write_eligible: self.write_eligible,
            order: self.order,
            should_serialize: self.should_serialize,
            read_only: self.read_only,
        }
    }
}

/// Merge the fields of `decl` and all its bases into an ordered descriptor list.
///
/// Levels are visited most-base first, each level's declarations by name.
/// Redeclarations fold into the run opened by the first declaration, so a
/// field keeps the discovery position of its base declaration. The result is
/// stably sorted by explicit order (unset counts as 0).
pub fn extract(decl: &TypeDecl) -> Result<Vec<FieldDescriptor>, ConfigError> {
    let mut runs: Vec<Run> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();

    for (level, ty) in decl.ancestry().into_iter().enumerate() {
        let mut declared: Vec<&FieldDecl> = ty.fields().iter().collect();
        declared.sort_by(|a, b| a.name().cmp(b.name()));

        for field in declared {
            let incoming = Run::start(field, level);
            match by_name.get(field.name()) {
                Some(&idx) => {
                    let run = &mut runs[idx];
                    if !field.is_override() || run.level == level {
                        return Err(ConfigError::AmbiguousMerge {
                            type_name: decl.name().to_owned(),
                            field: field.name().to_owned(),
                        });
                    }
                    trace!(
                        field = field.name(),
                        declared_on = ty.name(),
                        "extract: merging override"
                    );
                    run.merge(incoming);
                }
                None => {
                    by_name.insert(field.name(), runs.len());
                    runs.push(incoming);
                }
            }
        }
    }

    let mut fields: Vec<FieldDescriptor> = runs.into_iter().map(Run::finish).collect();
    fields.sort_by_key(|f| f.order.unwrap_or(0));

    debug!(
        type_name = decl.name(),
        fields = fields.len(),
        "extract: merged field list"
    );
    Ok(fields)
}

/// Build the full [`TypeDescriptor`] for a declaration.
pub fn describe(decl: &Arc<TypeDecl>) -> Result<TypeDescriptor, ConfigError> {
    let fields = extract(decl)?;
    let discriminator = decl.discriminator().map(|d| DiscriminatorDescriptor {
        field_name: d.field.clone(),
        resolver: d.resolver.clone(),
    });
    Ok(TypeDescriptor {
        decl: Arc::clone(decl),
        fields,
        discriminator,
    })
}
