use core::fmt::{self, Display};

/// A programmer error in a type declaration, detected while building a codec.
///
/// These are never produced while processing input: they abort codec
/// construction before any value is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field is declared twice in a hierarchy without the second declaration
    /// being an override.
    AmbiguousMerge {
        /// Type whose field list could not be merged
        type_name: String,
        /// The conflicting field
        field: String,
    },
    /// The discriminator names a field the type does not have.
    DiscriminatorNotFound {
        /// Polymorphic type
        type_name: String,
        /// Field named by the discriminator
        field: String,
    },
    /// An encoder was requested for a polymorphic base type.
    AbstractEncode {
        /// Polymorphic type
        type_name: String,
    },
    /// Two fields of one type map to the same wire name.
    DuplicateWireName {
        /// Type with the collision
        type_name: String,
        /// The shared wire name
        wire_name: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::AmbiguousMerge { type_name, field } => write!(
                f,
                "field `{field}` of `{type_name}` is redeclared without overriding its base declaration"
            ),
            ConfigError::DiscriminatorNotFound { type_name, field } => write!(
                f,
                "discriminator field `{field}` not found on `{type_name}`"
            ),
            ConfigError::AbstractEncode { type_name } => write!(
                f,
                "`{type_name}` selects its concrete type through a discriminator and cannot be encoded directly; encode a concrete subtype"
            ),
            ConfigError::DuplicateWireName {
                type_name,
                wire_name,
            } => write!(
                f,
                "more than one field of `{type_name}` uses the wire name `{wire_name}`"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            ConfigError::AmbiguousMerge { .. } => "config::ambiguous_merge",
            ConfigError::DiscriminatorNotFound { .. } => "config::discriminator_not_found",
            ConfigError::AbstractEncode { .. } => "config::abstract_encode",
            ConfigError::DuplicateWireName { .. } => "config::duplicate_wire_name",
        }
    }
}
