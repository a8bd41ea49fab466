/// All errors produced while registering, resolving, building or reading
/// raw records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Resolution found zero candidate types for the record.
    #[error("no type in family '{family}' matches the given record")]
    NoMatch { family: String },

    /// More than one candidate survived predicate filtering.
    #[error(
        "multiple types ({}) in family '{}' match the given record",
        .candidates.join(", "),
        .family
    )]
    Ambiguous {
        family: String,
        candidates: Vec<String>,
    },

    /// A required field with no default is absent from the record.
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// A raw value cannot be coerced to the declared field type.
    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    /// A value has the right shape but invalid content.
    #[error("malformed value for field '{field}': {reason}")]
    Malformed { field: String, reason: String },

    /// A dotted-path lookup failed partway through a nested record or schema.
    #[error("key '{key}' of path '{path}' not found")]
    MissingKey { path: String, key: String },

    /// The family was never declared on the registry.
    #[error("unknown family: {name}")]
    UnknownFamily { name: String },

    /// The type was never declared on the registry.
    #[error("unknown type: {name}")]
    UnknownType { name: String },

    /// The family is declared but no type has registered with it yet.
    #[error("family '{family}' has no registered types")]
    EmptyFamily { family: String },

    /// A type joining a family defines no static value for one of its
    /// discriminator attributes.
    #[error("type '{type_name}' defines no static value for discriminator '{attr}'")]
    MissingDiscriminator { type_name: String, attr: String },
}

impl DispatchError {
    /// Re-root a coercion error under a parent field path.
    ///
    /// Field-scoped variants get `prefix` prepended to their field; every other
    /// variant is returned unchanged.
    pub fn within(self, prefix: &str) -> Self {
        let join = |field: String| {
            if field.is_empty() {
                prefix.to_string()
            } else if field.starts_with('[') || field.starts_with('{') {
                format!("{}{}", prefix, field)
            } else {
                format!("{}.{}", prefix, field)
            }
        };
        match self {
            DispatchError::MissingField { field } => DispatchError::MissingField {
                field: join(field),
            },
            DispatchError::TypeMismatch {
                field,
                expected,
                got,
            } => DispatchError::TypeMismatch {
                field: join(field),
                expected,
                got,
            },
            DispatchError::Malformed { field, reason } => DispatchError::Malformed {
                field: join(field),
                reason,
            },
            other => other,
        }
    }
}

/// Errors raised while reading a catalogue document.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    /// The document does not have the catalogue shape.
    #[error("invalid catalogue: {0}")]
    Invalid(#[from] serde_json::Error),

    /// A field type descriptor could not be understood.
    #[error("bad field type for '{owner}.{field}': {message}")]
    FieldType {
        owner: String,
        field: String,
        message: String,
    },

    /// A match predicate could not be understood.
    #[error("bad match predicate on '{owner}': {message}")]
    Predicate { owner: String, message: String },

    /// Registering a catalogue entry failed.
    #[error(transparent)]
    Registration(#[from] DispatchError),
}
