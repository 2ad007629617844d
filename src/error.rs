//! Error types for setup and runtime failures.
//!
//! Setup problems (malformed records, bad rule references, finalize misuse)
//! are [`ConfigError`]s. Everything raised while ticking is an [`Error`].
//! Nothing here is retried or rolled back: errors propagate straight out of
//! `update`, `get` and `set` to the caller.

use thiserror::Error;

/// Errors raised while declaring records and rule tables.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Field '{field}' has no default value")]
    MissingDefault { field: String },

    #[error("Default for field '{field}' does not serialize: {reason}")]
    InvalidDefault { field: String, reason: String },

    #[error("Field '{field}' has no access scope")]
    MissingAccess { field: String },

    #[error("Field '{field}' is declared more than once")]
    DuplicateField { field: String },

    #[error("State '{name}' is declared more than once")]
    DuplicateState { name: String },

    #[error("Reference to state '{name}' never resolved")]
    UnresolvedState { name: String },

    #[error("State '{name}' belongs to a different rule table")]
    ForeignState { name: String },

    #[error("Data store was built against a different rule table")]
    ForeignStore,

    #[error("Rule belongs to a different rule table")]
    ForeignRule,

    #[error("Edge action needs a source, a destination, or both")]
    WildcardEdge,

    #[error("Rule table already finalized")]
    AlreadyFinalized,

    #[error("Rule table must be finalized before cursors can run on it")]
    NotFinalized,

    #[error("{} unresolved references: {}", .0.len(), join(.0))]
    Unresolved(Vec<ConfigError>),
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while reading, writing and ticking.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("State '{state}' cannot access field '{field}'")]
    AccessDenied { field: String, state: String },

    #[error("Unknown field '{field}'")]
    UnknownField { field: String },

    #[error("No active cursor grants access to field '{field}'")]
    FieldNotAccessible { field: String },

    #[error("Field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Action failed: {0}")]
    Action(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for failing a user hook with a message.
    pub fn action(message: impl Into<String>) -> Self {
        Error::Action(message.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_lists_every_name() {
        let err = ConfigError::Unresolved(vec![
            ConfigError::UnresolvedState {
                name: "Second".to_string(),
            },
            ConfigError::UnresolvedState {
                name: "Third".to_string(),
            },
        ]);

        let msg = err.to_string();
        assert!(msg.starts_with("2 unresolved references"));
        assert!(msg.contains("'Second'"));
        assert!(msg.contains("'Third'"));
    }

    #[test]
    fn config_errors_convert_into_runtime_errors() {
        let err: Error = ConfigError::AlreadyFinalized.into();
        assert!(matches!(err, Error::Config(ConfigError::AlreadyFinalized)));
        assert_eq!(err.to_string(), "Rule table already finalized");
    }
}
