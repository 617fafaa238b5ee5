//! Error types for the onboarding wizard engine.
//!
//! Every public operation of the engine returns these as values. None of
//! them is fatal to a session: the calling surface decides how to present
//! them.

use std::collections::BTreeMap;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while building or querying a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Duplicate field key '{key}' in phase '{phase}'")]
    DuplicateFieldKey { phase: String, key: String },

    #[error("Duplicate section key '{0}'")]
    DuplicateSectionKey(String),

    #[error("Phase not found: {0}")]
    PhaseNotFound(String),

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Phase '{0}' has no sections")]
    EmptyPhase(String),
}

/// Errors surfaced by the persistence boundary.
///
/// `Rejected` carries the server's message verbatim plus any per-field
/// errors (keyed by backend field name) so they can be merged into the
/// local validation result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PersistenceError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("{message}")]
    Rejected {
        message: String,
        field_errors: BTreeMap<String, String>,
    },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl PersistenceError {
    /// Message suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Server-provided field errors, if any.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Rejected { field_errors, .. } if !field_errors.is_empty() => Some(field_errors),
            _ => None,
        }
    }
}

/// Contract violations by a caller of the store or controller.
///
/// These are reported and then ignored; the session stays usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Already at the last section of the last phase")]
    AlreadyTerminal,

    #[error("Already at the first section of the first phase")]
    AlreadyAtStart,

    #[error("Section {index} is out of range for phase '{phase}'")]
    SectionOutOfRange { phase: String, index: usize },

    #[error("Section '{0}' has not been completed yet")]
    SectionNotCompleted(String),

    #[error("No completion message is awaiting acknowledgment")]
    NothingToAcknowledge,

    #[error("A save for section '{0}' is already in flight")]
    SaveInFlight(String),

    #[error("Controller is {current}, cannot {action}")]
    InvalidTransition { current: String, action: String },

    #[error("Field '{0}' is not part of the schema")]
    UnknownField(String),
}

/// A single field failed numeric/boolean coercion on the outbound path.
///
/// Never propagated as a failure: the mapper substitutes a default and
/// records one of these on the payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Field '{field}' could not be coerced to {expected} (got {raw:?}); used default")]
pub struct TransformError {
    pub field: String,
    pub expected: &'static str,
    pub raw: String,
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_user_message_is_verbatim() {
        let err = PersistenceError::Rejected {
            message: "Registration number already in use".into(),
            field_errors: BTreeMap::new(),
        };
        assert_eq!(err.user_message(), "Registration number already in use");
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn field_errors_exposed_when_present() {
        let mut field_errors = BTreeMap::new();
        field_errors.insert("company_name".to_string(), "Taken".to_string());
        let err = PersistenceError::Rejected {
            message: "Validation failed".into(),
            field_errors,
        };
        assert_eq!(err.field_errors().unwrap()["company_name"], "Taken");
    }

    #[test]
    fn top_level_wraps_state_error() {
        let err: Error = StateError::AlreadyTerminal.into();
        assert!(err.to_string().contains("last phase"));
    }
}
