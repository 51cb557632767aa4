//! Error types for kind registration and summarization.

use thiserror::Error;

/// Errors that can occur while registering kinds or building summaries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KindError {
    /// The kind id is empty or contains a forbidden character.
    #[error("invalid kind id {id:?}: {reason}")]
    InvalidKindId { id: String, reason: String },

    /// A kind with this id is already registered.
    #[error("kind already registered: {0}")]
    AlreadyRegistered(String),

    /// No kind with this id is registered.
    #[error("unknown kind: {0}")]
    UnknownKind(String),

    /// The body could not be interpreted as this kind.
    #[error("invalid {kind} body: {reason}")]
    InvalidBody { kind: String, reason: String },

    /// The builder returned a summary for a different object.
    #[error("internal error: summary {field} mismatch (expected {expected:?}, got {actual:?})")]
    Mismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl KindError {
    pub fn invalid_body(kind: &str, reason: impl Into<String>) -> Self {
        Self::InvalidBody {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for kind operations.
pub type KindResult<T> = std::result::Result<T, KindError>;
