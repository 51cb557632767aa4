use thiserror::Error;

/// Errors produced while parsing or validating resource names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrnError {
    #[error("missing tenant segment in key {0:?}")]
    MissingTenant(String),

    #[error("invalid tenant segment {segment:?} in key {key:?}")]
    InvalidTenant { key: String, segment: String },

    #[error("missing kind segment in key {0:?}")]
    MissingKind(String),

    #[error("missing uid segment in key {0:?}")]
    MissingUid(String),
}
