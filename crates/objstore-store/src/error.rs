use objstore_kinds::{KindError, ObjectErrorInfo};

use crate::collection::CollectionError;
use crate::resolver::ResolveError;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The GRN is missing a required field or is malformed.
    #[error("invalid grn {grn:?}: {reason}")]
    InvalidGrn { grn: String, reason: String },

    /// The GRN names a tenant other than the caller's.
    #[error("tenant mismatch: request is scoped to tenant {context}, grn names tenant {grn}")]
    TenantMismatch { context: i64, grn: i64 },

    /// No kind with this id is registered.
    #[error("unknown kind: {0}")]
    UnknownKind(String),

    /// The request is malformed (heterogeneous batch, bad version, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request uses an option the store recognizes but does not support.
    #[error("not yet supported: {0}")]
    Unsupported(String),

    /// `previous_version` did not match the current version.
    #[error("optimistic lock failed for {oid}: expected version {expected:?}, current version is {actual:?}")]
    OptimisticLock {
        oid: String,
        expected: String,
        actual: String,
    },

    /// The kind's summary builder rejected the body.
    #[error("summary error: {0}")]
    Kind(KindError),

    /// The reference resolver could not be reached.
    #[error("reference resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// The caller cancelled the operation; nothing was committed.
    #[error("operation cancelled")]
    Cancelled,

    /// SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File collection failure.
    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record could not be decoded.
    #[error("corrupt record {oid}: {reason}")]
    Corrupt { oid: String, reason: String },

    /// A lock guarding backend state was poisoned by a panicking thread.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Conflicts are the only errors a caller can fix by re-reading and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OptimisticLock { .. })
    }

    /// Returns `true` for errors caused by the request rather than the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidGrn { .. }
                | Self::TenantMismatch { .. }
                | Self::UnknownKind(_)
                | Self::InvalidRequest(_)
                | Self::Unsupported(_)
                | Self::Kind(_)
        )
    }

    /// HTTP-style status code used when rendering the error to callers.
    pub fn code(&self) -> i64 {
        if self.is_retryable() {
            409
        } else if self.is_validation() {
            400
        } else {
            500
        }
    }

    pub fn to_error_info(&self) -> ObjectErrorInfo {
        ObjectErrorInfo::new(self.code(), self.to_string())
    }
}

impl From<KindError> for StoreError {
    fn from(err: KindError) -> Self {
        match err {
            KindError::UnknownKind(kind) => Self::UnknownKind(kind),
            other => Self::Kind(other),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
