//! Versioned object storage.
//!
//! Objects are opaque byte payloads addressed by a [`Grn`](objstore_types::Grn)
//! and stored under its OID. Every write runs the kind's summary builder,
//! hashes the normalized body into an etag, and then, atomically:
//!
//! 1. short-circuits with `UNCHANGED` if the etag equals the current one,
//! 2. checks `previous_version` against the current version (optimistic lock),
//! 3. appends an immutable history row,
//! 4. replaces the object's labels and resolved references,
//! 5. inserts or updates the "current" row.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait and pass the same
//! conformance suite:
//!
//! - [`SqliteObjectStore`] -- four tables in SQLite, one transaction per call
//! - [`FileObjectStore`] -- per-tenant JSON files holding every version
//!
//! # Design Rules
//!
//! 1. Every operation is scoped to the caller's tenant.
//! 2. Validation happens before any storage is touched.
//! 3. "Not found" is a value, not an error.
//! 4. Nothing retries internally; optimistic-lock conflicts are surfaced as
//!    [`StoreError::OptimisticLock`] for the caller to retry.
//! 5. Partial writes are never committed.

pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod file;
pub mod model;
pub mod resolver;
pub mod sql;
pub mod traits;

mod validate;
mod version;
mod write;

pub use collection::{CollectionError, FileCollection, Mutation};
pub use config::{open_store, Backend, FileConfig, ResolverConfig, SqliteConfig, StoreConfig};
pub use context::{CancelFlag, StoreContext};
pub use error::{StoreError, StoreResult};
pub use file::{FileObjectStore, RawObjectWithHistory};
pub use model::{
    BatchReadRequest, BatchReadResponse, DanglingReference, DeleteObjectRequest,
    DeleteObjectResponse, ObjectHistoryRequest, ObjectHistoryResponse, ObjectOriginInfo,
    ObjectSearchRequest, ObjectSearchResponse, ObjectSearchResult, ObjectVersionInfo, RawObject,
    ReadObjectRequest, ReadObjectResponse, WriteObjectRequest, WriteObjectResponse, WriteStatus,
};
pub use resolver::{
    CatalogResolver, DatasourceEntry, ReferenceResolver, ResolveError, ResolvedReference,
    StoredReference,
};
pub use sql::SqliteObjectStore;
pub use traits::ObjectStore;
