//! Foundation types for the object store.
//!
//! Every other objstore crate depends on `objstore-types`.
//!
//! # Key Types
//!
//! - [`Grn`] -- resource name: `(tenant, kind, uid)` plus an optional scope
//! - [`route_from_key`] -- parses a canonical OID back into a [`Grn`]
//! - [`Etag`] -- content hash of an object body (BLAKE3, hex encoded)

pub mod error;
pub mod etag;
pub mod grn;

pub use error::GrnError;
pub use etag::Etag;
pub use grn::{route_from_key, Grn};
