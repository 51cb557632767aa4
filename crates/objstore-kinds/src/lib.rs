//! Kinds for the object store.
//!
//! A *kind* is a named object type (dashboard, playlist, ...) with its own
//! summary-extraction logic. The store never hardcodes per-kind behavior: it
//! asks the [`KindRegistry`] for the kind's [`SummaryBuilder`] and persists
//! whatever [`ObjectSummary`] comes back.
//!
//! # Contract for summary builders
//!
//! 1. A builder is a pure function of the body. It must not consult tenant
//!    state, storage, or wall-clock time for anything in the summary.
//! 2. The returned summary carries the caller's uid and the builder's kind;
//!    the registry rejects mismatches.
//! 3. Builders must be cheap: summaries of historical versions are never
//!    persisted and are recomputed from the stored body on read.
//! 4. References are collected through a [`ReferenceAccumulator`] so the
//!    output order is independent of discovery order.

pub mod accumulator;
pub mod builder;
pub mod builtin;
pub mod error;
pub mod info;
pub mod registry;
pub mod summary;

pub use accumulator::ReferenceAccumulator;
pub use builder::SummaryBuilder;
pub use error::{KindError, KindResult};
pub use info::KindInfo;
pub use registry::KindRegistry;
pub use summary::{slugify, ObjectErrorInfo, ObjectReference, ObjectSummary};
