//! The engine-independent half of the write protocol.
//!
//! [`prepare`] runs everything that needs no storage: GRN scoping, the
//! kind's summary builder, etag hashing and reference resolution. A builder
//! or resolver failure therefore aborts the write before any table is
//! touched. [`decide`] is the pure decision made inside the engine's
//! critical section once the current state is known.

use objstore_kinds::{KindRegistry, ObjectSummary};
use objstore_types::{Etag, Grn};
use tracing::warn;

use crate::context::StoreContext;
use crate::error::{StoreError, StoreResult};
use crate::model::{ObjectVersionInfo, WriteObjectRequest, WriteObjectResponse, WriteStatus};
use crate::resolver::{now_millis, ReferenceResolver, StoredReference};
use crate::validate;
use crate::version;

/// A write whose body has been summarized and whose references resolved.
#[derive(Debug)]
pub(crate) struct PreparedWrite {
    pub grn: Grn,
    pub oid: String,
    pub summary: ObjectSummary,
    /// Normalized body; this is what gets stored and hashed.
    pub body: Vec<u8>,
    pub etag: Etag,
    pub references: Vec<StoredReference>,
    pub now: i64,
}

impl PreparedWrite {
    pub fn size(&self) -> i64 {
        self.body.len() as i64
    }
}

pub(crate) fn prepare(
    ctx: &StoreContext,
    req: &WriteObjectRequest,
    kinds: &KindRegistry,
    resolver: &dyn ReferenceResolver,
) -> StoreResult<PreparedWrite> {
    let grn = validate::scope_known_grn(ctx, &req.grn, kinds)?;
    let oid = grn.to_oid();

    let (summary, body) = kinds.summarize(&grn.kind, &grn.uid, &req.body)?;
    let etag = Etag::of(&body);

    let mut references = Vec::with_capacity(summary.references.len());
    for reference in &summary.references {
        ctx.check_cancelled()?;
        let resolved = resolver.resolve(reference)?;
        if !resolved.ok {
            warn!(%oid, reference = %reference.composite_key(), warning = %resolved.warning, "unresolved reference");
        }
        references.push(StoredReference {
            reference: reference.clone(),
            resolved,
        });
    }

    Ok(PreparedWrite {
        grn,
        oid,
        summary,
        body,
        etag,
        references,
        now: now_millis(),
    })
}

/// The parts of the current row a write decision depends on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct CurrentState {
    pub version: String,
    pub etag: String,
    pub size: i64,
    pub folder: String,
    pub created_at: i64,
    pub created_by: String,
    pub updated_at: i64,
    pub updated_by: String,
    pub comment: String,
}

impl CurrentState {
    pub fn version_info(&self) -> ObjectVersionInfo {
        ObjectVersionInfo {
            version: self.version.clone(),
            updated_at: self.updated_at,
            updated_by: self.updated_by.clone(),
            size: self.size,
            etag: self.etag.clone(),
            comment: self.comment.clone(),
        }
    }
}

/// What the engine must do with a prepared write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum WritePlan {
    /// Same content as the current version; touch nothing.
    Unchanged(ObjectVersionInfo),
    /// Store `version`.
    Apply(AppliedWrite),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AppliedWrite {
    pub version: String,
    /// `true` when a current row exists and will be updated in place.
    pub is_update: bool,
    /// Drop every stored row for the object before applying.
    pub clear_history: bool,
    pub folder: String,
    pub created_at: i64,
    pub created_by: String,
}

impl AppliedWrite {
    pub fn status(&self) -> WriteStatus {
        if self.is_update {
            WriteStatus::Updated
        } else {
            WriteStatus::Created
        }
    }
}

/// Decide the outcome of a write against the current state.
///
/// An unchanged body wins over a stale `previous_version`: the etag check
/// runs first. With `clear_history` the object is treated as absent, except
/// that its creation metadata is carried over.
pub(crate) fn decide(
    ctx: &StoreContext,
    req: &WriteObjectRequest,
    prepared: &PreparedWrite,
    current: Option<&CurrentState>,
) -> StoreResult<WritePlan> {
    let created_at = current.map_or(prepared.now, |c| c.created_at);
    let created_by = current.map_or_else(|| ctx.user.clone(), |c| c.created_by.clone());
    let folder = req
        .folder
        .clone()
        .or_else(|| current.map(|c| c.folder.clone()))
        .unwrap_or_default();

    if req.clear_history {
        let version = version::next_version(None, req.version.as_deref(), prepared.now)?;
        return Ok(WritePlan::Apply(AppliedWrite {
            version,
            is_update: false,
            clear_history: true,
            folder,
            created_at,
            created_by,
        }));
    }

    if let Some(current) = current {
        if prepared.etag.as_str() == current.etag {
            return Ok(WritePlan::Unchanged(current.version_info()));
        }
        if !version::matches_previous(req.previous_version.as_deref(), &current.version) {
            return Err(StoreError::OptimisticLock {
                oid: prepared.oid.clone(),
                expected: req.previous_version.clone().unwrap_or_default(),
                actual: current.version.clone(),
            });
        }
    }

    let version = version::next_version(
        current.map(|c| c.version.as_str()),
        req.version.as_deref(),
        prepared.now,
    )?;
    Ok(WritePlan::Apply(AppliedWrite {
        version,
        is_update: current.is_some(),
        clear_history: false,
        folder,
        created_at,
        created_by,
    }))
}

/// Version info of the row a write just stored.
pub(crate) fn stored_info(
    ctx: &StoreContext,
    req: &WriteObjectRequest,
    prepared: &PreparedWrite,
    applied: &AppliedWrite,
) -> ObjectVersionInfo {
    ObjectVersionInfo {
        version: applied.version.clone(),
        updated_at: prepared.now,
        updated_by: ctx.user.clone(),
        size: prepared.size(),
        etag: prepared.etag.as_str().to_string(),
        comment: req.comment.clone(),
    }
}

pub(crate) fn respond(
    prepared: &PreparedWrite,
    status: WriteStatus,
    info: ObjectVersionInfo,
) -> StoreResult<WriteObjectResponse> {
    Ok(WriteObjectResponse {
        grn: prepared.grn.clone(),
        status,
        object: Some(info),
        summary_json: Some(prepared.summary.to_json()?),
        error: None,
    })
}
