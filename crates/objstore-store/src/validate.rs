//! Request validation shared by every engine. Nothing here touches storage.

use objstore_kinds::KindRegistry;
use objstore_types::{route_from_key, Grn};

use crate::context::StoreContext;
use crate::error::{StoreError, StoreResult};
use crate::model::{BatchReadRequest, ObjectHistoryRequest, ObjectSearchRequest, ReadObjectRequest};

/// Default and maximum page size for history listings.
pub(crate) const HISTORY_LIMIT: usize = 100;
/// Default page size for searches.
pub(crate) const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Check a GRN and bind it to the caller's tenant.
pub(crate) fn scope_grn(ctx: &StoreContext, grn: &Grn) -> StoreResult<Grn> {
    if ctx.tenant_id <= 0 {
        return Err(StoreError::InvalidRequest(format!(
            "context tenant must be positive, got {}",
            ctx.tenant_id
        )));
    }

    let mut scoped = grn.clone();
    if scoped.tenant_id == 0 {
        scoped.tenant_id = ctx.tenant_id;
    } else if scoped.tenant_id != ctx.tenant_id {
        return Err(StoreError::TenantMismatch {
            context: ctx.tenant_id,
            grn: scoped.tenant_id,
        });
    }

    if scoped.kind.is_empty() {
        return Err(invalid_grn(&scoped, "missing kind"));
    }
    if scoped.kind.contains('/') {
        return Err(invalid_grn(&scoped, "kind may not contain '/'"));
    }
    if scoped.uid.is_empty() {
        return Err(invalid_grn(&scoped, "missing uid"));
    }
    Ok(scoped)
}

/// Scope the GRN and require its kind to be registered.
pub(crate) fn scope_known_grn(ctx: &StoreContext, grn: &Grn, kinds: &KindRegistry) -> StoreResult<Grn> {
    let scoped = scope_grn(ctx, grn)?;
    if !kinds.contains(&scoped.kind) {
        return Err(StoreError::UnknownKind(scoped.kind));
    }
    Ok(scoped)
}

fn invalid_grn(grn: &Grn, reason: &str) -> StoreError {
    StoreError::InvalidGrn {
        grn: grn.to_oid(),
        reason: reason.to_string(),
    }
}

/// Uniform options of a batch read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BatchFlags {
    pub with_body: bool,
    pub with_summary: bool,
}

/// Validate a batch read and return its scoped GRNs in request order.
///
/// Every item must carry the same flags and none may ask for a version.
pub(crate) fn batch(ctx: &StoreContext, req: &BatchReadRequest) -> StoreResult<(Vec<Grn>, BatchFlags)> {
    let Some(first) = req.requests.first() else {
        return Ok((Vec::new(), BatchFlags::default()));
    };
    let flags = flags_of(first);

    let mut grns = Vec::with_capacity(req.requests.len());
    for item in &req.requests {
        if item.version.is_some() {
            return Err(StoreError::InvalidRequest(
                "batch read does not support versions".into(),
            ));
        }
        if flags_of(item) != flags {
            return Err(StoreError::InvalidRequest(
                "batch read items must all request the same body and summary options".into(),
            ));
        }
        grns.push(scope_grn(ctx, &item.grn)?);
    }
    Ok((grns, flags))
}

fn flags_of(req: &ReadObjectRequest) -> BatchFlags {
    BatchFlags {
        with_body: req.with_body,
        with_summary: req.with_summary,
    }
}

/// Validated history request.
pub(crate) fn history(ctx: &StoreContext, req: &ObjectHistoryRequest) -> StoreResult<(Grn, usize)> {
    if req.next_page_token.is_some() {
        return Err(StoreError::Unsupported("history paging".into()));
    }
    let grn = scope_grn(ctx, &req.grn)?;
    let limit = req.limit.unwrap_or(HISTORY_LIMIT).clamp(1, HISTORY_LIMIT);
    Ok((grn, limit))
}

/// A validated search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SearchPlan {
    pub limit: usize,
    /// OID to resume from (inclusive).
    pub start_oid: Option<String>,
    pub kinds: Vec<String>,
}

pub(crate) fn search(ctx: &StoreContext, req: &ObjectSearchRequest, max_limit: usize) -> StoreResult<SearchPlan> {
    if ctx.tenant_id <= 0 {
        return Err(StoreError::InvalidRequest(format!(
            "context tenant must be positive, got {}",
            ctx.tenant_id
        )));
    }
    if !req.labels.is_empty() {
        return Err(StoreError::Unsupported("label filters".into()));
    }
    if !req.sort.is_empty() {
        return Err(StoreError::Unsupported("custom sort".into()));
    }

    let limit = match req.limit {
        None | Some(0) => DEFAULT_SEARCH_LIMIT,
        Some(n) => n,
    }
    .min(max_limit.max(1));

    let start_oid = match &req.next_page_token {
        None => None,
        Some(token) => {
            let grn = route_from_key(token).map_err(|e| {
                StoreError::InvalidRequest(format!("invalid page token {token:?}: {e}"))
            })?;
            if grn.tenant_id != ctx.tenant_id {
                return Err(StoreError::TenantMismatch {
                    context: ctx.tenant_id,
                    grn: grn.tenant_id,
                });
            }
            Some(token.clone())
        }
    };

    let mut kinds = req.kinds.clone();
    kinds.sort();
    kinds.dedup();

    Ok(SearchPlan {
        limit,
        start_oid,
        kinds,
    })
}
