//! File-backed storage engine.
//!
//! One [`FileCollection`] per kind; each tenant's objects of that kind live
//! in one JSON file. Items keep every stored version, so history and
//! historical reads need nothing beyond the item itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use objstore_kinds::{KindInfo, KindRegistry, ObjectSummary};
use objstore_types::Grn;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collection::{FileCollection, Mutation};
use crate::context::StoreContext;
use crate::error::{StoreError, StoreResult};
use crate::model::{
    BatchReadRequest, BatchReadResponse, DanglingReference, DeleteObjectRequest,
    DeleteObjectResponse, ObjectHistoryRequest, ObjectHistoryResponse, ObjectSearchRequest,
    ObjectSearchResponse, ObjectSearchResult, ObjectVersionInfo, RawObject, ReadObjectRequest, ReadObjectResponse,
    WriteObjectRequest, WriteObjectResponse, WriteStatus,
};
use crate::resolver::{ReferenceResolver, StoredReference};
use crate::sql::DEFAULT_MAX_SEARCH_LIMIT;
use crate::traits::ObjectStore;
use crate::validate;
use crate::version;
use crate::write::{self, CurrentState, PreparedWrite, WritePlan};

/// Layout revision of the collection files.
pub const COLLECTION_VERSION: u32 = 1;

/// One object together with everything the engine keeps about it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawObjectWithHistory {
    /// Current version, body included.
    pub object: RawObject,
    /// Summary of the current version, without nested summaries.
    pub summary: ObjectSummary,
    #[serde(default)]
    pub references: Vec<StoredReference>,
    /// Every stored version, oldest first, bodies included.
    #[serde(default)]
    pub history: Vec<RawObject>,
}

impl RawObjectWithHistory {
    fn state(&self) -> CurrentState {
        let o = &self.object;
        CurrentState {
            version: o.version.clone(),
            etag: o.etag.clone(),
            size: o.size,
            folder: o.folder.clone(),
            created_at: o.created_at,
            created_by: o.created_by.clone(),
            updated_at: o.updated_at,
            updated_by: o.updated_by.clone(),
            comment: o.comment.clone(),
        }
    }

    fn search_result(&self, req: &ObjectSearchRequest) -> ObjectSearchResult {
        let o = &self.object;
        ObjectSearchResult {
            grn: o.grn.clone(),
            version: o.version.clone(),
            name: self.summary.name.clone(),
            description: self.summary.description.clone(),
            slug: self.summary.slug.clone(),
            folder: o.folder.clone(),
            size: o.size,
            updated_at: o.updated_at,
            updated_by: o.updated_by.clone(),
            body: if req.with_body { o.body.clone() } else { None },
            labels: req.with_labels.then(|| self.summary.labels.clone()),
            fields: req.with_fields.then(|| self.summary.fields.clone()),
            error: self.summary.error.clone(),
        }
    }
}

type Collection = FileCollection<RawObjectWithHistory>;

/// Object store persisted as JSON files under a root directory.
pub struct FileObjectStore {
    root: PathBuf,
    collections: RwLock<BTreeMap<String, Arc<Collection>>>,
    kinds: Arc<KindRegistry>,
    resolver: Arc<dyn ReferenceResolver>,
    max_search_limit: usize,
}

impl FileObjectStore {
    pub fn open(
        root: impl AsRef<Path>,
        kinds: Arc<KindRegistry>,
        resolver: Arc<dyn ReferenceResolver>,
    ) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        info!(root = %root.display(), "opened file object store");
        Ok(Self {
            root,
            collections: RwLock::new(BTreeMap::new()),
            kinds,
            resolver,
            max_search_limit: DEFAULT_MAX_SEARCH_LIMIT,
        })
    }

    pub fn with_max_search_limit(mut self, limit: usize) -> Self {
        self.max_search_limit = limit.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The collection holding `kind`. Instances are shared so that every
    /// caller goes through the same per-org locks.
    fn collection(&self, kind: &str) -> Arc<Collection> {
        if let Some(c) = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
        {
            return Arc::clone(c);
        }
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            collections
                .entry(kind.to_string())
                .or_insert_with(|| Arc::new(FileCollection::new(&self.root, kind, COLLECTION_VERSION))),
        )
    }

    fn find(&self, grn: &Grn) -> StoreResult<Option<RawObjectWithHistory>> {
        if !self.kinds.contains(&grn.kind) {
            return Ok(None);
        }
        Ok(self
            .collection(&grn.kind)
            .find_first(grn.tenant_id, |item| item.object.grn.uid == grn.uid)?)
    }

    /// Every current object of the tenant, across the requested kinds.
    fn all(&self, tenant_id: i64, kinds: &[String]) -> StoreResult<Vec<RawObjectWithHistory>> {
        let kinds: Vec<String> = if kinds.is_empty() {
            self.kinds.kinds().into_iter().map(|k| k.id).collect()
        } else {
            kinds.iter().filter(|k| self.kinds.contains(k)).cloned().collect()
        };
        let mut items = Vec::new();
        for kind in kinds {
            items.extend(self.collection(&kind).find(tenant_id, |_| true)?);
        }
        Ok(items)
    }

    fn read_scoped(&self, grn: &Grn, req: &ReadObjectRequest) -> StoreResult<ReadObjectResponse> {
        let Some(item) = self.find(grn)? else {
            return Ok(ReadObjectResponse::not_found());
        };

        match req.version.as_deref().filter(|v| !v.is_empty()) {
            None => {
                let mut object = item.object;
                if !req.with_body {
                    object.body = None;
                }
                Ok(ReadObjectResponse {
                    object: Some(object),
                    summary: req.with_summary.then_some(item.summary),
                })
            }
            Some(version) => {
                let Some(mut object) = item.history.into_iter().find(|h| h.version == version) else {
                    return Ok(ReadObjectResponse::not_found());
                };
                let summary = if req.with_summary {
                    let body = object.body.as_deref().unwrap_or_default();
                    Some(self.kinds.summarize(&grn.kind, &grn.uid, body)?.0)
                } else {
                    None
                };
                if !req.with_body {
                    object.body = None;
                }
                Ok(ReadObjectResponse {
                    object: Some(object),
                    summary,
                })
            }
        }
    }
}

impl ObjectStore for FileObjectStore {
    fn read(&self, ctx: &StoreContext, req: &ReadObjectRequest) -> StoreResult<ReadObjectResponse> {
        let grn = validate::scope_grn(ctx, &req.grn)?;
        ctx.check_cancelled()?;
        debug!(oid = %grn.to_oid(), version = ?req.version, "read");
        self.read_scoped(&grn, req)
    }

    fn batch_read(&self, ctx: &StoreContext, req: &BatchReadRequest) -> StoreResult<BatchReadResponse> {
        let (grns, flags) = validate::batch(ctx, req)?;
        debug!(count = grns.len(), "batch read");

        let mut results = Vec::with_capacity(grns.len());
        for grn in grns {
            ctx.check_cancelled()?;
            let item = ReadObjectRequest {
                grn: grn.clone(),
                version: None,
                with_body: flags.with_body,
                with_summary: flags.with_summary,
            };
            results.push(self.read_scoped(&grn, &item)?);
        }
        Ok(BatchReadResponse { results })
    }

    fn write(&self, ctx: &StoreContext, req: &WriteObjectRequest) -> StoreResult<WriteObjectResponse> {
        let prepared = write::prepare(ctx, req, &self.kinds, self.resolver.as_ref())?;
        ctx.check_cancelled()?;
        debug!(oid = %prepared.oid, kind = %prepared.grn.kind, etag = %prepared.etag.short(), "write");

        let collection = self.collection(&prepared.grn.kind);
        let (status, info) = collection.mutate(prepared.grn.tenant_id, |items| apply_write(ctx, req, &prepared, items))?;

        if status == WriteStatus::Unchanged {
            debug!(oid = %prepared.oid, version = %info.version, "unchanged");
        } else {
            info!(oid = %prepared.oid, version = %info.version, ?status, "stored object");
        }
        write::respond(&prepared, status, info)
    }

    fn delete(&self, ctx: &StoreContext, req: &DeleteObjectRequest) -> StoreResult<DeleteObjectResponse> {
        let grn = validate::scope_grn(ctx, &req.grn)?;
        ctx.check_cancelled()?;
        if !self.kinds.contains(&grn.kind) {
            return Ok(DeleteObjectResponse { ok: false });
        }
        let oid = grn.to_oid();

        let ok = self.collection(&grn.kind).mutate(grn.tenant_id, |items: &mut Vec<RawObjectWithHistory>| -> StoreResult<Mutation<bool>> {
            let Some(pos) = items.iter().position(|item| item.object.grn.uid == grn.uid) else {
                return Ok(Mutation::Discard(false));
            };
            let current = &items[pos].object.version;
            if !version::matches_previous(req.previous_version.as_deref(), current) {
                return Err(StoreError::OptimisticLock {
                    oid: oid.clone(),
                    expected: req.previous_version.clone().unwrap_or_default(),
                    actual: current.clone(),
                });
            }
            ctx.check_cancelled()?;
            items.remove(pos);
            Ok(Mutation::Save(true))
        })?;

        if ok {
            info!(%oid, "deleted object");
        }
        Ok(DeleteObjectResponse { ok })
    }

    fn history(&self, ctx: &StoreContext, req: &ObjectHistoryRequest) -> StoreResult<ObjectHistoryResponse> {
        let (grn, limit) = validate::history(ctx, req)?;
        ctx.check_cancelled()?;
        debug!(oid = %grn.to_oid(), limit, "history");

        let mut entries = self.find(&grn)?.map(|item| item.history).unwrap_or_default();
        entries.sort_by(|a, b| {
            version::sort_key(&b.version)
                .cmp(&version::sort_key(&a.version))
                .then(b.updated_at.cmp(&a.updated_at))
        });
        let versions = entries.iter().take(limit).map(RawObject::version_info).collect();

        Ok(ObjectHistoryResponse {
            grn,
            versions,
            next_page_token: None,
        })
    }

    fn search(&self, ctx: &StoreContext, req: &ObjectSearchRequest) -> StoreResult<ObjectSearchResponse> {
        let plan = validate::search(ctx, req, self.max_search_limit)?;
        ctx.check_cancelled()?;
        debug!(tenant = ctx.tenant_id, kinds = ?plan.kinds, limit = plan.limit, "search");

        let mut matched: Vec<(String, RawObjectWithHistory)> = self
            .all(ctx.tenant_id, &plan.kinds)?
            .into_iter()
            .filter(|item| req.folder.as_ref().map_or(true, |f| &item.object.folder == f))
            .map(|item| (item.object.grn.to_oid(), item))
            .filter(|(oid, _)| plan.start_oid.as_ref().map_or(true, |start| oid >= start))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));

        let next_page_token = matched.get(plan.limit).map(|(oid, _)| oid.clone());
        let results = matched
            .iter()
            .take(plan.limit)
            .map(|(_, item)| item.search_result(req))
            .collect();

        Ok(ObjectSearchResponse {
            results,
            next_page_token,
        })
    }

    fn dangling_references(&self, ctx: &StoreContext) -> StoreResult<Vec<DanglingReference>> {
        ctx.check_cancelled()?;
        let mut dangling: Vec<DanglingReference> = self
            .all(ctx.tenant_id, &[])?
            .into_iter()
            .flat_map(|item| {
                let source = item.object.grn;
                item.references
                    .into_iter()
                    .filter(|r| !r.resolved.ok)
                    .map(move |reference| DanglingReference {
                        source: source.clone(),
                        reference,
                    })
            })
            .collect();
        dangling.sort_by(|a, b| {
            (a.source.to_oid(), a.reference.reference.composite_key())
                .cmp(&(b.source.to_oid(), b.reference.reference.composite_key()))
        });
        Ok(dangling)
    }

    fn kinds(&self) -> Vec<KindInfo> {
        self.kinds.kinds()
    }
}

/// Apply a prepared write to the tenant's items of one kind.
fn apply_write(
    ctx: &StoreContext,
    req: &WriteObjectRequest,
    prepared: &PreparedWrite,
    items: &mut Vec<RawObjectWithHistory>,
) -> StoreResult<Mutation<(WriteStatus, ObjectVersionInfo)>> {
    let pos = items.iter().position(|item| item.object.grn.uid == prepared.grn.uid);
    let current = pos.map(|p| items[p].state());

    let applied = match write::decide(ctx, req, prepared, current.as_ref())? {
        WritePlan::Unchanged(info) => return Ok(Mutation::Discard((WriteStatus::Unchanged, info))),
        WritePlan::Apply(applied) => applied,
    };
    ctx.check_cancelled()?;

    let object = RawObject {
        grn: prepared.grn.clone(),
        version: applied.version.clone(),
        created_at: applied.created_at,
        created_by: applied.created_by.clone(),
        updated_at: prepared.now,
        updated_by: ctx.user.clone(),
        folder: applied.folder.clone(),
        size: prepared.size(),
        etag: prepared.etag.as_str().to_string(),
        comment: req.comment.clone(),
        body: Some(prepared.body.clone()),
        origin: req.origin.clone(),
    };
    let mut summary = prepared.summary.clone();
    summary.nested.clear();

    match pos {
        Some(p) if !applied.clear_history => {
            let item = &mut items[p];
            item.history.push(object.clone());
            item.object = object;
            item.summary = summary;
            item.references = prepared.references.clone();
        }
        _ => {
            if let Some(p) = pos {
                items.remove(p);
            }
            items.push(RawObjectWithHistory {
                history: vec![object.clone()],
                object,
                summary,
                references: prepared.references.clone(),
            });
        }
    }

    let info = write::stored_info(ctx, req, prepared, &applied);
    Ok(Mutation::Save((applied.status(), info)))
}

impl std::fmt::Debug for FileObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileObjectStore").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::COLLECTIONS_DIR;
    use crate::resolver::CatalogResolver;

    fn store(dir: &Path) -> FileObjectStore {
        FileObjectStore::open(
            dir,
            Arc::new(KindRegistry::with_builtins().unwrap()),
            Arc::new(CatalogResolver::new()),
        )
        .unwrap()
    }

    #[test]
    fn one_file_per_kind_and_tenant() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store
            .write(
                &StoreContext::new(4, "admin"),
                &WriteObjectRequest::new(Grn::new(4, "folder", "f1"), r#"{"title":"Ops"}"#),
            )
            .unwrap();

        assert!(dir.path().join(COLLECTIONS_DIR).join("folder-4.json").exists());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StoreContext::new(1, "admin");
        let grn = Grn::new(1, "folder", "f1");
        store(dir.path())
            .write(&ctx, &WriteObjectRequest::new(grn.clone(), r#"{"title":"Ops"}"#))
            .unwrap();

        let rsp = store(dir.path())
            .read(&ctx, &ReadObjectRequest::new(grn).with_body().with_summary())
            .unwrap();
        assert_eq!(rsp.summary.unwrap().name, "Ops");
        assert!(rsp.object.unwrap().body.is_some());
    }

    #[test]
    fn stored_summary_drops_nested() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let ctx = StoreContext::new(1, "admin");
        let grn = Grn::new(1, "dummy", "d");
        store.write(&ctx, &WriteObjectRequest::new(grn.clone(), "{}")).unwrap();

        let rsp = store.read(&ctx, &ReadObjectRequest::new(grn).with_summary()).unwrap();
        assert!(rsp.summary.unwrap().nested.is_empty());
    }
}
