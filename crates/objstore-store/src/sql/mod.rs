//! SQLite storage engine.
//!
//! Four tables: `object` holds the current version of every object,
//! `object_history` one immutable row per stored version, and
//! `object_labels` / `object_ref` the labels and resolved references of the
//! current version only. Every call runs in its own transaction on a shared,
//! mutex-guarded connection. Writes use `BEGIN IMMEDIATE` so the write lock
//! is held from the moment the current row is read, and the final `UPDATE`
//! is additionally guarded by the etag that was read.

mod schema;
mod search;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use objstore_kinds::{KindInfo, KindRegistry, ObjectErrorInfo, ObjectReference, ObjectSummary};
use objstore_types::{route_from_key, Grn};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::context::StoreContext;
use crate::error::{StoreError, StoreResult};
use crate::model::{
    BatchReadRequest, BatchReadResponse, DanglingReference, DeleteObjectRequest,
    DeleteObjectResponse, ObjectHistoryRequest, ObjectHistoryResponse, ObjectOriginInfo,
    ObjectSearchRequest, ObjectSearchResponse, ObjectVersionInfo, RawObject, ReadObjectRequest,
    ReadObjectResponse, WriteObjectRequest, WriteObjectResponse, WriteStatus,
};
use crate::resolver::{ReferenceResolver, ResolvedReference, StoredReference};
use crate::traits::ObjectStore;
use crate::validate;
use crate::version;
use crate::write::{self, AppliedWrite, CurrentState, PreparedWrite, WritePlan};

pub use schema::SCHEMA_VERSION;

/// Default `busy_timeout` for file databases.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default cap on search page size.
pub const DEFAULT_MAX_SEARCH_LIMIT: usize = 1_000;

/// Object store backed by a single SQLite database.
pub struct SqliteObjectStore {
    conn: Mutex<Connection>,
    kinds: Arc<KindRegistry>,
    resolver: Arc<dyn ReferenceResolver>,
    max_search_limit: usize,
}

impl SqliteObjectStore {
    /// Open (creating if needed) a database file.
    pub fn open(
        path: impl AsRef<Path>,
        busy_timeout_ms: u64,
        kinds: Arc<KindRegistry>,
        resolver: Arc<dyn ReferenceResolver>,
    ) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        schema::configure(&conn, busy_timeout_ms, true)?;
        schema::migrate(&mut conn)?;
        info!(path = %path.display(), "opened sqlite object store");
        Ok(Self::from_connection(conn, kinds, resolver))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(kinds: Arc<KindRegistry>, resolver: Arc<dyn ReferenceResolver>) -> StoreResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        schema::configure(&conn, DEFAULT_BUSY_TIMEOUT_MS, false)?;
        schema::migrate(&mut conn)?;
        Ok(Self::from_connection(conn, kinds, resolver))
    }

    fn from_connection(conn: Connection, kinds: Arc<KindRegistry>, resolver: Arc<dyn ReferenceResolver>) -> Self {
        Self {
            conn: Mutex::new(conn),
            kinds,
            resolver,
            max_search_limit: DEFAULT_MAX_SEARCH_LIMIT,
        }
    }

    pub fn with_max_search_limit(mut self, limit: usize) -> Self {
        self.max_search_limit = limit.max(1);
        self
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn read_current(&self, conn: &Connection, grn: &Grn, req: &ReadObjectRequest) -> StoreResult<ReadObjectResponse> {
        let oid = grn.to_oid();
        let sql = format!(
            "SELECT {} FROM object o LEFT JOIN object_history h ON h.oid = o.oid AND h.version = o.version WHERE o.oid = ?1",
            object_columns(req.with_body)
        );
        let row = conn
            .query_row(&sql, params![oid], |row| ObjectRow::from_row(row, req.with_body))
            .optional()?;
        let Some(row) = row else {
            return Ok(ReadObjectResponse::not_found());
        };

        let summary = if req.with_summary {
            let refs = load_references(conn, &[oid.as_str()])?.remove(&oid).unwrap_or_default();
            Some(row.summary(refs)?)
        } else {
            None
        };
        Ok(ReadObjectResponse {
            object: Some(row.into_object()?),
            summary,
        })
    }

    fn read_version(
        &self,
        conn: &Connection,
        grn: &Grn,
        version: &str,
        req: &ReadObjectRequest,
    ) -> StoreResult<ReadObjectResponse> {
        let oid = grn.to_oid();
        let found = conn
            .query_row(
                "SELECT h.version, h.message, h.size, h.etag, h.updated_at, h.updated_by, h.body,
                        COALESCE(o.created_at, h.updated_at), COALESCE(o.created_by, h.updated_by),
                        COALESCE(o.folder, '')
                 FROM object_history h LEFT JOIN object o ON o.oid = h.oid
                 WHERE h.oid = ?1 AND h.version = ?2",
                params![oid, version],
                |row| {
                    Ok((
                        RawObject {
                            grn: grn.clone(),
                            version: row.get(0)?,
                            comment: row.get(1)?,
                            size: row.get(2)?,
                            etag: row.get(3)?,
                            updated_at: row.get(4)?,
                            updated_by: row.get(5)?,
                            created_at: row.get(7)?,
                            created_by: row.get(8)?,
                            folder: row.get(9)?,
                            body: None,
                            origin: None,
                        },
                        row.get::<_, Vec<u8>>(6)?,
                    ))
                },
            )
            .optional()?;
        let Some((mut object, body)) = found else {
            return Ok(ReadObjectResponse::not_found());
        };

        // History rows carry no summary of their own.
        let summary = if req.with_summary {
            Some(self.kinds.summarize(&grn.kind, &grn.uid, &body)?.0)
        } else {
            None
        };
        if req.with_body {
            object.body = Some(body);
        }
        Ok(ReadObjectResponse {
            object: Some(object),
            summary,
        })
    }
}

impl ObjectStore for SqliteObjectStore {
    fn read(&self, ctx: &StoreContext, req: &ReadObjectRequest) -> StoreResult<ReadObjectResponse> {
        let grn = validate::scope_grn(ctx, &req.grn)?;
        ctx.check_cancelled()?;
        debug!(oid = %grn.to_oid(), version = ?req.version, "read");

        let conn = self.lock()?;
        match req.version.as_deref().filter(|v| !v.is_empty()) {
            Some(version) => self.read_version(&conn, &grn, version, req),
            None => self.read_current(&conn, &grn, req),
        }
    }

    fn batch_read(&self, ctx: &StoreContext, req: &BatchReadRequest) -> StoreResult<BatchReadResponse> {
        let (grns, flags) = validate::batch(ctx, req)?;
        ctx.check_cancelled()?;
        if grns.is_empty() {
            return Ok(BatchReadResponse::default());
        }
        debug!(count = grns.len(), "batch read");

        let oids: Vec<String> = grns.iter().map(Grn::to_oid).collect();
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM object o LEFT JOIN object_history h ON h.oid = o.oid AND h.version = o.version WHERE {}",
            object_columns(flags.with_body),
            or_clause("o.oid", oids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(oids.iter()), |row| ObjectRow::from_row(row, flags.with_body))?;
        let mut found: HashMap<String, ObjectRow> = HashMap::with_capacity(oids.len());
        for row in rows {
            let row = row?;
            found.insert(row.oid.clone(), row);
        }

        let refs = if flags.with_summary && !found.is_empty() {
            let keys: Vec<&str> = found.keys().map(String::as_str).collect();
            load_references(&conn, &keys)?
        } else {
            HashMap::new()
        };

        let mut results = Vec::with_capacity(oids.len());
        for oid in &oids {
            // A batch may name the same object twice; each gets its own copy.
            let Some(row) = found.get(oid).cloned() else {
                results.push(ReadObjectResponse::not_found());
                continue;
            };
            let summary = if flags.with_summary {
                Some(row.summary(refs.get(oid).cloned().unwrap_or_default())?)
            } else {
                None
            };
            results.push(ReadObjectResponse {
                object: Some(row.into_object()?),
                summary,
            });
        }
        Ok(BatchReadResponse { results })
    }

    fn write(&self, ctx: &StoreContext, req: &WriteObjectRequest) -> StoreResult<WriteObjectResponse> {
        let prepared = write::prepare(ctx, req, &self.kinds, self.resolver.as_ref())?;
        ctx.check_cancelled()?;
        debug!(oid = %prepared.oid, kind = %prepared.grn.kind, etag = %prepared.etag.short(), "write");

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = load_state(&tx, &prepared.oid)?;

        let applied = match write::decide(ctx, req, &prepared, current.as_ref())? {
            WritePlan::Unchanged(info) => {
                debug!(oid = %prepared.oid, version = %info.version, "unchanged");
                return write::respond(&prepared, WriteStatus::Unchanged, info);
            }
            WritePlan::Apply(applied) => applied,
        };

        if applied.clear_history {
            purge(&tx, &prepared.oid)?;
        } else if applied.is_update {
            tx.execute("DELETE FROM object_labels WHERE oid = ?1", params![prepared.oid])?;
            tx.execute("DELETE FROM object_ref WHERE oid = ?1", params![prepared.oid])?;
        }

        tx.execute(
            "INSERT INTO object_history (oid, version, message, size, body, etag, updated_at, updated_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                prepared.oid,
                applied.version,
                req.comment,
                prepared.size(),
                prepared.body,
                prepared.etag.as_str(),
                prepared.now,
                ctx.user,
            ],
        )?;
        insert_labels(&tx, &prepared)?;
        insert_references(&tx, &prepared)?;
        ctx.check_cancelled()?;

        if applied.is_update {
            let expected = current.as_ref().map(|c| c.etag.as_str()).unwrap_or_default();
            let changed = update_object(&tx, ctx, req, &prepared, &applied, expected)?;
            if changed == 0 {
                return Err(StoreError::OptimisticLock {
                    oid: prepared.oid.clone(),
                    expected: current.map(|c| c.version).unwrap_or_default(),
                    actual: "concurrently modified".into(),
                });
            }
        } else {
            insert_object(&tx, ctx, req, &prepared, &applied)?;
        }
        tx.commit()?;

        let status = applied.status();
        info!(oid = %prepared.oid, version = %applied.version, ?status, "stored object");
        let info = write::stored_info(ctx, req, &prepared, &applied);
        write::respond(&prepared, status, info)
    }

    fn delete(&self, ctx: &StoreContext, req: &DeleteObjectRequest) -> StoreResult<DeleteObjectResponse> {
        let grn = validate::scope_grn(ctx, &req.grn)?;
        ctx.check_cancelled()?;
        let oid = grn.to_oid();

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(current) = load_state(&tx, &oid)? else {
            return Ok(DeleteObjectResponse { ok: false });
        };
        if !version::matches_previous(req.previous_version.as_deref(), &current.version) {
            return Err(StoreError::OptimisticLock {
                oid,
                expected: req.previous_version.clone().unwrap_or_default(),
                actual: current.version,
            });
        }

        let removed = tx.execute("DELETE FROM object WHERE oid = ?1", params![oid])?;
        if removed > 0 {
            purge(&tx, &oid)?;
        }
        ctx.check_cancelled()?;
        tx.commit()?;

        info!(%oid, version = %current.version, "deleted object");
        Ok(DeleteObjectResponse { ok: removed > 0 })
    }

    fn history(&self, ctx: &StoreContext, req: &ObjectHistoryRequest) -> StoreResult<ObjectHistoryResponse> {
        let (grn, limit) = validate::history(ctx, req)?;
        ctx.check_cancelled()?;
        let oid = grn.to_oid();
        debug!(%oid, limit, "history");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT version, updated_at, updated_by, size, etag, message FROM object_history
             WHERE oid = ?1
             ORDER BY CAST(version AS INTEGER) DESC, updated_at DESC
             LIMIT ?2",
        )?;
        let versions = stmt
            .query_map(params![oid, limit as i64], |row| {
                Ok(ObjectVersionInfo {
                    version: row.get(0)?,
                    updated_at: row.get(1)?,
                    updated_by: row.get(2)?,
                    size: row.get(3)?,
                    etag: row.get(4)?,
                    comment: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

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

        let conn = self.lock()?;
        search::run(&conn, ctx.tenant_id, req, &plan)
    }

    fn dangling_references(&self, ctx: &StoreContext) -> StoreResult<Vec<DanglingReference>> {
        ctx.check_cancelled()?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT r.oid, r.kind, r.type, r.uid, r.resolved_to, r.resolved_warning, r.resolved_time
             FROM object_ref r JOIN object o ON o.oid = r.oid
             WHERE o.tenant_id = ?1 AND r.resolved_ok = 0
             ORDER BY r.oid",
        )?;
        let rows = stmt
            .query_map(params![ctx.tenant_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    StoredReference {
                        reference: ObjectReference::new(
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ),
                        resolved: ResolvedReference {
                            ok: false,
                            key: row.get(4)?,
                            warning: row.get(5)?,
                            timestamp: row.get(6)?,
                        },
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut dangling = rows
            .into_iter()
            .map(|(oid, reference)| Ok(DanglingReference { source: parse_oid(&oid)?, reference }))
            .collect::<StoreResult<Vec<_>>>()?;
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

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

fn object_columns(with_body: bool) -> String {
    let mut columns = String::from(
        "o.oid, o.version, o.created_at, o.created_by, o.updated_at, o.updated_by, o.folder, o.size, \
         o.etag, COALESCE(h.message, ''), o.origin, o.origin_key, o.origin_ts, \
         o.name, o.description, o.slug, o.labels, o.fields, o.errors",
    );
    if with_body {
        columns.push_str(", o.body");
    }
    columns
}

/// `col = ?1 OR col = ?2 ...`
fn or_clause(column: &str, n: usize) -> String {
    (1..=n)
        .map(|i| format!("{column} = ?{i}"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// A current-state row as selected by [`object_columns`].
#[derive(Clone, Debug)]
struct ObjectRow {
    oid: String,
    version: String,
    created_at: i64,
    created_by: String,
    updated_at: i64,
    updated_by: String,
    folder: String,
    size: i64,
    etag: String,
    comment: String,
    origin: Option<ObjectOriginInfo>,
    name: String,
    description: String,
    slug: String,
    labels: String,
    fields: String,
    errors: Option<String>,
    body: Option<Vec<u8>>,
}

impl ObjectRow {
    fn from_row(row: &Row<'_>, with_body: bool) -> rusqlite::Result<Self> {
        let origin = match row.get::<_, Option<String>>(10)? {
            Some(source) => Some(ObjectOriginInfo {
                source,
                key: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
                time: row.get::<_, Option<i64>>(12)?.unwrap_or_default(),
            }),
            None => None,
        };
        Ok(Self {
            oid: row.get(0)?,
            version: row.get(1)?,
            created_at: row.get(2)?,
            created_by: row.get(3)?,
            updated_at: row.get(4)?,
            updated_by: row.get(5)?,
            folder: row.get(6)?,
            size: row.get(7)?,
            etag: row.get(8)?,
            comment: row.get(9)?,
            origin,
            name: row.get(13)?,
            description: row.get(14)?,
            slug: row.get(15)?,
            labels: row.get(16)?,
            fields: row.get(17)?,
            errors: row.get(18)?,
            body: if with_body { Some(row.get(19)?) } else { None },
        })
    }

    /// Rebuild the stored summary. Nested summaries are not persisted.
    fn summary(&self, references: Vec<ObjectReference>) -> StoreResult<ObjectSummary> {
        let grn = parse_oid(&self.oid)?;
        let corrupt = |e: serde_json::Error| StoreError::Corrupt {
            oid: self.oid.clone(),
            reason: e.to_string(),
        };
        Ok(ObjectSummary {
            uid: grn.uid,
            kind: grn.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            slug: self.slug.clone(),
            labels: serde_json::from_str(&self.labels).map_err(corrupt)?,
            fields: serde_json::from_str(&self.fields).map_err(corrupt)?,
            error: decode_error(&self.oid, self.errors.as_deref())?,
            nested: Vec::new(),
            references,
        })
    }

    fn into_object(self) -> StoreResult<RawObject> {
        Ok(RawObject {
            grn: parse_oid(&self.oid)?,
            version: self.version,
            created_at: self.created_at,
            created_by: self.created_by,
            updated_at: self.updated_at,
            updated_by: self.updated_by,
            folder: self.folder,
            size: self.size,
            etag: self.etag,
            comment: self.comment,
            body: self.body,
            origin: self.origin,
        })
    }
}

pub(crate) fn parse_oid(oid: &str) -> StoreResult<Grn> {
    route_from_key(oid).map_err(|e| StoreError::Corrupt {
        oid: oid.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn decode_error(oid: &str, errors: Option<&str>) -> StoreResult<Option<ObjectErrorInfo>> {
    errors
        .filter(|s| !s.is_empty())
        .map(|s| {
            serde_json::from_str(s).map_err(|e| StoreError::Corrupt {
                oid: oid.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Stored references grouped by oid, each list sorted by composite key.
fn load_references(conn: &Connection, oids: &[&str]) -> StoreResult<HashMap<String, Vec<ObjectReference>>> {
    let sql = format!(
        "SELECT oid, kind, type, uid FROM object_ref WHERE {}",
        or_clause("oid", oids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(oids.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            ObjectReference::new(
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ),
        ))
    })?;

    let mut grouped: HashMap<String, Vec<ObjectReference>> = HashMap::new();
    for row in rows {
        let (oid, reference) = row?;
        grouped.entry(oid).or_default().push(reference);
    }
    for refs in grouped.values_mut() {
        refs.sort_by_key(ObjectReference::composite_key);
    }
    Ok(grouped)
}

fn load_state(tx: &Transaction<'_>, oid: &str) -> StoreResult<Option<CurrentState>> {
    let state = tx
        .query_row(
            "SELECT o.version, o.etag, o.size, o.folder, o.created_at, o.created_by, o.updated_at, o.updated_by,
                    COALESCE(h.message, '')
             FROM object o LEFT JOIN object_history h ON h.oid = o.oid AND h.version = o.version
             WHERE o.oid = ?1",
            params![oid],
            |row| {
                Ok(CurrentState {
                    version: row.get(0)?,
                    etag: row.get(1)?,
                    size: row.get(2)?,
                    folder: row.get(3)?,
                    created_at: row.get(4)?,
                    created_by: row.get(5)?,
                    updated_at: row.get(6)?,
                    updated_by: row.get(7)?,
                    comment: row.get(8)?,
                })
            },
        )
        .optional()?;
    Ok(state)
}

/// Delete the object's current row and every dependent row.
fn purge(tx: &Transaction<'_>, oid: &str) -> StoreResult<()> {
    for sql in [
        "DELETE FROM object WHERE oid = ?1",
        "DELETE FROM object_history WHERE oid = ?1",
        "DELETE FROM object_labels WHERE oid = ?1",
        "DELETE FROM object_ref WHERE oid = ?1",
    ] {
        tx.execute(sql, params![oid])?;
    }
    Ok(())
}

fn insert_labels(tx: &Transaction<'_>, prepared: &PreparedWrite) -> StoreResult<()> {
    let mut stmt = tx.prepare("INSERT INTO object_labels (oid, label, value) VALUES (?1, ?2, ?3)")?;
    for (label, value) in &prepared.summary.labels {
        stmt.execute(params![prepared.oid, label, value])?;
    }
    Ok(())
}

fn insert_references(tx: &Transaction<'_>, prepared: &PreparedWrite) -> StoreResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO object_ref (oid, kind, type, uid, resolved_ok, resolved_to, resolved_warning, resolved_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for stored in &prepared.references {
        stmt.execute(params![
            prepared.oid,
            stored.reference.kind,
            stored.reference.ref_type,
            stored.reference.uid,
            stored.resolved.ok,
            stored.resolved.key,
            stored.resolved.warning,
            stored.resolved.timestamp,
        ])?;
    }
    Ok(())
}

/// Summary columns shared by insert and update.
struct SummaryColumns {
    labels: String,
    fields: String,
    errors: Option<String>,
}

impl SummaryColumns {
    fn of(summary: &ObjectSummary) -> StoreResult<Self> {
        Ok(Self {
            labels: serde_json::to_string(&summary.labels)?,
            fields: serde_json::to_string(&summary.fields)?,
            errors: summary.error.as_ref().map(serde_json::to_string).transpose()?,
        })
    }
}

fn insert_object(
    tx: &Transaction<'_>,
    ctx: &StoreContext,
    req: &WriteObjectRequest,
    prepared: &PreparedWrite,
    applied: &AppliedWrite,
) -> StoreResult<()> {
    let columns = SummaryColumns::of(&prepared.summary)?;
    let origin = req.origin.as_ref();
    tx.execute(
        "INSERT INTO object (oid, tenant_id, kind, uid, folder, slug, size, etag, version, body,
                             name, description, labels, fields, errors,
                             created_at, created_by, updated_at, updated_by,
                             origin, origin_key, origin_ts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        params![
            prepared.oid,
            prepared.grn.tenant_id,
            prepared.grn.kind,
            prepared.grn.uid,
            applied.folder,
            prepared.summary.slug,
            prepared.size(),
            prepared.etag.as_str(),
            applied.version,
            prepared.body,
            prepared.summary.name,
            prepared.summary.description,
            columns.labels,
            columns.fields,
            columns.errors,
            applied.created_at,
            applied.created_by,
            prepared.now,
            ctx.user,
            origin.map(|o| o.source.as_str()),
            origin.map(|o| o.key.as_str()),
            origin.map(|o| o.time),
        ],
    )?;
    Ok(())
}

/// Compare-and-swap update of the current row; returns the affected row count.
fn update_object(
    tx: &Transaction<'_>,
    ctx: &StoreContext,
    req: &WriteObjectRequest,
    prepared: &PreparedWrite,
    applied: &AppliedWrite,
    expected_etag: &str,
) -> StoreResult<usize> {
    let columns = SummaryColumns::of(&prepared.summary)?;
    let origin = req.origin.as_ref();
    let changed = tx.execute(
        "UPDATE object SET folder = ?1, slug = ?2, size = ?3, etag = ?4, version = ?5, body = ?6,
                           name = ?7, description = ?8, labels = ?9, fields = ?10, errors = ?11,
                           updated_at = ?12, updated_by = ?13,
                           origin = ?14, origin_key = ?15, origin_ts = ?16
         WHERE oid = ?17 AND etag = ?18",
        params![
            applied.folder,
            prepared.summary.slug,
            prepared.size(),
            prepared.etag.as_str(),
            applied.version,
            prepared.body,
            prepared.summary.name,
            prepared.summary.description,
            columns.labels,
            columns.fields,
            columns.errors,
            prepared.now,
            ctx.user,
            origin.map(|o| o.source.as_str()),
            origin.map(|o| o.key.as_str()),
            origin.map(|o| o.time),
            prepared.oid,
            expected_etag,
        ],
    )?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::CatalogResolver;

    fn store() -> SqliteObjectStore {
        SqliteObjectStore::open_in_memory(
            Arc::new(KindRegistry::with_builtins().unwrap()),
            Arc::new(CatalogResolver::new().with_plugin("timeseries")),
        )
        .unwrap()
    }

    fn count(store: &SqliteObjectStore, table: &str) -> i64 {
        let conn = store.lock().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn or_clause_numbers_parameters() {
        assert_eq!(or_clause("oid", 3), "oid = ?1 OR oid = ?2 OR oid = ?3");
    }

    #[test]
    fn write_populates_side_tables() {
        let store = store();
        let ctx = StoreContext::new(1, "admin");
        store
            .write(&ctx, &WriteObjectRequest::new(Grn::new(1, "dummy", "d1"), "{}"))
            .unwrap();

        assert_eq!(count(&store, "object"), 1);
        assert_eq!(count(&store, "object_history"), 1);
        assert_eq!(count(&store, "object_labels"), 3);
        assert_eq!(count(&store, "object_ref"), 2);
    }

    #[test]
    fn update_replaces_labels_and_references() {
        let store = store();
        let ctx = StoreContext::new(1, "admin");
        let grn = Grn::new(1, "dashboard", "abc");
        store
            .write(&ctx, &WriteObjectRequest::new(grn.clone(), r#"{"title":"A","tags":["x","y"]}"#))
            .unwrap();
        store
            .write(&ctx, &WriteObjectRequest::new(grn, r#"{"title":"B","tags":["z"]}"#))
            .unwrap();

        assert_eq!(count(&store, "object_labels"), 1);
        assert_eq!(count(&store, "object_history"), 2);
    }

    #[test]
    fn delete_leaves_no_orphans() {
        let store = store();
        let ctx = StoreContext::new(1, "admin");
        let grn = Grn::new(1, "dummy", "d1");
        store.write(&ctx, &WriteObjectRequest::new(grn.clone(), "{}")).unwrap();
        assert!(store.delete(&ctx, &DeleteObjectRequest::new(grn)).unwrap().ok);

        for table in ["object", "object_history", "object_labels", "object_ref"] {
            assert_eq!(count(&store, table), 0, "{table}");
        }
    }

    #[test]
    fn file_database_reopens_with_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("objects.db");
        let kinds = Arc::new(KindRegistry::with_builtins().unwrap());
        let resolver: Arc<dyn ReferenceResolver> = Arc::new(CatalogResolver::new());
        let ctx = StoreContext::new(1, "admin");
        let grn = Grn::new(1, "folder", "f1");
        {
            let store = SqliteObjectStore::open(&path, 1000, Arc::clone(&kinds), Arc::clone(&resolver)).unwrap();
            store
                .write(&ctx, &WriteObjectRequest::new(grn.clone(), r#"{"title":"Team"}"#))
                .unwrap();
        }
        let store = SqliteObjectStore::open(&path, 1000, kinds, resolver).unwrap();
        let rsp = store.read(&ctx, &ReadObjectRequest::new(grn)).unwrap();
        assert_eq!(rsp.object.unwrap().version, "1");
    }
}
