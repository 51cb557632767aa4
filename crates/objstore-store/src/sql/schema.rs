//! Table layout and connection setup.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Revision stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS object (
    oid          TEXT PRIMARY KEY NOT NULL,
    tenant_id    INTEGER NOT NULL,
    kind         TEXT NOT NULL,
    uid          TEXT NOT NULL,
    folder       TEXT NOT NULL DEFAULT '',
    slug         TEXT NOT NULL DEFAULT '',
    size         INTEGER NOT NULL,
    etag         TEXT NOT NULL,
    version      TEXT NOT NULL,
    body         BLOB NOT NULL,
    name         TEXT NOT NULL DEFAULT '',
    description  TEXT NOT NULL DEFAULT '',
    labels       TEXT NOT NULL DEFAULT '{}',
    fields       TEXT NOT NULL DEFAULT '{}',
    errors       TEXT,
    created_at   INTEGER NOT NULL,
    created_by   TEXT NOT NULL,
    updated_at   INTEGER NOT NULL,
    updated_by   TEXT NOT NULL,
    origin       TEXT,
    origin_key   TEXT,
    origin_ts    INTEGER
);
CREATE INDEX IF NOT EXISTS object_tenant_kind ON object (tenant_id, kind);
CREATE INDEX IF NOT EXISTS object_tenant_folder ON object (tenant_id, folder);

CREATE TABLE IF NOT EXISTS object_history (
    oid         TEXT NOT NULL,
    version     TEXT NOT NULL,
    message     TEXT NOT NULL DEFAULT '',
    size        INTEGER NOT NULL,
    body        BLOB NOT NULL,
    etag        TEXT NOT NULL,
    updated_at  INTEGER NOT NULL,
    updated_by  TEXT NOT NULL,
    PRIMARY KEY (oid, version)
);

CREATE TABLE IF NOT EXISTS object_labels (
    oid    TEXT NOT NULL,
    label  TEXT NOT NULL,
    value  TEXT NOT NULL,
    PRIMARY KEY (oid, label)
);

CREATE TABLE IF NOT EXISTS object_ref (
    oid               TEXT NOT NULL,
    kind              TEXT NOT NULL,
    type              TEXT NOT NULL,
    uid               TEXT NOT NULL,
    resolved_ok       INTEGER NOT NULL,
    resolved_to       TEXT NOT NULL DEFAULT '',
    resolved_warning  TEXT NOT NULL DEFAULT '',
    resolved_time     INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS object_ref_oid ON object_ref (oid);
CREATE INDEX IF NOT EXISTS object_ref_target ON object_ref (kind, type, uid);
";

/// Apply connection pragmas. WAL is only meaningful for file databases.
pub(crate) fn configure(conn: &Connection, busy_timeout_ms: u64, file_backed: bool) -> StoreResult<()> {
    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    if file_backed {
        // journal_mode returns a row, so it cannot go through execute().
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    }
    Ok(())
}

/// Create or upgrade the schema.
pub(crate) fn migrate(conn: &mut Connection) -> StoreResult<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current > SCHEMA_VERSION {
        return Err(StoreError::Config(format!(
            "database schema revision {current} is newer than supported revision {SCHEMA_VERSION}"
        )));
    }
    if current == SCHEMA_VERSION {
        debug!(revision = current, "schema up to date");
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_V1)?;
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    tx.commit()?;
    info!(from = current, to = SCHEMA_VERSION, "migrated object store schema");
    Ok(())
}
