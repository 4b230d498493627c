//! Database schema migrations for the record store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{info, warn};

/// Schema version the migrations below bring a database to.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: generic record table.
///
/// One row per entity record, keyed by `(kind, id)`, with the owning profile
/// pulled out for equality filtering. The rowid keeps insertion order.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
            kind        TEXT NOT NULL,
            id          TEXT NOT NULL,
            profile_id  TEXT NOT NULL,
            body        TEXT NOT NULL,
            PRIMARY KEY (kind, id)
        );
        CREATE INDEX IF NOT EXISTS idx_records_kind_profile ON records(kind, profile_id);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()?;
    info!("applied store migration v1");
    Ok(())
}

/// Migration v2: write timestamps and the application key/value table.
///
/// Adds:
/// - records.updated_at: RFC 3339 timestamp of the last write
/// - kv: small application state such as the active profile
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let has_updated_at: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('records') WHERE name = 'updated_at'",
            [],
            |row| row.get::<_, i32>(0),
        )
        .unwrap_or(0)
        > 0;

    if !has_updated_at {
        tx.execute_batch("ALTER TABLE records ADD COLUMN updated_at TEXT NOT NULL DEFAULT '';")?;
    }

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    info!("applied store migration v2");
    Ok(())
}

/// Migration v3: per-profile activation leases shared by every connection.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS leases (
            profile_id   TEXT PRIMARY KEY,
            holder       TEXT NOT NULL,
            acquired_at  TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 3)?;
    tx.commit()?;
    info!("applied store migration v3");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        conn.execute(
            "INSERT INTO records (kind, id, profile_id, body) VALUES ('task', 't1', 'p1', '{}')",
            [],
        )
        .unwrap();
        let updated_at: String = conn
            .query_row("SELECT updated_at FROM records WHERE id = 't1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(updated_at, "");

        conn.execute("INSERT INTO kv (key, value) VALUES ('a', 'b')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO leases (profile_id, holder, acquired_at) VALUES ('p1', 'h', '')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn test_incremental_migration_keeps_rows() {
        let conn = Connection::open_in_memory().unwrap();

        // A v1 database written before the kv table existed.
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
             INSERT INTO schema_version (version) VALUES (1);
             CREATE TABLE records (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (kind, id)
             );
             INSERT INTO records (kind, id, profile_id, body)
             VALUES ('subject', 's1', 'p1', '{\"id\":\"s1\"}');",
        )
        .unwrap();

        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        conn.prepare("SELECT key, value FROM kv").unwrap();
    }
}
