//! SQLite-backed record store.
//!
//! Provides persistent storage for:
//! - Entity records of every [`EntityKind`], as JSON bodies
//! - Key-value store for application state (e.g. the active profile)
//! - Activation leases, so two processes never run the load-time passes on
//!   one profile at once

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;

use super::{data_dir, merge_patch, migrations, prepare_record, EntityKind, Store};
use crate::error::{CoreError, StorageError};

/// A lease older than this is treated as abandoned by a crashed process.
const LEASE_STALE_AFTER_SECS: i64 = 600;

/// How long a connection waits on another connection's write lock.
const BUSY_TIMEOUT_MS: u64 = 5_000;

fn lease_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// SQLite database holding all entity records.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/studytrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("studytrack.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn decode(kind: EntityKind, body: &str) -> Result<Value, StorageError> {
        serde_json::from_str(body).map_err(|e| StorageError::Malformed {
            kind,
            message: e.to_string(),
        })
    }

    fn query_bodies(
        &self,
        kind: EntityKind,
        profile_id: Option<&str>,
    ) -> Result<Vec<Value>, StorageError> {
        let bodies: Vec<String> = match profile_id {
            Some(pid) => {
                let mut stmt = self.conn.prepare(
                    "SELECT body FROM records WHERE kind = ?1 AND profile_id = ?2 ORDER BY rowid",
                )?;
                let rows = stmt.query_map(params![kind.as_str(), pid], |row| row.get(0))?;
                rows.collect::<Result<_, _>>()?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT body FROM records WHERE kind = ?1 ORDER BY rowid")?;
                let rows = stmt.query_map(params![kind.as_str()], |row| row.get(0))?;
                rows.collect::<Result<_, _>>()?
            }
        };
        bodies.iter().map(|b| Self::decode(kind, b)).collect()
    }

    fn write_body(
        &self,
        kind: EntityKind,
        id: &str,
        profile_id: &str,
        body: &Value,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO records (kind, id, profile_id, body, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(kind, id) DO UPDATE SET
                profile_id = excluded.profile_id,
                body = excluded.body,
                updated_at = excluded.updated_at",
            params![
                kind.as_str(),
                id,
                profile_id,
                body.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn list_by_profile(
        &self,
        kind: EntityKind,
        profile_id: &str,
    ) -> Result<Vec<Value>, StorageError> {
        self.query_bodies(kind, Some(profile_id))
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<Value>, StorageError> {
        self.query_bodies(kind, None)
    }

    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, StorageError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| Self::decode(kind, &b)).transpose()
    }

    fn upsert(&self, kind: EntityKind, record: Value) -> Result<Value, StorageError> {
        let (id, profile_id, body) = prepare_record(kind, record)?;
        self.write_body(kind, &id, &profile_id, &body)?;
        Ok(body)
    }

    fn update(&self, kind: EntityKind, id: &str, patch: &Value) -> Result<(), StorageError> {
        let mut body = self.get(kind, id)?.ok_or_else(|| StorageError::NotFound {
            kind,
            id: id.to_string(),
        })?;
        merge_patch(&mut body, patch);
        let (id, profile_id, body) = prepare_record(kind, body)?;
        self.write_body(kind, &id, &profile_id, &body)
    }

    fn delete(&self, kind: EntityKind, id: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM records WHERE kind = ?1 AND id = ?2",
            params![kind.as_str(), id],
        )?;
        Ok(())
    }

    fn acquire_lease(&self, profile_id: &str, holder: &str) -> Result<bool, StorageError> {
        let now = Utc::now();
        let stale_before = now - Duration::seconds(LEASE_STALE_AFTER_SECS);
        let taken = self.conn.execute(
            "INSERT INTO leases (profile_id, holder, acquired_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(profile_id) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at
             WHERE leases.acquired_at < ?4",
            params![
                profile_id,
                holder,
                lease_timestamp(now),
                lease_timestamp(stale_before),
            ],
        )?;
        Ok(taken == 1)
    }

    fn release_lease(&self, profile_id: &str, holder: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM leases WHERE profile_id = ?1 AND holder = ?2",
            params![profile_id, holder],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_and_list_by_profile() {
        let db = SqliteStore::open_memory().unwrap();
        db.upsert(EntityKind::Subject, json!({ "id": "s2", "profileId": "p1", "name": "B" }))
            .unwrap();
        db.upsert(EntityKind::Subject, json!({ "id": "s1", "profileId": "p1", "name": "A" }))
            .unwrap();
        db.upsert(EntityKind::Subject, json!({ "id": "s3", "profileId": "p2", "name": "C" }))
            .unwrap();
        db.upsert(EntityKind::Subject, json!({ "id": "s2", "profileId": "p1", "name": "B2" }))
            .unwrap();

        let rows = db.list_by_profile(EntityKind::Subject, "p1").unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["B2", "A"]);
        assert_eq!(db.list(EntityKind::Subject).unwrap().len(), 3);
    }

    #[test]
    fn update_and_delete() {
        let db = SqliteStore::open_memory().unwrap();
        let stored = db
            .upsert(EntityKind::Task, json!({ "profileId": "p1", "activity": "Read" }))
            .unwrap();
        let id = stored["id"].as_str().unwrap().to_string();

        db.update(EntityKind::Task, &id, &json!({ "completed": true }))
            .unwrap();
        let rec = db.get(EntityKind::Task, &id).unwrap().unwrap();
        assert_eq!(rec["completed"], true);
        assert_eq!(rec["activity"], "Read");

        db.delete(EntityKind::Task, &id).unwrap();
        assert!(db.get(EntityKind::Task, &id).unwrap().is_none());
        db.delete(EntityKind::Task, &id).unwrap();

        assert!(matches!(
            db.update(EntityKind::Task, &id, &json!({})),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn kv_store() {
        let db = SqliteStore::open_memory().unwrap();
        assert!(db.kv_get("active_profile").unwrap().is_none());
        db.kv_set("active_profile", "p1").unwrap();
        assert_eq!(db.kv_get("active_profile").unwrap().unwrap(), "p1");
    }

    #[test]
    fn lease_is_shared_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studytrack.db");
        let first = SqliteStore::open_at(&path).unwrap();
        let second = SqliteStore::open_at(&path).unwrap();

        assert!(first.acquire_lease("p1", "a").unwrap());
        assert!(!second.acquire_lease("p1", "b").unwrap());
        assert!(second.acquire_lease("p2", "b").unwrap());

        second.release_lease("p1", "b").unwrap();
        assert!(!second.acquire_lease("p1", "b").unwrap());
        first.release_lease("p1", "a").unwrap();
        assert!(second.acquire_lease("p1", "b").unwrap());
    }

    #[test]
    fn abandoned_lease_is_taken_over() {
        let db = SqliteStore::open_memory().unwrap();
        assert!(db.acquire_lease("p1", "crashed").unwrap());
        db.conn()
            .execute(
                "UPDATE leases SET acquired_at = '2000-01-01T00:00:00.000Z' WHERE profile_id = 'p1'",
                [],
            )
            .unwrap();
        assert!(db.acquire_lease("p1", "fresh").unwrap());
        let holder: String = db
            .conn()
            .query_row("SELECT holder FROM leases WHERE profile_id = 'p1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(holder, "fresh");
    }

    #[test]
    fn reopens_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studytrack.db");
        {
            let db = SqliteStore::open_at(&path).unwrap();
            db.upsert(EntityKind::Profile, json!({ "id": "p1", "name": "Ada" }))
                .unwrap();
        }
        let db = SqliteStore::open_at(&path).unwrap();
        let profile = db.get(EntityKind::Profile, "p1").unwrap().unwrap();
        assert_eq!(profile["name"], "Ada");
    }
}
