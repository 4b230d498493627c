//! Record store boundary.
//!
//! The core never talks to a database directly. Everything it persists goes
//! through [`Store`], a row-based CRUD interface over JSON records grouped by
//! [`EntityKind`]. Two implementations ship with the crate: [`SqliteStore`]
//! for the CLI and [`MemoryStore`] for tests and embedding.
//!
//! There are no multi-record transactions. Callers issue one write per
//! touched record and must tolerate partial completion.

mod config;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use config::{Config, LoggingConfig, ReminderConfig, TrackingConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

use crate::error::{ConfigError, StorageError};
use crate::model::{Exam, Profile, RecurringReminder, Reminder, StudyTask, Subject};

/// Entity type a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Profile,
    Subject,
    Task,
    Exam,
    Reminder,
    RecurringReminder,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Profile,
        EntityKind::Subject,
        EntityKind::Task,
        EntityKind::Exam,
        EntityKind::Reminder,
        EntityKind::RecurringReminder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Profile => "profile",
            EntityKind::Subject => "subject",
            EntityKind::Task => "task",
            EntityKind::Exam => "exam",
            EntityKind::Reminder => "reminder",
            EntityKind::RecurringReminder => "recurring_reminder",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row-based CRUD over JSON records.
///
/// Records are JSON objects carrying an `id` and, for everything but
/// profiles, a `profileId`. A profile's own `id` doubles as its profile key.
pub trait Store {
    /// All records of `kind` owned by `profile_id`, in insertion order.
    fn list_by_profile(&self, kind: EntityKind, profile_id: &str)
        -> Result<Vec<Value>, StorageError>;

    /// All records of `kind`, in insertion order.
    fn list(&self, kind: EntityKind) -> Result<Vec<Value>, StorageError>;

    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, StorageError>;

    /// Insert or replace a record. A missing `id` is generated and the stored
    /// record is returned.
    fn upsert(&self, kind: EntityKind, record: Value) -> Result<Value, StorageError>;

    /// Shallow-merge `patch` into an existing record.
    fn update(&self, kind: EntityKind, id: &str, patch: &Value) -> Result<(), StorageError>;

    /// Remove a record. Deleting a missing record is not an error.
    fn delete(&self, kind: EntityKind, id: &str) -> Result<(), StorageError>;

    /// Take the activation lease on `profile_id` for `holder`.
    ///
    /// Returns `false` while another holder's lease is live. Leases are
    /// visible to every handle on the same backing store.
    fn acquire_lease(&self, profile_id: &str, holder: &str) -> Result<bool, StorageError>;

    /// Give back a lease. Only the holder that took it can release it.
    fn release_lease(&self, profile_id: &str, holder: &str) -> Result<(), StorageError>;
}

impl<T: Store + ?Sized> Store for &T {
    fn list_by_profile(
        &self,
        kind: EntityKind,
        profile_id: &str,
    ) -> Result<Vec<Value>, StorageError> {
        (**self).list_by_profile(kind, profile_id)
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<Value>, StorageError> {
        (**self).list(kind)
    }

    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(kind, id)
    }

    fn upsert(&self, kind: EntityKind, record: Value) -> Result<Value, StorageError> {
        (**self).upsert(kind, record)
    }

    fn update(&self, kind: EntityKind, id: &str, patch: &Value) -> Result<(), StorageError> {
        (**self).update(kind, id, patch)
    }

    fn delete(&self, kind: EntityKind, id: &str) -> Result<(), StorageError> {
        (**self).delete(kind, id)
    }

    fn acquire_lease(&self, profile_id: &str, holder: &str) -> Result<bool, StorageError> {
        (**self).acquire_lease(profile_id, holder)
    }

    fn release_lease(&self, profile_id: &str, holder: &str) -> Result<(), StorageError> {
        (**self).release_lease(profile_id, holder)
    }
}

/// A typed entity that maps onto one store record.
pub trait Record: Serialize {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

impl Record for Profile {
    const KIND: EntityKind = EntityKind::Profile;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Subject {
    const KIND: EntityKind = EntityKind::Subject;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for StudyTask {
    const KIND: EntityKind = EntityKind::Task;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Exam {
    const KIND: EntityKind = EntityKind::Exam;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Reminder {
    const KIND: EntityKind = EntityKind::Reminder;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for RecurringReminder {
    const KIND: EntityKind = EntityKind::RecurringReminder;
    fn id(&self) -> &str {
        &self.id
    }
}

/// Serialize and upsert a typed record.
pub fn save<S: Store + ?Sized, R: Record>(store: &S, record: &R) -> Result<(), StorageError> {
    let value = serde_json::to_value(record).map_err(|e| StorageError::Malformed {
        kind: R::KIND,
        message: e.to_string(),
    })?;
    store.upsert(R::KIND, value)?;
    Ok(())
}

/// Delete a typed record by id.
pub fn remove<S: Store + ?Sized, R: Record>(store: &S, record: &R) -> Result<(), StorageError> {
    store.delete(R::KIND, record.id())
}

/// Decode rows, skipping (and logging) any that do not fit `T`.
pub fn decode_rows<T: DeserializeOwned>(kind: EntityKind, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(%kind, error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}

/// Load and decode every record of `kind` for a profile.
pub fn load_by_profile<S: Store + ?Sized, T: DeserializeOwned>(
    store: &S,
    kind: EntityKind,
    profile_id: &str,
) -> Result<Vec<T>, StorageError> {
    Ok(decode_rows(kind, store.list_by_profile(kind, profile_id)?))
}

/// Validate an incoming record and pull out its `(id, profile_id)` keys,
/// generating an id when absent.
pub(crate) fn prepare_record(
    kind: EntityKind,
    mut record: Value,
) -> Result<(String, String, Value), StorageError> {
    let obj = record.as_object_mut().ok_or_else(|| StorageError::Malformed {
        kind,
        message: "record is not a JSON object".into(),
    })?;

    let id = match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let id = uuid::Uuid::new_v4().to_string();
            obj.insert("id".into(), Value::String(id.clone()));
            id
        }
    };

    let profile_id = if kind == EntityKind::Profile {
        id.clone()
    } else {
        obj.get("profileId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StorageError::Malformed {
                kind,
                message: format!("record {id} has no profileId"),
            })?
    };

    Ok((id, profile_id, record))
}

/// Shallow merge: every top-level key of `patch` replaces the target's.
pub(crate) fn merge_patch(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (k, v) in patch {
            target.insert(k.clone(), v.clone());
        }
    }
}

/// Returns the data directory, creating it if needed.
///
/// `STUDYTRACK_DATA_DIR` is used verbatim when set; otherwise
/// `~/.config/studytrack[-dev]/`, with the `-dev` suffix selected by
/// `STUDYTRACK_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYTRACK_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("STUDYTRACK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studytrack-dev")
            } else {
                base_dir.join("studytrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
