//! In-process record store.
//!
//! Keeps records in insertion order behind a mutex. Writes to selected
//! entity kinds can be made to fail, which is how the partial-failure and
//! self-healing paths are exercised in tests.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{merge_patch, prepare_record, EntityKind, Store};
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct Row {
    seq: u64,
    profile_id: String,
    body: Value,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: BTreeMap<(EntityKind, String), Row>,
    next_seq: u64,
    failing: HashSet<EntityKind>,
    writes: usize,
    /// profile id -> lease holder
    leases: HashMap<String, String>,
}

/// Thread-safe in-memory [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every subsequent write to `kind` fail until [`MemoryStore::heal`].
    pub fn fail_writes(&self, kind: EntityKind) {
        self.state().failing.insert(kind);
    }

    /// Clear all injected write failures.
    pub fn heal(&self) {
        self.state().failing.clear();
    }

    /// Number of successful writes (upsert, update, delete) so far.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Number of stored records of `kind`.
    pub fn len(&self, kind: EntityKind) -> usize {
        self.state().rows.keys().filter(|(k, _)| *k == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.state().rows.is_empty()
    }

    fn check_writable(state: &MemoryState, kind: EntityKind) -> Result<(), StorageError> {
        if state.failing.contains(&kind) {
            return Err(StorageError::WriteRejected {
                kind,
                message: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn collect<F>(&self, kind: EntityKind, keep: F) -> Vec<Value>
    where
        F: Fn(&Row) -> bool,
    {
        let state = self.state();
        let mut rows: Vec<&Row> = state
            .rows
            .iter()
            .filter(|((k, _), row)| *k == kind && keep(*row))
            .map(|(_, row)| row)
            .collect();
        rows.sort_by_key(|row| row.seq);
        rows.into_iter().map(|row| row.body.clone()).collect()
    }
}

impl Store for MemoryStore {
    fn list_by_profile(
        &self,
        kind: EntityKind,
        profile_id: &str,
    ) -> Result<Vec<Value>, StorageError> {
        Ok(self.collect(kind, |row| row.profile_id == profile_id))
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<Value>, StorageError> {
        Ok(self.collect(kind, |_| true))
    }

    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, StorageError> {
        Ok(self
            .state()
            .rows
            .get(&(kind, id.to_string()))
            .map(|row| row.body.clone()))
    }

    fn upsert(&self, kind: EntityKind, record: Value) -> Result<Value, StorageError> {
        let mut state = self.state();
        Self::check_writable(&state, kind)?;
        let (id, profile_id, body) = prepare_record(kind, record)?;

        let key = (kind, id);
        let existing_seq = state.rows.get(&key).map(|row| row.seq);
        let seq = match existing_seq {
            Some(seq) => seq,
            None => {
                state.next_seq += 1;
                state.next_seq
            }
        };
        state.rows.insert(
            key,
            Row {
                seq,
                profile_id,
                body: body.clone(),
            },
        );
        state.writes += 1;
        Ok(body)
    }

    fn update(&self, kind: EntityKind, id: &str, patch: &Value) -> Result<(), StorageError> {
        let mut state = self.state();
        Self::check_writable(&state, kind)?;
        let row = state
            .rows
            .get_mut(&(kind, id.to_string()))
            .ok_or_else(|| StorageError::NotFound {
                kind,
                id: id.to_string(),
            })?;
        merge_patch(&mut row.body, patch);
        state.writes += 1;
        Ok(())
    }

    fn delete(&self, kind: EntityKind, id: &str) -> Result<(), StorageError> {
        let mut state = self.state();
        Self::check_writable(&state, kind)?;
        state.rows.remove(&(kind, id.to_string()));
        state.writes += 1;
        Ok(())
    }

    fn acquire_lease(&self, profile_id: &str, holder: &str) -> Result<bool, StorageError> {
        let mut state = self.state();
        if state.leases.contains_key(profile_id) {
            return Ok(false);
        }
        state.leases.insert(profile_id.to_string(), holder.to_string());
        Ok(true)
    }

    fn release_lease(&self, profile_id: &str, holder: &str) -> Result<(), StorageError> {
        let mut state = self.state();
        if state.leases.get(profile_id).is_some_and(|h| h == holder) {
            state.leases.remove(profile_id);
        }
        Ok(())
    }
}
