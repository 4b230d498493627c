//! Per-profile snapshot passed into every core operation.
//!
//! Core functions never reach for ambient state. They take a
//! [`ProfileWorkingSet`], mutate it in place and report what they touched in
//! a [`ChangeSet`] so the caller can persist exactly those records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{CoreError, Result};
use crate::model::{
    names_match, Exam, Profile, RecurringReminder, Reminder, StudyTask, Subject, SubjectRecord,
    TrackingMode,
};
use crate::storage::{decode_rows, load_by_profile, EntityKind, Store};

/// Everything owned by one profile, loaded into memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileWorkingSet {
    pub profile: Profile,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub tasks: Vec<StudyTask>,
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub recurring_reminders: Vec<RecurringReminder>,
}

impl ProfileWorkingSet {
    /// An empty working set for a freshly created profile.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            subjects: Vec::new(),
            tasks: Vec::new(),
            exams: Vec::new(),
            reminders: Vec::new(),
            recurring_reminders: Vec::new(),
        }
    }

    /// Read every record owned by `profile_id` from the store.
    ///
    /// Subject chapter lists are normalized for the profile's tracking mode
    /// on the way in. Rows that fail to decode are skipped with a warning.
    pub fn load<S: Store + ?Sized>(store: &S, profile_id: &str) -> Result<Self> {
        let profile_row = store
            .get(EntityKind::Profile, profile_id)?
            .ok_or_else(|| CoreError::ProfileNotFound(profile_id.to_string()))?;
        let profile: Profile = serde_json::from_value(profile_row)?;
        let mode = profile.tracking_mode;

        let subjects = decode_rows::<SubjectRecord>(
            EntityKind::Subject,
            store.list_by_profile(EntityKind::Subject, profile_id)?,
        )
        .into_iter()
        .map(|record| record.into_subject(mode))
        .collect();

        Ok(Self {
            subjects,
            tasks: load_by_profile(store, EntityKind::Task, profile_id)?,
            exams: load_by_profile(store, EntityKind::Exam, profile_id)?,
            reminders: load_by_profile(store, EntityKind::Reminder, profile_id)?,
            recurring_reminders: load_by_profile(
                store,
                EntityKind::RecurringReminder,
                profile_id,
            )?,
            profile,
        })
    }

    pub fn mode(&self) -> TrackingMode {
        self.profile.tracking_mode
    }

    /// Subject lookup by name, case-insensitive.
    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| names_match(&s.name, name))
    }

    pub fn subject_mut(&mut self, name: &str) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|s| names_match(&s.name, name))
    }

    pub fn exam(&self, id: &str) -> Option<&Exam> {
        self.exams.iter().find(|e| e.id == id)
    }

    pub fn exam_mut(&mut self, id: &str) -> Option<&mut Exam> {
        self.exams.iter_mut().find(|e| e.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut StudyTask> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

/// Ids of the records an operation modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub profile: bool,
    pub subjects: BTreeSet<String>,
    pub exams: BTreeSet<String>,
    pub tasks: BTreeSet<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, id: impl Into<String>) -> Self {
        self.subjects.insert(id.into());
        self
    }

    pub fn exam(mut self, id: impl Into<String>) -> Self {
        self.exams.insert(id.into());
        self
    }

    pub fn task(mut self, id: impl Into<String>) -> Self {
        self.tasks.insert(id.into());
        self
    }

    pub fn merge(&mut self, other: ChangeSet) {
        self.profile |= other.profile;
        self.subjects.extend(other.subjects);
        self.exams.extend(other.exams);
        self.tasks.extend(other.tasks);
    }

    pub fn is_empty(&self) -> bool {
        !self.profile && self.subjects.is_empty() && self.exams.is_empty() && self.tasks.is_empty()
    }

    /// Total number of records to write.
    pub fn len(&self) -> usize {
        usize::from(self.profile) + self.subjects.len() + self.exams.len() + self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{save, MemoryStore};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn load_normalizes_chapters_and_filters_by_profile() {
        let store = MemoryStore::new();
        let profile = Profile {
            id: "p1".into(),
            name: "Mia".into(),
            class: "5".into(),
            tracking_mode: TrackingMode::Comprehensive,
            migration_version: 0,
        };
        save(&store, &profile).unwrap();
        store
            .upsert(
                EntityKind::Subject,
                json!({ "id": "s1", "profileId": "p1", "name": "Maths", "chapters": ["Algebra"] }),
            )
            .unwrap();
        store
            .upsert(
                EntityKind::Subject,
                json!({ "id": "s2", "profileId": "other", "name": "Art" }),
            )
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        save(&store, &StudyTask::new("p1", "Read", 20, day)).unwrap();

        let ws = ProfileWorkingSet::load(&store, "p1").unwrap();
        assert_eq!(ws.subjects.len(), 1);
        assert_eq!(ws.tasks.len(), 1);
        let chapter = &ws.subject("MATHS").unwrap().chapters[0];
        assert_eq!(chapter.status(), Some(crate::model::ChapterStatus::Pending));
    }

    #[test]
    fn load_missing_profile_fails() {
        let store = MemoryStore::new();
        assert!(matches!(
            ProfileWorkingSet::load(&store, "ghost"),
            Err(CoreError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn change_set_merge() {
        let mut a = ChangeSet::new().subject("s1").exam("e1");
        a.merge(ChangeSet::new().subject("s1").task("t1"));
        assert_eq!(a.len(), 3);
        assert!(!a.is_empty());
        assert!(ChangeSet::new().is_empty());
    }
}
