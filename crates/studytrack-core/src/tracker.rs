//! Per-profile tracking service.
//!
//! [`ProfileTracker`] ties the pure core operations to a [`Store`]. It owns
//! one profile's [`ProfileWorkingSet`], validates input before touching it,
//! applies the operation and writes back exactly the records reported in the
//! resulting [`ChangeSet`].
//!
//! Writes are independent. A failed write is surfaced and earlier writes of
//! the same operation stay in place; exams are written before subjects so
//! the cleanup pass on the next activation can heal the exam-only direction.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};
use crate::gamification::Scoreboard;
use crate::model::{
    Exam, ExamSubject, Profile, RecurringReminder, Reminder, StudyTask, Subject, TrackingMode,
    CURRENT_MIGRATION_VERSION,
};
use crate::reminders::{weekday_index, ReminderItem, ReminderPrioritizer};
use crate::rollover::rollover;
use crate::storage::{decode_rows, remove, save, Config, EntityKind, Store};
use crate::sync::{self, InvariantViolation, RevisionStep};
use crate::working_set::{ChangeSet, ProfileWorkingSet};

/// Tunables taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Revision target given to new comprehensive-mode chapters.
    pub default_revisions_needed: u32,
    pub urgent_within_days: i64,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            default_revisions_needed: 0,
            urgent_within_days: 7,
        }
    }
}

impl From<&Config> for TrackerOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_revisions_needed: config.tracking.default_revisions_needed,
            urgent_within_days: config.reminders.urgent_within_days,
        }
    }
}

/// Single in-flight activation per profile.
///
/// Activation reads and rewrites subject records; two overlapping runs for
/// one profile could undo each other's cleanup.
#[derive(Debug, Default)]
pub struct ActivationGuard {
    active: Mutex<HashSet<String>>,
}

/// Held for the duration of one activation. Dropping it releases the profile.
#[derive(Debug)]
pub struct ActivationTicket<'a> {
    guard: &'a ActivationGuard,
    profile_id: String,
}

impl ActivationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `profile_id`, failing if another activation holds it.
    pub fn begin(&self, profile_id: &str) -> Result<ActivationTicket<'_>> {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if !active.insert(profile_id.to_string()) {
            return Err(CoreError::ActivationInProgress(profile_id.to_string()));
        }
        Ok(ActivationTicket {
            guard: self,
            profile_id: profile_id.to_string(),
        })
    }

    pub fn is_active(&self, profile_id: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(profile_id)
    }
}

impl Drop for ActivationTicket<'_> {
    fn drop(&mut self) {
        self.guard
            .active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.profile_id);
    }
}

/// Store-level claim on a profile, visible to other processes sharing the
/// store. Released on drop.
struct StoreLease<'s, S: Store + ?Sized> {
    store: &'s S,
    profile_id: String,
    holder: String,
}

impl<'s, S: Store + ?Sized> StoreLease<'s, S> {
    fn acquire(store: &'s S, profile_id: &str) -> Result<Self> {
        let holder = Uuid::new_v4().to_string();
        if !store.acquire_lease(profile_id, &holder)? {
            return Err(CoreError::ActivationInProgress(profile_id.to_string()));
        }
        Ok(Self {
            store,
            profile_id: profile_id.to_string(),
            holder,
        })
    }
}

impl<S: Store + ?Sized> Drop for StoreLease<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.store.release_lease(&self.profile_id, &self.holder) {
            warn!(profile = %self.profile_id, error = %e, "failed to release activation lease");
        }
    }
}

/// Write every record named in `changes`, exams first.
fn persist<S: Store + ?Sized>(store: &S, ws: &ProfileWorkingSet, changes: &ChangeSet) -> Result<()> {
    for exam in ws.exams.iter().filter(|e| changes.exams.contains(&e.id)) {
        save(store, exam)?;
    }
    for subject in ws.subjects.iter().filter(|s| changes.subjects.contains(&s.id)) {
        save(store, subject)?;
    }
    for task in ws.tasks.iter().filter(|t| changes.tasks.contains(&t.id)) {
        save(store, task)?;
    }
    if changes.profile {
        save(store, &ws.profile)?;
    }
    debug!(records = changes.len(), "changes persisted");
    Ok(())
}

/// What activation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationReport {
    pub rolled_over: Vec<String>,
    pub migrated: ChangeSet,
    pub cleaned: ChangeSet,
    /// Records written back.
    pub persisted: usize,
}

/// Input for [`ProfileTracker::add_task`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub activity: String,
    pub subject: Option<String>,
    pub chapter: Option<String>,
    pub duration: i64,
    /// Defaults to the tracker's today.
    pub date: Option<NaiveDate>,
    pub task_type: Option<String>,
}

/// Input for [`ProfileTracker::add_recurring_reminder`].
#[derive(Debug, Clone, Default)]
pub struct NewRecurringReminder {
    pub title: String,
    pub description: String,
    pub time: String,
    pub end_time: Option<String>,
    pub days: Vec<u8>,
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::EmptyField { field }.into());
    }
    Ok(value.to_string())
}

fn validate_time(field: &'static str, value: &str) -> Result<()> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| ValidationError::InvalidValue {
        field: field.to_string(),
        message: format!("'{value}' is not HH:MM ({e})"),
    })?;
    Ok(())
}

/// Create and store a new profile.
///
/// New profiles start at the current migration version since they hold no
/// legacy data.
pub fn create_profile<S: Store + ?Sized>(
    store: &S,
    name: &str,
    class: &str,
    mode: TrackingMode,
) -> Result<Profile> {
    let mut profile = Profile::new(required("name", name)?, class.trim(), mode);
    profile.migration_version = CURRENT_MIGRATION_VERSION;
    save(store, &profile)?;
    info!(profile = %profile.id, "profile created");
    Ok(profile)
}

pub fn list_profiles<S: Store + ?Sized>(store: &S) -> Result<Vec<Profile>> {
    Ok(decode_rows(EntityKind::Profile, store.list(EntityKind::Profile)?))
}

/// One activated profile bound to a store.
pub struct ProfileTracker<S: Store> {
    store: S,
    ws: ProfileWorkingSet,
    today: NaiveDate,
    options: TrackerOptions,
}

impl<S: Store> ProfileTracker<S> {
    /// Load a profile and run the activation passes: task rollover, the
    /// one-time migration and the cleanup pass. Touched records are written
    /// back before returning.
    ///
    /// The passes run under the in-process `guard` and under a store lease,
    /// so another process sharing the store cannot activate the same profile
    /// concurrently.
    ///
    /// # Errors
    /// Fails if the profile is already being activated, does not exist, or a
    /// read or write against the store fails.
    pub fn activate(
        store: S,
        profile_id: &str,
        today: NaiveDate,
        guard: &ActivationGuard,
    ) -> Result<(Self, ActivationReport)> {
        let _ticket = guard.begin(profile_id)?;
        let lease = StoreLease::acquire(&store, profile_id)?;
        let mut ws = ProfileWorkingSet::load(&store, profile_id)?;

        let rolled = rollover(&mut ws.tasks, today);
        let migrated = sync::migration_pass(&mut ws);
        let cleaned = sync::cleanup_pass(&mut ws);

        let mut changes = rolled.changes();
        changes.merge(migrated.clone());
        changes.merge(cleaned.clone());
        persist(&store, &ws, &changes)?;
        drop(lease);

        let tracker = Self {
            store,
            ws,
            today,
            options: TrackerOptions::default(),
        };

        let report = ActivationReport {
            rolled_over: rolled.moved,
            migrated,
            cleaned,
            persisted: changes.len(),
        };
        info!(
            profile = profile_id,
            rolled_over = report.rolled_over.len(),
            persisted = report.persisted,
            "profile activated"
        );
        Ok((tracker, report))
    }

    pub fn with_options(mut self, options: TrackerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn working_set(&self) -> &ProfileWorkingSet {
        &self.ws
    }

    pub fn profile(&self) -> &Profile {
        &self.ws.profile
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&self, changes: &ChangeSet) -> Result<()> {
        persist(&self.store, &self.ws, changes)
    }

    fn apply(&mut self, op: impl FnOnce(&mut ProfileWorkingSet) -> ChangeSet) -> Result<ChangeSet> {
        let changes = op(&mut self.ws);
        self.persist(&changes)?;
        Ok(changes)
    }

    // =========================================================================
    // Subjects and chapters
    // =========================================================================

    pub fn add_subject(&mut self, name: &str) -> Result<Subject> {
        let name = required("subject", name)?;
        if self.ws.subject(&name).is_some() {
            return Err(ValidationError::DuplicateSubject(name).into());
        }
        let subject = Subject::new(&self.ws.profile.id, name);
        save(&self.store, &subject)?;
        self.ws.subjects.push(subject.clone());
        Ok(subject)
    }

    /// Delete a subject record. Exam sittings naming it are left dangling.
    pub fn remove_subject(&mut self, name: &str) -> Result<bool> {
        let Some(pos) = self
            .ws
            .subjects
            .iter()
            .position(|s| crate::model::names_match(&s.name, name))
        else {
            return Ok(false);
        };
        remove(&self.store, &self.ws.subjects[pos])?;
        self.ws.subjects.remove(pos);
        Ok(true)
    }

    pub fn add_chapter(&mut self, subject: &str, chapter: &str) -> Result<ChangeSet> {
        let chapter = required("chapter", chapter)?;
        let existed = self
            .ws
            .subject(subject)
            .is_some_and(|s| s.has_chapter(&chapter));
        let needed = self.options.default_revisions_needed;
        self.apply(|ws| {
            let changes = sync::add_chapter(ws, subject, &chapter);
            if !existed && needed > 0 {
                if let Some(revisions) = ws
                    .subject_mut(subject)
                    .and_then(|s| s.chapter_mut(&chapter))
                    .and_then(|c| c.revisions_mut())
                {
                    revisions.set_needed(needed);
                }
            }
            changes
        })
    }

    pub fn delete_chapter(&mut self, subject: &str, chapter: &str) -> Result<ChangeSet> {
        self.apply(|ws| sync::delete_chapter(ws, subject, chapter))
    }

    pub fn advance_chapter(&mut self, subject: &str, chapter: &str) -> Result<ChangeSet> {
        let today = self.today;
        self.apply(|ws| sync::advance_chapter(ws, subject, chapter, today))
    }

    pub fn adjust_chapter_revisions(
        &mut self,
        subject: &str,
        chapter: &str,
        step: RevisionStep,
    ) -> Result<ChangeSet> {
        self.apply(|ws| sync::adjust_chapter_revisions(ws, subject, chapter, step))
    }

    /// Switch the profile's tracking mode, converting every chapter.
    pub fn switch_mode(&mut self, mode: TrackingMode) -> Result<ChangeSet> {
        if self.ws.mode() == mode {
            return Ok(ChangeSet::new());
        }
        let today = self.today;
        self.apply(|ws| {
            ws.profile.tracking_mode = mode;
            let mut changes = ChangeSet {
                profile: true,
                ..ChangeSet::default()
            };
            for subject in &mut ws.subjects {
                subject.chapters = subject
                    .chapters
                    .iter()
                    .map(|c| c.convert_to(mode, today))
                    .collect();
                changes.subjects.insert(subject.id.clone());
            }
            changes
        })
    }

    // =========================================================================
    // Exams
    // =========================================================================

    pub fn add_exam(&mut self, name: &str, date: NaiveDate) -> Result<Exam> {
        let exam = Exam::new(&self.ws.profile.id, required("name", name)?, date);
        save(&self.store, &exam)?;
        self.ws.exams.push(exam.clone());
        Ok(exam)
    }

    pub fn delete_exam(&mut self, exam_id: &str) -> Result<bool> {
        let Some(pos) = self.ws.exams.iter().position(|e| e.id == exam_id) else {
            return Ok(false);
        };
        remove(&self.store, &self.ws.exams[pos])?;
        self.ws.exams.remove(pos);
        Ok(true)
    }

    pub fn add_exam_subject(
        &mut self,
        exam_id: &str,
        subject: &str,
        date: Option<NaiveDate>,
    ) -> Result<ChangeSet> {
        let subject = required("subject", subject)?;
        if self
            .ws
            .exam(exam_id)
            .is_some_and(|e| e.subjects.iter().any(|s| s.is_for(&subject)))
        {
            return Err(ValidationError::InvalidValue {
                field: "subject".into(),
                message: format!("exam already has a '{subject}' sitting"),
            }
            .into());
        }
        self.apply(|ws| match ws.exam_mut(exam_id) {
            Some(exam) => {
                exam.subjects.push(ExamSubject::new(subject, date));
                ChangeSet::new().exam(exam_id)
            }
            None => {
                tracing::warn!(exam = exam_id, "exam not found, subject not added");
                ChangeSet::new()
            }
        })
    }

    pub fn add_exam_chapter(
        &mut self,
        exam_id: &str,
        subject_index: usize,
        chapter: &str,
        exam_only: bool,
    ) -> Result<ChangeSet> {
        let chapter = required("chapter", chapter)?;
        self.apply(|ws| sync::add_exam_chapter(ws, exam_id, subject_index, &chapter, exam_only))
    }

    pub fn remove_exam_chapter(
        &mut self,
        exam_id: &str,
        subject_index: usize,
        chapter_index: usize,
    ) -> Result<ChangeSet> {
        self.apply(|ws| sync::remove_exam_chapter(ws, exam_id, subject_index, chapter_index))
    }

    pub fn set_exam_only(
        &mut self,
        exam_id: &str,
        subject_index: usize,
        chapter_index: usize,
        value: bool,
    ) -> Result<ChangeSet> {
        self.apply(|ws| sync::set_exam_only(ws, exam_id, subject_index, chapter_index, value))
    }

    pub fn advance_exam_chapter(
        &mut self,
        exam_id: &str,
        subject_index: usize,
        chapter_index: usize,
    ) -> Result<ChangeSet> {
        self.apply(|ws| sync::advance_exam_chapter(ws, exam_id, subject_index, chapter_index))
    }

    pub fn adjust_exam_chapter_revisions(
        &mut self,
        exam_id: &str,
        subject_index: usize,
        chapter_index: usize,
        step: RevisionStep,
    ) -> Result<ChangeSet> {
        self.apply(|ws| {
            sync::adjust_exam_chapter_revisions(ws, exam_id, subject_index, chapter_index, step)
        })
    }

    /// Record marks as a percentage, or clear them with `None`.
    pub fn set_exam_marks(
        &mut self,
        exam_id: &str,
        subject_index: usize,
        marks: Option<f64>,
    ) -> Result<ChangeSet> {
        if let Some(m) = marks {
            if !(0.0..=100.0).contains(&m) {
                return Err(ValidationError::InvalidMarks(m).into());
            }
        }
        self.apply(|ws| sync::set_exam_marks(ws, exam_id, subject_index, marks))
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Plan a task. A task naming a chapter also adds that chapter to its
    /// subject if missing, unless the chapter is exam-only.
    pub fn add_task(&mut self, input: NewTask) -> Result<StudyTask> {
        let activity = required("activity", &input.activity)?;
        if input.duration <= 0 {
            return Err(ValidationError::NonPositiveDuration(input.duration).into());
        }
        let duration = u32::try_from(input.duration).map_err(|_| ValidationError::InvalidValue {
            field: "duration".into(),
            message: format!("{} minutes is too long", input.duration),
        })?;
        let subject = input.subject.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let chapter = input.chapter.as_deref().map(str::trim).filter(|c| !c.is_empty());
        if chapter.is_some() && subject.is_none() {
            return Err(ValidationError::ChapterWithoutSubject.into());
        }

        let mut task = StudyTask::new(
            &self.ws.profile.id,
            activity,
            duration,
            input.date.unwrap_or(self.today),
        );
        task.subject = subject.map(str::to_string);
        task.chapter = chapter.map(str::to_string);
        task.task_type = input.task_type;

        if let (Some(subject), Some(chapter)) = (subject, chapter) {
            let changes = sync::sync_task_chapter(&mut self.ws, subject, chapter);
            self.persist(&changes)?;
        }
        save(&self.store, &task)?;
        self.ws.tasks.push(task.clone());
        Ok(task)
    }

    pub fn set_task_completed(&mut self, task_id: &str, completed: bool) -> Result<ChangeSet> {
        self.apply(|ws| sync::set_task_completed(ws, task_id, completed))
    }

    pub fn delete_task(&mut self, task_id: &str) -> Result<bool> {
        let Some(pos) = self.ws.tasks.iter().position(|t| t.id == task_id) else {
            return Ok(false);
        };
        remove(&self.store, &self.ws.tasks[pos])?;
        self.ws.tasks.remove(pos);
        Ok(true)
    }

    // =========================================================================
    // Reminders
    // =========================================================================

    pub fn add_reminder(&mut self, title: &str, date: NaiveDate, description: &str) -> Result<Reminder> {
        let mut reminder = Reminder::new(&self.ws.profile.id, required("title", title)?, date);
        reminder.description = description.trim().to_string();
        save(&self.store, &reminder)?;
        self.ws.reminders.push(reminder.clone());
        Ok(reminder)
    }

    pub fn add_recurring_reminder(&mut self, input: NewRecurringReminder) -> Result<RecurringReminder> {
        let title = required("title", &input.title)?;
        if input.days.is_empty() {
            return Err(ValidationError::EmptyField { field: "days" }.into());
        }
        if let Some(&bad) = input.days.iter().find(|&&d| d > 6) {
            return Err(ValidationError::InvalidWeekday(bad).into());
        }
        validate_time("time", &input.time)?;
        if let Some(end) = &input.end_time {
            validate_time("end_time", end)?;
        }

        let mut reminder =
            RecurringReminder::new(&self.ws.profile.id, title, input.time.trim(), input.days);
        reminder.description = input.description.trim().to_string();
        reminder.end_time = input.end_time.map(|e| e.trim().to_string());
        save(&self.store, &reminder)?;
        self.ws.recurring_reminders.push(reminder.clone());
        Ok(reminder)
    }

    /// Delete a one-time or recurring reminder by id.
    pub fn delete_reminder(&mut self, id: &str) -> Result<bool> {
        if let Some(pos) = self.ws.reminders.iter().position(|r| r.id == id) {
            remove(&self.store, &self.ws.reminders[pos])?;
            self.ws.reminders.remove(pos);
            return Ok(true);
        }
        if let Some(pos) = self.ws.recurring_reminders.iter().position(|r| r.id == id) {
            remove(&self.store, &self.ws.recurring_reminders[pos])?;
            self.ws.recurring_reminders.remove(pos);
            return Ok(true);
        }
        Ok(false)
    }

    // =========================================================================
    // Read side
    // =========================================================================

    pub fn feed(&self) -> Vec<ReminderItem> {
        ReminderPrioritizer::new()
            .with_urgent_window(self.options.urgent_within_days)
            .prioritize(
                &self.ws.reminders,
                &self.ws.recurring_reminders,
                self.today,
                weekday_index(self.today),
            )
    }

    pub fn scoreboard(&self) -> Scoreboard {
        Scoreboard::compute(&self.ws, self.today)
    }

    pub fn violations(&self) -> Vec<InvariantViolation> {
        sync::check_invariant(&self.ws)
    }

    /// Run the two-way repair pass and persist what it changed, holding the
    /// profile's store lease throughout.
    pub fn repair(&mut self) -> Result<ChangeSet> {
        let _lease = StoreLease::acquire(&self.store, &self.ws.profile.id)?;
        let changes = sync::repair_pass(&mut self.ws);
        persist(&self.store, &self.ws, &changes)?;
        Ok(changes)
    }
}
