//! # StudyTrack Core Library
//!
//! This library provides the core logic for tracking a child's study
//! progress. The `studytrack-cli` binary is a thin front-end over the same
//! library.
//!
//! ## Architecture
//!
//! - **Model**: profiles, subjects with their chapter lists, tasks, exams
//!   and reminders, all serialized as camelCase JSON records
//! - **Normalizer**: resolves legacy string chapters into canonical records
//!   for the profile's tracking mode
//! - **Sync**: keeps subject chapter lists and exam chapter lists in
//!   agreement, plus the load-time migration and cleanup passes
//! - **Rollover**: moves unfinished tasks from earlier days to today
//! - **Reminders**: the urgency-ordered reminder feed
//! - **Gamification**: streaks, badges and points, always recomputed
//! - **Storage**: the [`Store`] boundary with SQLite and in-memory backends,
//!   and TOML configuration
//!
//! ## Key Components
//!
//! - [`ProfileTracker`]: activates a profile and applies validated
//!   operations, persisting only the records each one touched
//! - [`ProfileWorkingSet`]: the explicit per-profile snapshot every core
//!   function operates on
//! - [`SqliteStore`] / [`MemoryStore`]: record stores
//! - [`Config`]: application configuration

pub mod error;
pub mod gamification;
pub mod model;
pub mod normalizer;
pub mod reminders;
pub mod rollover;
pub mod storage;
pub mod sync;
pub mod tracker;
pub mod working_set;

pub use error::{ConfigError, CoreError, Result, StorageError, ValidationError};
pub use gamification::{Scoreboard, Stats};
pub use model::{
    Chapter, ChapterStatus, Exam, ExamChapter, ExamSubject, Profile, RecurringReminder, Reminder,
    StudyTask, Subject, TrackingMode,
};
pub use reminders::{ReminderItem, ReminderPrioritizer, ReminderPriority};
pub use rollover::{rollover, RolloverOutcome};
pub use storage::{Config, EntityKind, MemoryStore, SqliteStore, Store};
pub use sync::{InvariantViolation, RevisionStep};
pub use tracker::{
    create_profile, list_profiles, ActivationGuard, ActivationReport, NewRecurringReminder,
    NewTask, ProfileTracker, TrackerOptions,
};
pub use working_set::{ChangeSet, ProfileWorkingSet};
