//! Entity model shared by every core component.

pub mod chapter;
pub mod exam;
pub mod profile;
pub mod reminder;
pub mod subject;
pub mod task;

pub use chapter::{Chapter, ChapterProgress, ChapterStatus, RawChapter, Revisions, TrackingMode};
pub use exam::{Exam, ExamChapter, ExamSubject, StudyMode};
pub use profile::{Profile, CURRENT_MIGRATION_VERSION};
pub use reminder::{RecurringReminder, Reminder};
pub use subject::{Subject, SubjectRecord};
pub use task::StudyTask;

/// Name comparison used for both subjects and chapters: trimmed and
/// case-insensitive.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
