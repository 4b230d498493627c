//! Daily study tasks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A planned block of study on a given day.
///
/// `subject` and `chapter` are both absent for general tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyTask {
    pub id: String,
    pub profile_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    pub activity: String,
    /// Planned minutes, always positive for validated tasks.
    #[serde(default)]
    pub duration: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    /// Number of day boundaries this task was rolled over.
    #[serde(default)]
    pub carryover_days: u32,
    #[serde(default)]
    pub task_type: Option<String>,
}

impl StudyTask {
    pub fn new(
        profile_id: impl Into<String>,
        activity: impl Into<String>,
        duration: u32,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile_id.into(),
            subject: None,
            chapter: None,
            activity: activity.into(),
            duration,
            date,
            completed: false,
            carryover_days: 0,
            task_type: None,
        }
    }

    /// Link the task to a subject chapter.
    pub fn for_chapter(mut self, subject: impl Into<String>, chapter: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self.chapter = Some(chapter.into());
        self
    }

    pub fn is_general(&self) -> bool {
        self.subject.is_none()
    }

    /// The `(subject, chapter)` pair this task studies, if any.
    pub fn chapter_ref(&self) -> Option<(&str, &str)> {
        match (self.subject.as_deref(), self.chapter.as_deref()) {
            (Some(subject), Some(chapter)) => Some((subject, chapter)),
            _ => None,
        }
    }
}
