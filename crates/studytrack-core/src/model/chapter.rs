//! Chapter types shared by subjects and exams.
//!
//! A chapter's shape depends on the owning profile's [`TrackingMode`]:
//! simple mode records a completed flag, comprehensive mode walks the
//! [`ChapterStatus`] cycle and counts revisions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Per-profile choice of how chapter progress is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Chapters are either done or not.
    #[default]
    Simple,
    /// Chapters move through the five-step status cycle and track revisions.
    Comprehensive,
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingMode::Simple => write!(f, "simple"),
            TrackingMode::Comprehensive => write!(f, "comprehensive"),
        }
    }
}

impl std::str::FromStr for TrackingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(TrackingMode::Simple),
            "comprehensive" => Ok(TrackingMode::Comprehensive),
            other => Err(format!("unknown tracking mode: {other}")),
        }
    }
}

/// Comprehensive-mode chapter status.
///
/// The status cycle is closed:
///
///   pending ──> started ──> self_study_done ──> reviewed ──> completed
///      ^                                                        |
///      +--------------------------------------------------------+
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    #[default]
    Pending,
    Started,
    SelfStudyDone,
    Reviewed,
    Completed,
}

/// Successor table for [`ChapterStatus::next`].
const STATUS_CYCLE: [(ChapterStatus, ChapterStatus); 5] = [
    (ChapterStatus::Pending, ChapterStatus::Started),
    (ChapterStatus::Started, ChapterStatus::SelfStudyDone),
    (ChapterStatus::SelfStudyDone, ChapterStatus::Reviewed),
    (ChapterStatus::Reviewed, ChapterStatus::Completed),
    (ChapterStatus::Completed, ChapterStatus::Pending),
];

impl ChapterStatus {
    /// Every status in cycle order.
    pub const ALL: [ChapterStatus; 5] = [
        ChapterStatus::Pending,
        ChapterStatus::Started,
        ChapterStatus::SelfStudyDone,
        ChapterStatus::Reviewed,
        ChapterStatus::Completed,
    ];

    /// The status a single "advance" click moves to.
    pub fn next(self) -> ChapterStatus {
        STATUS_CYCLE
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, to)| *to)
            .unwrap_or_default()
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChapterStatus::Pending => "Pending",
            ChapterStatus::Started => "Started",
            ChapterStatus::SelfStudyDone => "Self Study Done",
            ChapterStatus::Reviewed => "Reviewed",
            ChapterStatus::Completed => "Completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ChapterStatus::Completed)
    }
}

/// Revision counters with `0 <= completed <= needed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revisions {
    #[serde(default)]
    pub revisions_needed: u32,
    #[serde(default)]
    pub revisions_completed: u32,
}

impl Revisions {
    pub fn new(needed: u32) -> Self {
        Self {
            revisions_needed: needed,
            revisions_completed: 0,
        }
    }

    /// Record one more revision. Returns `false` when already at the target.
    pub fn increment(&mut self) -> bool {
        if self.revisions_completed >= self.revisions_needed {
            return false;
        }
        self.revisions_completed += 1;
        true
    }

    /// Undo one revision. Returns `false` at zero.
    pub fn decrement(&mut self) -> bool {
        if self.revisions_completed == 0 {
            return false;
        }
        self.revisions_completed -= 1;
        true
    }

    /// Change the target, pulling the completed count down if needed.
    pub fn set_needed(&mut self, needed: u32) {
        self.revisions_needed = needed;
        self.revisions_completed = self.revisions_completed.min(needed);
    }

    pub fn is_consistent(&self) -> bool {
        self.revisions_completed <= self.revisions_needed
    }
}

/// Mode-specific half of a chapter.
///
/// A stored record carrying a `status` key is comprehensive, anything else
/// is simple.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChapterProgress {
    Comprehensive {
        status: ChapterStatus,
        #[serde(flatten)]
        revisions: Revisions,
    },
    Simple {
        #[serde(default)]
        completed: bool,
        #[serde(default, rename = "completedDate")]
        completed_date: Option<NaiveDate>,
    },
}

/// Every progress field a stored chapter may carry, in either mode.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProgress {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    revisions_needed: u32,
    #[serde(default)]
    revisions_completed: u32,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    completed_date: Option<NaiveDate>,
}

impl From<StoredProgress> for ChapterProgress {
    fn from(stored: StoredProgress) -> Self {
        let Some(raw) = stored.status else {
            return ChapterProgress::Simple {
                completed: stored.completed,
                completed_date: stored.completed_date,
            };
        };
        let status = serde_json::from_value(serde_json::Value::String(raw.clone()))
            .unwrap_or_else(|_| {
                warn!(status = %raw, "unknown chapter status, reading as pending");
                ChapterStatus::Pending
            });
        ChapterProgress::Comprehensive {
            status,
            revisions: Revisions {
                revisions_needed: stored.revisions_needed,
                revisions_completed: stored.revisions_completed,
            },
        }
    }
}

impl<'de> Deserialize<'de> for ChapterProgress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        StoredProgress::deserialize(deserializer).map(Self::from)
    }
}

impl ChapterProgress {
    /// Fresh progress for a newly created chapter.
    pub fn initial(mode: TrackingMode) -> Self {
        match mode {
            TrackingMode::Simple => ChapterProgress::Simple {
                completed: false,
                completed_date: None,
            },
            TrackingMode::Comprehensive => ChapterProgress::Comprehensive {
                status: ChapterStatus::Pending,
                revisions: Revisions::default(),
            },
        }
    }

    pub fn mode(&self) -> TrackingMode {
        match self {
            ChapterProgress::Simple { .. } => TrackingMode::Simple,
            ChapterProgress::Comprehensive { .. } => TrackingMode::Comprehensive,
        }
    }
}

/// Canonical chapter record as stored in a subject's chapter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub progress: ChapterProgress,
    /// Minutes of completed study linked to this chapter.
    #[serde(default)]
    pub study_time: u32,
    /// Number of completed tasks linked to this chapter.
    #[serde(default)]
    pub task_count: u32,
    #[serde(default)]
    pub last_studied: Option<NaiveDate>,
}

impl Chapter {
    /// Create an untouched chapter for the given mode.
    pub fn new(name: impl Into<String>, mode: TrackingMode) -> Self {
        Self {
            name: name.into().trim().to_string(),
            progress: ChapterProgress::initial(mode),
            study_time: 0,
            task_count: 0,
            last_studied: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        match &self.progress {
            ChapterProgress::Simple { completed, .. } => *completed,
            ChapterProgress::Comprehensive { status, .. } => status.is_completed(),
        }
    }

    pub fn status(&self) -> Option<ChapterStatus> {
        match &self.progress {
            ChapterProgress::Comprehensive { status, .. } => Some(*status),
            ChapterProgress::Simple { .. } => None,
        }
    }

    pub fn revisions_mut(&mut self) -> Option<&mut Revisions> {
        match &mut self.progress {
            ChapterProgress::Comprehensive { revisions, .. } => Some(revisions),
            ChapterProgress::Simple { .. } => None,
        }
    }

    /// Advance the chapter one step.
    ///
    /// Comprehensive chapters move to the next status in the cycle; simple
    /// chapters flip their completed flag, stamping `today` when completing.
    pub fn advance(&mut self, today: NaiveDate) {
        match &mut self.progress {
            ChapterProgress::Comprehensive { status, .. } => *status = status.next(),
            ChapterProgress::Simple {
                completed,
                completed_date,
            } => {
                *completed = !*completed;
                *completed_date = if *completed { Some(today) } else { None };
            }
        }
    }

    /// Re-shape the chapter for another tracking mode, keeping the counters.
    pub fn convert_to(&self, mode: TrackingMode, today: NaiveDate) -> Chapter {
        if self.progress.mode() == mode {
            return self.clone();
        }
        let progress = match (&self.progress, mode) {
            (ChapterProgress::Simple { completed, .. }, TrackingMode::Comprehensive) => {
                ChapterProgress::Comprehensive {
                    status: if *completed {
                        ChapterStatus::Completed
                    } else {
                        ChapterStatus::Pending
                    },
                    revisions: Revisions::default(),
                }
            }
            (ChapterProgress::Comprehensive { status, .. }, TrackingMode::Simple) => {
                let completed = status.is_completed();
                ChapterProgress::Simple {
                    completed,
                    completed_date: completed.then(|| self.last_studied.unwrap_or(today)),
                }
            }
            (progress, _) => progress.clone(),
        };
        Chapter {
            progress,
            ..self.clone()
        }
    }

    /// Credit a completed study task to this chapter.
    pub fn record_study(&mut self, minutes: u32, on: NaiveDate) {
        self.study_time = self.study_time.saturating_add(minutes);
        self.task_count = self.task_count.saturating_add(1);
        self.last_studied = Some(self.last_studied.map_or(on, |d| d.max(on)));
    }

    /// Reverse [`Chapter::record_study`] when a task is reopened.
    pub fn unrecord_study(&mut self, minutes: u32) {
        self.study_time = self.study_time.saturating_sub(minutes);
        self.task_count = self.task_count.saturating_sub(1);
    }
}

/// A chapter value as it may appear in stored data: a bare legacy string or
/// a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChapter {
    Legacy(String),
    Record(Chapter),
}

impl From<&str> for RawChapter {
    fn from(name: &str) -> Self {
        RawChapter::Legacy(name.to_string())
    }
}

impl From<Chapter> for RawChapter {
    fn from(chapter: Chapter) -> Self {
        RawChapter::Record(chapter)
    }
}
