//! Exams and the chapters they cover.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::chapter::{ChapterStatus, Revisions};
use super::names_match;

/// How a chapter is being prepared for an exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyMode {
    #[default]
    FullPortions,
    Objective,
    Custom,
}

/// A chapter reference inside an exam subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamChapter {
    pub name: String,
    #[serde(default)]
    pub status: ChapterStatus,
    #[serde(flatten)]
    pub revisions: Revisions,
    #[serde(default)]
    pub study_mode: StudyMode,
    #[serde(default)]
    pub custom_study_mode: String,
    /// Kept out of the owning subject's chapter list when set.
    #[serde(default)]
    pub exam_only: bool,
}

impl ExamChapter {
    pub fn new(name: impl Into<String>, exam_only: bool) -> Self {
        Self {
            name: name.into().trim().to_string(),
            status: ChapterStatus::Pending,
            revisions: Revisions::default(),
            study_mode: StudyMode::FullPortions,
            custom_study_mode: String::new(),
            exam_only,
        }
    }
}

/// One subject sitting of an exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSubject {
    pub subject: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub chapters: Vec<ExamChapter>,
    /// Percentage scored, once known.
    #[serde(default)]
    pub marks: Option<f64>,
    #[serde(default)]
    pub key_points: String,
}

impl ExamSubject {
    pub fn new(subject: impl Into<String>, date: Option<NaiveDate>) -> Self {
        Self {
            subject: subject.into().trim().to_string(),
            date,
            chapters: Vec::new(),
            marks: None,
            key_points: String::new(),
        }
    }

    pub fn is_for(&self, subject: &str) -> bool {
        names_match(&self.subject, subject)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub profile_id: String,
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub subjects: Vec<ExamSubject>,
}

impl Exam {
    pub fn new(profile_id: impl Into<String>, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile_id.into(),
            name: name.into(),
            date,
            subjects: Vec::new(),
        }
    }

    /// Iterate `(subject name, chapter)` over every chapter in the exam.
    pub fn chapter_refs(&self) -> impl Iterator<Item = (&str, &ExamChapter)> {
        self.subjects
            .iter()
            .flat_map(|s| s.chapters.iter().map(move |c| (s.subject.as_str(), c)))
    }
}
