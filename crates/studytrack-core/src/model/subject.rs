//! Subject records and their chapter lists.

use serde::{Deserialize, Serialize};

use super::chapter::{Chapter, RawChapter, TrackingMode};
use super::names_match;
use crate::normalizer;

/// A subject with its canonical, insertion-ordered chapter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub profile_id: String,
    pub name: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

/// Subject as read from the store, before chapter normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub id: String,
    pub profile_id: String,
    pub name: String,
    #[serde(default)]
    pub chapters: Vec<RawChapter>,
}

impl SubjectRecord {
    /// Resolve loose chapter values into canonical chapters for `mode`.
    pub fn into_subject(self, mode: TrackingMode) -> Subject {
        Subject {
            id: self.id,
            profile_id: self.profile_id,
            name: self.name,
            chapters: normalizer::normalize_all(self.chapters, mode),
        }
    }
}

impl Subject {
    pub fn new(profile_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile_id.into(),
            name: name.into().trim().to_string(),
            chapters: Vec::new(),
        }
    }

    pub fn has_chapter(&self, name: &str) -> bool {
        self.chapters.iter().any(|c| names_match(&c.name, name))
    }

    pub fn chapter(&self, name: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| names_match(&c.name, name))
    }

    pub fn chapter_mut(&mut self, name: &str) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|c| names_match(&c.name, name))
    }

    /// 1-based position used for comprehensive-mode numbering.
    pub fn chapter_number(&self, name: &str) -> Option<usize> {
        self.chapters
            .iter()
            .position(|c| names_match(&c.name, name))
            .map(|i| i + 1)
    }

    /// Remove every chapter whose name matches. Returns how many were removed.
    pub fn remove_chapter(&mut self, name: &str) -> usize {
        let before = self.chapters.len();
        self.chapters.retain(|c| !names_match(&c.name, name));
        before - self.chapters.len()
    }

    /// Share of chapters marked complete, as a whole percentage.
    pub fn progress_percent(&self) -> u32 {
        if self.chapters.is_empty() {
            return 0;
        }
        let done = self.chapters.iter().filter(|c| c.is_completed()).count();
        ((done as f64 / self.chapters.len() as f64) * 100.0).round() as u32
    }
}
