//! Load-time repair passes.
//!
//! [`migration_pass`] runs once per profile, gated by
//! `Profile::migration_version`, and backfills subject chapters for exam
//! chapters created before the two lists were kept in sync.
//! [`cleanup_pass`] runs on every load and strips exam-only chapters that
//! leaked into subjects, which is also how a half-finished multi-record
//! update heals.
//!
//! Both read and then write the same subject records. Callers must not run
//! them concurrently for one profile.

use std::collections::BTreeMap;
use tracing::info;

use super::{remove_chapter_from_subject, sync_chapter_to_subject};
use crate::model::CURRENT_MIGRATION_VERSION;
use crate::working_set::{ChangeSet, ProfileWorkingSet};

/// Case-folded `(subject, chapter)` key with the first spelling seen.
fn pair_key(subject: &str, chapter: &str) -> (String, String) {
    (subject.trim().to_lowercase(), chapter.trim().to_lowercase())
}

/// Add every non-exam-only exam chapter that is missing from its subject.
fn backfill_subject_chapters(ws: &mut ProfileWorkingSet) -> ChangeSet {
    let pairs: Vec<(String, String)> = ws
        .exams
        .iter()
        .flat_map(|e| e.chapter_refs())
        .filter(|(_, c)| !c.exam_only)
        .map(|(s, c)| (s.to_string(), c.name.clone()))
        .collect();

    let mut changes = ChangeSet::new();
    for (subject, chapter) in &pairs {
        changes.merge(sync_chapter_to_subject(ws, subject, chapter));
    }
    changes
}

/// Backfill subject chapters from exams, then advance the profile's
/// migration version.
///
/// A profile already at the current version is left untouched, so a second
/// run reports no changes.
pub fn migration_pass(ws: &mut ProfileWorkingSet) -> ChangeSet {
    if !ws.profile.needs_migration() {
        return ChangeSet::new();
    }

    let mut changes = backfill_subject_chapters(ws);
    ws.profile.migration_version = CURRENT_MIGRATION_VERSION;
    changes.profile = true;
    info!(
        profile = %ws.profile.id,
        subjects_updated = changes.subjects.len(),
        "exam chapter migration applied"
    );
    changes
}

/// Remove exam-only chapters from their subjects.
///
/// When exams disagree about a pair, the exam-only side wins and the other
/// references are flagged to match, so the result satisfies the
/// synchronization invariant. Idempotent.
pub fn cleanup_pass(ws: &mut ProfileWorkingSet) -> ChangeSet {
    let mut exam_only: BTreeMap<(String, String), (String, String)> = BTreeMap::new();
    for (subject, chapter) in ws.exams.iter().flat_map(|e| e.chapter_refs()) {
        if chapter.exam_only {
            exam_only
                .entry(pair_key(subject, &chapter.name))
                .or_insert_with(|| (subject.to_string(), chapter.name.clone()));
        }
    }
    if exam_only.is_empty() {
        return ChangeSet::new();
    }

    let mut changes = ChangeSet::new();
    for exam in &mut ws.exams {
        let mut touched = false;
        for sitting in &mut exam.subjects {
            for chapter in &mut sitting.chapters {
                if !chapter.exam_only
                    && exam_only.contains_key(&pair_key(&sitting.subject, &chapter.name))
                {
                    chapter.exam_only = true;
                    touched = true;
                }
            }
        }
        if touched {
            changes.exams.insert(exam.id.clone());
        }
    }

    for (subject, chapter) in exam_only.values() {
        changes.merge(remove_chapter_from_subject(ws, subject, chapter));
    }

    if !changes.is_empty() {
        info!(
            profile = %ws.profile.id,
            subjects_updated = changes.subjects.len(),
            exams_updated = changes.exams.len(),
            "exam-only cleanup applied"
        );
    }
    changes
}

/// Restore full agreement in both directions: the cleanup pass, then an
/// ungated backfill of missing subject chapters.
///
/// Used by `doctor --fix` after an interrupted multi-record write left a
/// regular exam chapter without its subject copy.
pub fn repair_pass(ws: &mut ProfileWorkingSet) -> ChangeSet {
    let mut changes = cleanup_pass(ws);
    changes.merge(backfill_subject_chapters(ws));
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Chapter, Exam, ExamChapter, ExamSubject, Profile, Subject, TrackingMode,
    };
    use crate::sync::check_invariant;
    use chrono::NaiveDate;

    fn legacy_working_set() -> ProfileWorkingSet {
        let mut profile = Profile::new("Ana", "7", TrackingMode::Comprehensive);
        profile.id = "p".into();
        let mut ws = ProfileWorkingSet::new(profile);

        let mut history = Subject::new("p", "History");
        history.id = "s-history".into();
        history
            .chapters
            .push(Chapter::new("Rome", TrackingMode::Comprehensive));
        history
            .chapters
            .push(Chapter::new("Vikings", TrackingMode::Comprehensive));
        ws.subjects.push(history);

        let mut exam = Exam::new("p", "Term 1", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        exam.id = "e".into();
        let mut sitting = ExamSubject::new("history", None);
        sitting.chapters.push(ExamChapter::new("Egypt", false));
        sitting.chapters.push(ExamChapter::new("Vikings", true));
        sitting.chapters.push(ExamChapter::new("rome", false));
        exam.subjects.push(sitting);
        // A sitting for a subject the profile never created.
        let mut art = ExamSubject::new("Art", None);
        art.chapters.push(ExamChapter::new("Colour", false));
        exam.subjects.push(art);
        ws.exams.push(exam);
        ws
    }

    #[test]
    fn migration_backfills_once() {
        let mut ws = legacy_working_set();
        let changes = migration_pass(&mut ws);
        assert!(changes.profile);
        assert_eq!(changes.subjects.len(), 1);
        let names: Vec<_> = ws.subjects[0]
            .chapters
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Rome", "Vikings", "Egypt"]);
        assert_eq!(ws.profile.migration_version, CURRENT_MIGRATION_VERSION);

        let snapshot = ws.clone();
        assert!(migration_pass(&mut ws).is_empty());
        assert_eq!(ws, snapshot);
    }

    #[test]
    fn cleanup_strips_exam_only_chapters_idempotently() {
        let mut ws = legacy_working_set();
        migration_pass(&mut ws);

        let changes = cleanup_pass(&mut ws);
        assert_eq!(changes.subjects.len(), 1);
        assert!(!ws.subjects[0].has_chapter("Vikings"));
        assert!(check_invariant(&ws).is_empty());

        assert!(cleanup_pass(&mut ws).is_empty());
    }

    #[test]
    fn repair_restores_missing_chapters_after_migration() {
        let mut ws = legacy_working_set();
        migration_pass(&mut ws);
        cleanup_pass(&mut ws);
        ws.subjects[0].remove_chapter("Egypt");
        assert!(!check_invariant(&ws).is_empty());

        let changes = repair_pass(&mut ws);
        assert_eq!(changes, ChangeSet::new().subject("s-history"));
        assert!(check_invariant(&ws).is_empty());
        assert!(repair_pass(&mut ws).is_empty());
    }

    #[test]
    fn cleanup_resolves_conflicting_flags_toward_exam_only() {
        let mut ws = legacy_working_set();
        let mut retake = Exam::new("p", "Retake", NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        retake.id = "e2".into();
        let mut sitting = ExamSubject::new("History", None);
        sitting.chapters.push(ExamChapter::new("VIKINGS", false));
        retake.subjects.push(sitting);
        ws.exams.push(retake);

        migration_pass(&mut ws);
        let changes = cleanup_pass(&mut ws);
        assert!(changes.exams.contains("e2"));
        assert!(ws.exams[1].subjects[0].chapters[0].exam_only);
        assert!(check_invariant(&ws).is_empty());
    }
}
