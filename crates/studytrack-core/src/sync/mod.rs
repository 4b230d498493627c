//! Chapter-exam synchronization.
//!
//! A subject's chapter list and the chapter lists inside exams are separate
//! records that must agree: every exam chapter that is not exam-only exists
//! in the owning subject, and every exam-only chapter does not. Each
//! operation here restores that agreement before returning.
//!
//! Names are compared trimmed and case-insensitively, for subjects as well
//! as chapters. A reference to a subject that does not exist is logged and
//! skipped; dangling exam subjects are tolerated.

pub mod invariant;
pub mod passes;
pub mod progress;

pub use invariant::{check_invariant, InvariantViolation, ViolationKind};
pub use passes::{cleanup_pass, migration_pass, repair_pass};
pub use progress::{
    advance_chapter, advance_exam_chapter, adjust_chapter_revisions,
    adjust_exam_chapter_revisions, set_exam_marks, set_task_completed, RevisionStep,
};

use tracing::{debug, warn};

use crate::model::{names_match, ExamChapter, RawChapter};
use crate::normalizer::normalize;
use crate::working_set::{ChangeSet, ProfileWorkingSet};

/// Append `chapter_name` to the subject unless it is already listed.
///
/// Safe to call redundantly: a second call with the same arguments changes
/// nothing.
pub fn sync_chapter_to_subject(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
) -> ChangeSet {
    let chapter_name = chapter_name.trim();
    if chapter_name.is_empty() {
        return ChangeSet::new();
    }
    let mode = ws.mode();
    let Some(subject) = ws.subject_mut(subject_name) else {
        warn!(
            subject = subject_name,
            chapter = chapter_name,
            "subject not found, chapter not synced"
        );
        return ChangeSet::new();
    };
    if subject.has_chapter(chapter_name) {
        return ChangeSet::new();
    }

    subject
        .chapters
        .push(normalize(RawChapter::Legacy(chapter_name.to_string()), mode));
    debug!(subject = %subject.name, chapter = chapter_name, "chapter synced to subject");
    ChangeSet::new().subject(subject.id.clone())
}

/// Whether any exam marks `(subject, chapter)` as exam-only.
pub fn is_exam_only(ws: &ProfileWorkingSet, subject_name: &str, chapter_name: &str) -> bool {
    ws.exams
        .iter()
        .flat_map(|e| &e.subjects)
        .filter(|s| s.is_for(subject_name))
        .flat_map(|s| &s.chapters)
        .any(|c| c.exam_only && names_match(&c.name, chapter_name))
}

/// Make sure the chapter a new task points at is listed in its subject.
///
/// Exam-only chapters stay out of the subject; the task keeps its reference
/// and completing it credits no subject chapter.
pub fn sync_task_chapter(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
) -> ChangeSet {
    if is_exam_only(ws, subject_name, chapter_name) {
        debug!(
            subject = subject_name,
            chapter = chapter_name,
            "chapter is exam-only, not synced for task"
        );
        return ChangeSet::new();
    }
    sync_chapter_to_subject(ws, subject_name, chapter_name)
}

/// Remove every chapter matching `chapter_name` from the subject.
pub fn remove_chapter_from_subject(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
) -> ChangeSet {
    let Some(subject) = ws.subject_mut(subject_name) else {
        warn!(
            subject = subject_name,
            chapter = chapter_name,
            "subject not found, nothing to remove"
        );
        return ChangeSet::new();
    };
    if subject.remove_chapter(chapter_name) == 0 {
        return ChangeSet::new();
    }
    debug!(subject = %subject.name, chapter = chapter_name, "chapter removed from subject");
    ChangeSet::new().subject(subject.id.clone())
}

/// Remove the chapter from every exam subject sitting for `subject_name`.
/// Other chapters and other subjects are left alone.
pub fn remove_chapter_from_exams(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
) -> ChangeSet {
    let mut changes = ChangeSet::new();
    for exam in &mut ws.exams {
        let mut touched = false;
        for sitting in exam.subjects.iter_mut().filter(|s| s.is_for(subject_name)) {
            let before = sitting.chapters.len();
            sitting.chapters.retain(|c| !names_match(&c.name, chapter_name));
            touched |= sitting.chapters.len() != before;
        }
        if touched {
            changes.exams.insert(exam.id.clone());
        }
    }
    changes
}

/// Give every exam reference to `(subject, chapter)` the same exam-only flag.
///
/// The flag describes the pair, not one exam: two exams disagreeing would
/// make the subject side impossible to satisfy.
fn align_exam_only(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
    value: bool,
) -> ChangeSet {
    let mut changes = ChangeSet::new();
    for exam in &mut ws.exams {
        let mut touched = false;
        for sitting in exam.subjects.iter_mut().filter(|s| s.is_for(subject_name)) {
            for chapter in sitting
                .chapters
                .iter_mut()
                .filter(|c| names_match(&c.name, chapter_name) && c.exam_only != value)
            {
                chapter.exam_only = value;
                touched = true;
            }
        }
        if touched {
            changes.exams.insert(exam.id.clone());
        }
    }
    changes
}

/// Apply the subject side of an exam-only flag.
fn apply_exam_only(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
    value: bool,
) -> ChangeSet {
    let mut changes = align_exam_only(ws, subject_name, chapter_name, value);
    if value {
        changes.merge(remove_chapter_from_subject(ws, subject_name, chapter_name));
    } else {
        changes.merge(sync_chapter_to_subject(ws, subject_name, chapter_name));
    }
    changes
}

/// Resolve `(exam, subject index, chapter index)` to names.
fn exam_chapter_names(
    ws: &ProfileWorkingSet,
    exam_id: &str,
    subject_index: usize,
    chapter_index: usize,
) -> Option<(String, String)> {
    let sitting = ws.exam(exam_id)?.subjects.get(subject_index)?;
    let chapter = sitting.chapters.get(chapter_index)?;
    Some((sitting.subject.clone(), chapter.name.clone()))
}

/// Toggle an exam chapter's exam-only flag and update the subject to match:
/// `true` removes the chapter from the subject, `false` adds it back.
pub fn set_exam_only(
    ws: &mut ProfileWorkingSet,
    exam_id: &str,
    subject_index: usize,
    chapter_index: usize,
    value: bool,
) -> ChangeSet {
    let Some((subject_name, chapter_name)) =
        exam_chapter_names(ws, exam_id, subject_index, chapter_index)
    else {
        warn!(
            exam = exam_id,
            subject_index, chapter_index, "exam chapter not found, exam-only unchanged"
        );
        return ChangeSet::new();
    };
    apply_exam_only(ws, &subject_name, &chapter_name, value)
}

/// Add a chapter to the subject, clearing any exam-only flag on it.
pub fn add_chapter(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
) -> ChangeSet {
    if ws.subject(subject_name).is_none() {
        warn!(subject = subject_name, "subject not found, chapter not added");
        return ChangeSet::new();
    }
    apply_exam_only(ws, subject_name, chapter_name, false)
}

/// Delete a chapter everywhere: from the subject and from every exam.
pub fn delete_chapter(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
) -> ChangeSet {
    let mut changes = remove_chapter_from_subject(ws, subject_name, chapter_name);
    changes.merge(remove_chapter_from_exams(ws, subject_name, chapter_name));
    changes
}

/// Add a chapter to one exam subject.
///
/// Adding a chapter the sitting already lists only re-applies the exam-only
/// flag. The subject side is updated either way.
pub fn add_exam_chapter(
    ws: &mut ProfileWorkingSet,
    exam_id: &str,
    subject_index: usize,
    chapter_name: &str,
    exam_only: bool,
) -> ChangeSet {
    let chapter_name = chapter_name.trim();
    let Some(exam) = ws.exam_mut(exam_id) else {
        warn!(exam = exam_id, "exam not found, chapter not added");
        return ChangeSet::new();
    };
    let Some(sitting) = exam.subjects.get_mut(subject_index) else {
        warn!(exam = exam_id, subject_index, "exam subject not found, chapter not added");
        return ChangeSet::new();
    };

    let mut changes = ChangeSet::new();
    if !sitting.chapters.iter().any(|c| names_match(&c.name, chapter_name)) {
        sitting.chapters.push(ExamChapter::new(chapter_name, exam_only));
        changes.exams.insert(exam.id.clone());
    }
    let subject_name = sitting.subject.clone();
    changes.merge(apply_exam_only(ws, &subject_name, chapter_name, exam_only));
    changes
}

/// Drop one chapter from one exam subject. The owning subject keeps its copy.
pub fn remove_exam_chapter(
    ws: &mut ProfileWorkingSet,
    exam_id: &str,
    subject_index: usize,
    chapter_index: usize,
) -> ChangeSet {
    let Some(exam) = ws.exam_mut(exam_id) else {
        warn!(exam = exam_id, "exam not found, nothing to remove");
        return ChangeSet::new();
    };
    match exam.subjects.get_mut(subject_index) {
        Some(sitting) if chapter_index < sitting.chapters.len() => {
            sitting.chapters.remove(chapter_index);
            ChangeSet::new().exam(exam.id.clone())
        }
        _ => {
            warn!(
                exam = exam_id,
                subject_index, chapter_index, "exam chapter not found, nothing to remove"
            );
            ChangeSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Exam, ExamSubject, Profile, Subject, TrackingMode};
    use chrono::NaiveDate;

    fn working_set() -> ProfileWorkingSet {
        let mut profile = Profile::new("Mia", "6", TrackingMode::Simple);
        profile.id = "p1".into();
        let mut ws = ProfileWorkingSet::new(profile);
        let mut maths = Subject::new("p1", "Maths");
        maths.id = "s-maths".into();
        ws.subjects.push(maths);

        let mut exam = Exam::new("p1", "Midterm", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        exam.id = "e1".into();
        exam.subjects.push(ExamSubject::new("maths", None));
        ws.exams.push(exam);
        ws
    }

    #[test]
    fn sync_is_idempotent_and_case_insensitive() {
        let mut ws = working_set();
        let first = sync_chapter_to_subject(&mut ws, "MATHS", "Algebra");
        assert_eq!(first, ChangeSet::new().subject("s-maths"));
        assert!(sync_chapter_to_subject(&mut ws, "maths", "algebra").is_empty());
        assert_eq!(ws.subject("Maths").unwrap().chapters.len(), 1);
    }

    #[test]
    fn task_sync_skips_exam_only_chapters() {
        let mut ws = working_set();
        add_exam_chapter(&mut ws, "e1", 0, "Statistics", true);
        assert!(is_exam_only(&ws, "MATHS", "statistics"));

        assert!(sync_task_chapter(&mut ws, "Maths", "Statistics").is_empty());
        assert!(!ws.subject("Maths").unwrap().has_chapter("Statistics"));
        assert!(check_invariant(&ws).is_empty());

        let changes = sync_task_chapter(&mut ws, "Maths", "Probability");
        assert_eq!(changes, ChangeSet::new().subject("s-maths"));
    }

    #[test]
    fn sync_to_missing_subject_is_a_no_op() {
        let mut ws = working_set();
        assert!(sync_chapter_to_subject(&mut ws, "History", "Rome").is_empty());
        assert!(remove_chapter_from_subject(&mut ws, "History", "Rome").is_empty());
    }

    #[test]
    fn remove_from_exams_leaves_other_chapters() {
        let mut ws = working_set();
        add_exam_chapter(&mut ws, "e1", 0, "Algebra", false);
        add_exam_chapter(&mut ws, "e1", 0, "Geometry", false);

        let changes = remove_chapter_from_exams(&mut ws, "Maths", "ALGEBRA");
        assert_eq!(changes, ChangeSet::new().exam("e1"));
        let names: Vec<_> = ws.exams[0].subjects[0]
            .chapters
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Geometry"]);
        assert!(remove_chapter_from_exams(&mut ws, "Maths", "Algebra").is_empty());
    }

    #[test]
    fn exam_only_toggle_moves_chapter_in_and_out_of_subject() {
        let mut ws = working_set();
        add_exam_chapter(&mut ws, "e1", 0, "Trigonometry", false);
        assert!(ws.subject("Maths").unwrap().has_chapter("Trigonometry"));

        let changes = set_exam_only(&mut ws, "e1", 0, 0, true);
        assert!(changes.subjects.contains("s-maths"));
        assert!(changes.exams.contains("e1"));
        assert!(!ws.subject("Maths").unwrap().has_chapter("Trigonometry"));
        assert!(check_invariant(&ws).is_empty());

        set_exam_only(&mut ws, "e1", 0, 0, false);
        assert!(ws.subject("Maths").unwrap().has_chapter("Trigonometry"));
        assert!(check_invariant(&ws).is_empty());
    }

    #[test]
    fn exam_only_flag_is_shared_across_exams() {
        let mut ws = working_set();
        let mut finals = Exam::new("p1", "Finals", NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        finals.id = "e2".into();
        finals.subjects.push(ExamSubject::new("Maths", None));
        ws.exams.push(finals);

        add_exam_chapter(&mut ws, "e1", 0, "Probability", false);
        add_exam_chapter(&mut ws, "e2", 0, "Probability", false);
        set_exam_only(&mut ws, "e2", 0, 0, true);

        assert!(ws.exams[0].subjects[0].chapters[0].exam_only);
        assert!(check_invariant(&ws).is_empty());
    }

    #[test]
    fn add_chapter_clears_exam_only_references() {
        let mut ws = working_set();
        add_exam_chapter(&mut ws, "e1", 0, "Statistics", true);
        assert!(!ws.subject("Maths").unwrap().has_chapter("Statistics"));

        add_chapter(&mut ws, "Maths", "Statistics");
        assert!(ws.subject("Maths").unwrap().has_chapter("Statistics"));
        assert!(!ws.exams[0].subjects[0].chapters[0].exam_only);
        assert!(check_invariant(&ws).is_empty());
    }

    #[test]
    fn bad_indices_are_no_ops() {
        let mut ws = working_set();
        assert!(set_exam_only(&mut ws, "e1", 3, 0, true).is_empty());
        assert!(set_exam_only(&mut ws, "nope", 0, 0, true).is_empty());
        assert!(remove_exam_chapter(&mut ws, "e1", 0, 9).is_empty());
        assert!(add_exam_chapter(&mut ws, "e1", 5, "X", false).is_empty());
    }

    #[test]
    fn delete_chapter_removes_everywhere() {
        let mut ws = working_set();
        add_exam_chapter(&mut ws, "e1", 0, "Sets", false);
        let changes = delete_chapter(&mut ws, "maths", "sets");
        assert_eq!(changes, ChangeSet::new().subject("s-maths").exam("e1"));
        assert!(ws.exams[0].subjects[0].chapters.is_empty());
        assert!(ws.subject("Maths").unwrap().chapters.is_empty());
    }

    #[test]
    fn removing_exam_chapter_keeps_subject_copy() {
        let mut ws = working_set();
        add_exam_chapter(&mut ws, "e1", 0, "Vectors", false);
        let changes = remove_exam_chapter(&mut ws, "e1", 0, 0);
        assert_eq!(changes, ChangeSet::new().exam("e1"));
        assert!(ws.subject("Maths").unwrap().has_chapter("Vectors"));
    }
}
