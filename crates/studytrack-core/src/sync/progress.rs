//! Progress updates on subject chapters, exam chapters and tasks.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::model::{ExamChapter, Revisions};
use crate::working_set::{ChangeSet, ProfileWorkingSet};

/// Direction of a revision counter change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionStep {
    Increment,
    Decrement,
}

impl RevisionStep {
    fn apply(self, revisions: &mut Revisions) -> bool {
        match self {
            RevisionStep::Increment => revisions.increment(),
            RevisionStep::Decrement => revisions.decrement(),
        }
    }
}

/// Advance a subject chapter one step (status cycle or completed toggle).
pub fn advance_chapter(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
    today: NaiveDate,
) -> ChangeSet {
    let Some(subject) = ws.subject_mut(subject_name) else {
        warn!(subject = subject_name, "subject not found, chapter not advanced");
        return ChangeSet::new();
    };
    let subject_id = subject.id.clone();
    let Some(chapter) = subject.chapter_mut(chapter_name) else {
        warn!(subject = subject_name, chapter = chapter_name, "chapter not found");
        return ChangeSet::new();
    };
    chapter.advance(today);
    ChangeSet::new().subject(subject_id)
}

/// Change a comprehensive-mode chapter's completed revisions by one.
///
/// Stepping past either bound, or targeting a simple-mode chapter, changes
/// nothing.
pub fn adjust_chapter_revisions(
    ws: &mut ProfileWorkingSet,
    subject_name: &str,
    chapter_name: &str,
    step: RevisionStep,
) -> ChangeSet {
    let Some(subject) = ws.subject_mut(subject_name) else {
        warn!(subject = subject_name, "subject not found, revisions unchanged");
        return ChangeSet::new();
    };
    let subject_id = subject.id.clone();
    let changed = subject
        .chapter_mut(chapter_name)
        .and_then(|c| c.revisions_mut())
        .is_some_and(|r| step.apply(r));
    if changed {
        ChangeSet::new().subject(subject_id)
    } else {
        ChangeSet::new()
    }
}

fn exam_chapter_mut<'a>(
    ws: &'a mut ProfileWorkingSet,
    exam_id: &str,
    subject_index: usize,
    chapter_index: usize,
) -> Option<&'a mut ExamChapter> {
    ws.exam_mut(exam_id)?
        .subjects
        .get_mut(subject_index)?
        .chapters
        .get_mut(chapter_index)
}

/// Advance an exam chapter's status one step around the cycle.
pub fn advance_exam_chapter(
    ws: &mut ProfileWorkingSet,
    exam_id: &str,
    subject_index: usize,
    chapter_index: usize,
) -> ChangeSet {
    match exam_chapter_mut(ws, exam_id, subject_index, chapter_index) {
        Some(chapter) => {
            chapter.status = chapter.status.next();
            ChangeSet::new().exam(exam_id)
        }
        None => {
            warn!(exam = exam_id, subject_index, chapter_index, "exam chapter not found");
            ChangeSet::new()
        }
    }
}

/// Change an exam chapter's completed revisions by one, within bounds.
pub fn adjust_exam_chapter_revisions(
    ws: &mut ProfileWorkingSet,
    exam_id: &str,
    subject_index: usize,
    chapter_index: usize,
    step: RevisionStep,
) -> ChangeSet {
    let changed = exam_chapter_mut(ws, exam_id, subject_index, chapter_index)
        .is_some_and(|c| step.apply(&mut c.revisions));
    if changed {
        ChangeSet::new().exam(exam_id)
    } else {
        ChangeSet::new()
    }
}

/// Record (or clear) the marks for one exam subject. Range checks are the
/// caller's job.
pub fn set_exam_marks(
    ws: &mut ProfileWorkingSet,
    exam_id: &str,
    subject_index: usize,
    marks: Option<f64>,
) -> ChangeSet {
    let Some(sitting) = ws
        .exam_mut(exam_id)
        .and_then(|e| e.subjects.get_mut(subject_index))
    else {
        warn!(exam = exam_id, subject_index, "exam subject not found, marks unchanged");
        return ChangeSet::new();
    };
    if sitting.marks == marks {
        return ChangeSet::new();
    }
    sitting.marks = marks;
    ChangeSet::new().exam(exam_id)
}

/// Mark a task complete or incomplete and keep its chapter's study counters
/// in step.
///
/// Completing credits the task's minutes to the linked chapter and stamps
/// `lastStudied`; reopening takes them back. Setting the current value again
/// is a no-op, so counters are never double-counted.
pub fn set_task_completed(ws: &mut ProfileWorkingSet, task_id: &str, completed: bool) -> ChangeSet {
    let Some(task) = ws.task_mut(task_id) else {
        warn!(task = task_id, "task not found, completion unchanged");
        return ChangeSet::new();
    };
    if task.completed == completed {
        return ChangeSet::new();
    }
    task.completed = completed;
    let (minutes, date) = (task.duration, task.date);
    let chapter_ref = task
        .chapter_ref()
        .map(|(s, c)| (s.to_string(), c.to_string()));

    let mut changes = ChangeSet::new().task(task_id);
    let Some((subject_name, chapter_name)) = chapter_ref else {
        return changes;
    };

    let Some(subject) = ws.subject_mut(&subject_name) else {
        debug!(subject = %subject_name, "task subject not found, chapter counters unchanged");
        return changes;
    };
    let subject_id = subject.id.clone();
    match subject.chapter_mut(&chapter_name) {
        Some(chapter) => {
            if completed {
                chapter.record_study(minutes, date);
            } else {
                chapter.unrecord_study(minutes);
            }
            changes.subjects.insert(subject_id);
        }
        None => {
            debug!(
                subject = %subject_name,
                chapter = %chapter_name,
                "task chapter not found, chapter counters unchanged"
            );
        }
    }
    changes
}
