use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::json;
use studytrack_core::RevisionStep;

use super::{open_store, open_tracker, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ExamAction {
    /// Create an exam
    Create {
        /// Exam name
        name: String,
        /// Exam date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// List exams
    List,
    /// Delete an exam
    Delete {
        /// Exam ID
        id: String,
    },
    /// Add a subject sitting to an exam
    AddSubject {
        /// Exam ID
        exam: String,
        /// Subject name
        subject: String,
        /// Sitting date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Add a chapter to an exam subject
    AddChapter {
        exam: String,
        /// Position of the subject in the exam (0-based)
        subject_index: usize,
        chapter: String,
        /// Keep the chapter out of the subject's own chapter list
        #[arg(long)]
        exam_only: bool,
    },
    /// Remove a chapter from an exam subject
    RemoveChapter {
        exam: String,
        subject_index: usize,
        chapter_index: usize,
    },
    /// Set or clear a chapter's exam-only flag
    ExamOnly {
        exam: String,
        subject_index: usize,
        chapter_index: usize,
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Move an exam chapter to its next status
    Cycle {
        exam: String,
        subject_index: usize,
        chapter_index: usize,
    },
    /// Record a revision on an exam chapter
    Revise {
        exam: String,
        subject_index: usize,
        chapter_index: usize,
        /// Take one revision back instead
        #[arg(long)]
        undo: bool,
    },
    /// Record marks (percent) for an exam subject; omit to clear
    Marks {
        exam: String,
        subject_index: usize,
        marks: Option<f64>,
    },
}

pub fn run(action: ExamAction, ctx: &Context) -> CmdResult {
    let store = open_store()?;
    let mut tracker = open_tracker(&store, ctx)?;
    match action {
        ExamAction::Create { name, date } => {
            let exam = tracker.add_exam(&name, date)?;
            print_json(&exam)?;
        }
        ExamAction::List => {
            print_json(&tracker.working_set().exams)?;
        }
        ExamAction::Delete { id } => {
            let removed = tracker.delete_exam(&id)?;
            print_json(&json!({ "removed": removed }))?;
        }
        ExamAction::AddSubject {
            exam,
            subject,
            date,
        } => {
            print_json(&tracker.add_exam_subject(&exam, &subject, date)?)?;
        }
        ExamAction::AddChapter {
            exam,
            subject_index,
            chapter,
            exam_only,
        } => {
            print_json(&tracker.add_exam_chapter(&exam, subject_index, &chapter, exam_only)?)?;
        }
        ExamAction::RemoveChapter {
            exam,
            subject_index,
            chapter_index,
        } => {
            print_json(&tracker.remove_exam_chapter(&exam, subject_index, chapter_index)?)?;
        }
        ExamAction::ExamOnly {
            exam,
            subject_index,
            chapter_index,
            value,
        } => {
            print_json(&tracker.set_exam_only(&exam, subject_index, chapter_index, value)?)?;
        }
        ExamAction::Cycle {
            exam,
            subject_index,
            chapter_index,
        } => {
            print_json(&tracker.advance_exam_chapter(&exam, subject_index, chapter_index)?)?;
        }
        ExamAction::Revise {
            exam,
            subject_index,
            chapter_index,
            undo,
        } => {
            let step = if undo {
                RevisionStep::Decrement
            } else {
                RevisionStep::Increment
            };
            print_json(&tracker.adjust_exam_chapter_revisions(
                &exam,
                subject_index,
                chapter_index,
                step,
            )?)?;
        }
        ExamAction::Marks {
            exam,
            subject_index,
            marks,
        } => {
            print_json(&tracker.set_exam_marks(&exam, subject_index, marks)?)?;
        }
    }
    Ok(())
}
