use clap::Subcommand;
use studytrack_core::{RevisionStep, TrackingMode};

use super::{open_store, open_tracker, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ChapterAction {
    /// Add a chapter to a subject
    Add { subject: String, chapter: String },
    /// Remove a chapter from a subject and from every exam
    Remove { subject: String, chapter: String },
    /// Move a chapter to its next status (comprehensive mode)
    Cycle { subject: String, chapter: String },
    /// Mark a chapter done or not done (simple mode)
    Toggle { subject: String, chapter: String },
    /// Record a revision (comprehensive mode)
    Revise {
        subject: String,
        chapter: String,
        /// Take one revision back instead
        #[arg(long)]
        undo: bool,
    },
}

pub fn run(action: ChapterAction, ctx: &Context) -> CmdResult {
    let store = open_store()?;
    let mut tracker = open_tracker(&store, ctx)?;
    let mode = tracker.working_set().mode();
    let changes = match action {
        ChapterAction::Add { subject, chapter } => tracker.add_chapter(&subject, &chapter)?,
        ChapterAction::Remove { subject, chapter } => tracker.delete_chapter(&subject, &chapter)?,
        ChapterAction::Cycle { subject, chapter } => {
            if mode != TrackingMode::Comprehensive {
                return Err("`chapter cycle` needs comprehensive mode; use `chapter toggle`".into());
            }
            tracker.advance_chapter(&subject, &chapter)?
        }
        ChapterAction::Toggle { subject, chapter } => {
            if mode != TrackingMode::Simple {
                return Err("`chapter toggle` needs simple mode; use `chapter cycle`".into());
            }
            tracker.advance_chapter(&subject, &chapter)?
        }
        ChapterAction::Revise {
            subject,
            chapter,
            undo,
        } => {
            let step = if undo {
                RevisionStep::Decrement
            } else {
                RevisionStep::Increment
            };
            tracker.adjust_chapter_revisions(&subject, &chapter, step)?
        }
    };
    print_json(&changes)
}
