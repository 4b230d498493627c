use clap::Subcommand;
use serde_json::json;

use super::{open_store, open_tracker, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum SubjectAction {
    /// Add a subject
    Add {
        /// Subject name (unique, case-insensitive)
        name: String,
    },
    /// List subjects with their chapters
    List,
    /// Remove a subject
    Remove {
        /// Subject name
        name: String,
    },
}

pub fn run(action: SubjectAction, ctx: &Context) -> CmdResult {
    let store = open_store()?;
    let mut tracker = open_tracker(&store, ctx)?;
    match action {
        SubjectAction::Add { name } => {
            let subject = tracker.add_subject(&name)?;
            print_json(&subject)?;
        }
        SubjectAction::List => {
            let rows: Vec<_> = tracker
                .working_set()
                .subjects
                .iter()
                .map(|s| json!({ "progress": s.progress_percent(), "subject": s }))
                .collect();
            print_json(&rows)?;
        }
        SubjectAction::Remove { name } => {
            let removed = tracker.remove_subject(&name)?;
            print_json(&json!({ "removed": removed }))?;
        }
    }
    Ok(())
}
