//! Task commands.

use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::json;
use studytrack_core::NewTask;

use super::{open_store, open_tracker, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Plan a study task
    Add {
        /// What to do
        activity: String,
        /// Planned minutes
        #[arg(long)]
        duration: i64,
        /// Subject studied
        #[arg(long)]
        subject: Option<String>,
        /// Chapter studied (requires --subject)
        #[arg(long)]
        chapter: Option<String>,
        /// Day to plan for (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Free-form task type
        #[arg(long = "type")]
        task_type: Option<String>,
    },
    /// List tasks
    List {
        /// Only tasks on this day
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mark a task complete
    Complete {
        /// Task ID
        id: String,
    },
    /// Mark a completed task as not done
    Reopen {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction, ctx: &Context) -> CmdResult {
    let store = open_store()?;
    let mut tracker = open_tracker(&store, ctx)?;
    match action {
        TaskAction::Add {
            activity,
            duration,
            subject,
            chapter,
            date,
            task_type,
        } => {
            let task = tracker.add_task(NewTask {
                activity,
                subject,
                chapter,
                duration,
                date,
                task_type,
            })?;
            print_json(&task)?;
        }
        TaskAction::List { date } => {
            let tasks: Vec<_> = tracker
                .working_set()
                .tasks
                .iter()
                .filter(|t| date.map_or(true, |d| t.date == d))
                .collect();
            print_json(&tasks)?;
        }
        TaskAction::Complete { id } => {
            print_json(&tracker.set_task_completed(&id, true)?)?;
        }
        TaskAction::Reopen { id } => {
            print_json(&tracker.set_task_completed(&id, false)?)?;
        }
        TaskAction::Delete { id } => {
            let removed = tracker.delete_task(&id)?;
            print_json(&json!({ "removed": removed }))?;
        }
    }
    Ok(())
}
