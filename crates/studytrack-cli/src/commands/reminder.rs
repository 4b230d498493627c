use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::json;
use studytrack_core::NewRecurringReminder;

use super::{open_store, open_tracker, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Add a one-time reminder
    Add {
        title: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Add a weekly reminder
    Recurring {
        title: String,
        /// Start time, HH:MM
        #[arg(long)]
        time: String,
        /// End time, HH:MM
        #[arg(long)]
        end_time: Option<String>,
        /// Comma-separated weekdays, 0 = Sunday
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<u8>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List stored reminders
    List,
    /// Delete a reminder of either kind
    Delete {
        /// Reminder ID
        id: String,
    },
    /// Show the prioritized reminder feed
    Feed,
}

pub fn run(action: ReminderAction, ctx: &Context) -> CmdResult {
    let store = open_store()?;
    let mut tracker = open_tracker(&store, ctx)?;
    match action {
        ReminderAction::Add {
            title,
            date,
            description,
        } => {
            print_json(&tracker.add_reminder(&title, date, &description)?)?;
        }
        ReminderAction::Recurring {
            title,
            time,
            end_time,
            days,
            description,
        } => {
            let reminder = tracker.add_recurring_reminder(NewRecurringReminder {
                title,
                description,
                time,
                end_time,
                days,
            })?;
            print_json(&reminder)?;
        }
        ReminderAction::List => {
            let ws = tracker.working_set();
            print_json(&json!({
                "oneTime": ws.reminders,
                "recurring": ws.recurring_reminders,
            }))?;
        }
        ReminderAction::Delete { id } => {
            let removed = tracker.delete_reminder(&id)?;
            print_json(&json!({ "removed": removed }))?;
        }
        ReminderAction::Feed => {
            print_json(&tracker.feed())?;
        }
    }
    Ok(())
}
