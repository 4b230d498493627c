//! Study statistics snapshot used by badge predicates.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::points::completion_rate;
use crate::model::StudyTask;

/// Snapshot of a profile's recent study activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Minutes of completed tasks dated today.
    pub study_minutes_today: u64,
    /// Minutes of completed tasks in the Sunday-start week containing today.
    pub study_minutes_week: u64,
    pub total_subjects: usize,
    /// Whole percentage of all tasks that are completed.
    pub completion_rate: u32,
    /// Completed tasks dated today.
    pub completed_today: usize,
}

/// First day (Sunday) of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

impl Stats {
    pub fn from_tasks(tasks: &[StudyTask], total_subjects: usize, today: NaiveDate) -> Self {
        let start = week_start(today);
        let end = start.checked_add_days(Days::new(6)).unwrap_or(start);

        let mut stats = Stats {
            total_subjects,
            completion_rate: completion_rate(tasks),
            ..Stats::default()
        };
        for task in tasks.iter().filter(|t| t.completed) {
            let minutes = u64::from(task.duration);
            if task.date == today {
                stats.study_minutes_today += minutes;
                stats.completed_today += 1;
            }
            if (start..=end).contains(&task.date) {
                stats.study_minutes_week += minutes;
            }
        }
        stats
    }
}
