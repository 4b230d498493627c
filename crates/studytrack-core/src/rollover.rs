//! Day-boundary rollover for unfinished study tasks.
//!
//! Runs once when a profile is activated. Every task planned for an earlier
//! day that is still open is moved to today and its carry-over counter is
//! bumped, so a child sees yesterday's leftovers on today's list.
//!
//! # Usage
//! ```rust,ignore
//! use studytrack_core::rollover::rollover;
//!
//! let outcome = rollover(&mut ws.tasks, today);
//! for id in &outcome.moved { /* persist task `id` */ }
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::model::StudyTask;
use crate::working_set::ChangeSet;

/// Tasks moved by one rollover run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RolloverOutcome {
    /// Ids of moved tasks, in list order.
    pub moved: Vec<String>,
}

impl RolloverOutcome {
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
    }

    /// The moved tasks as records to persist.
    pub fn changes(&self) -> ChangeSet {
        self.moved
            .iter()
            .fold(ChangeSet::new(), |changes, id| changes.task(id.as_str()))
    }
}

/// Whether `task` is an open task from before `today`.
pub fn is_overdue(task: &StudyTask, today: NaiveDate) -> bool {
    !task.completed && task.date < today
}

/// Move every overdue incomplete task to `today`.
///
/// Completed tasks and tasks dated today or later are left untouched. A
/// second run on the same day moves nothing.
pub fn rollover(tasks: &mut [StudyTask], today: NaiveDate) -> RolloverOutcome {
    let mut outcome = RolloverOutcome::default();
    for task in tasks.iter_mut().filter(|t| is_overdue(t, today)) {
        task.date = today;
        task.carryover_days = task.carryover_days.saturating_add(1);
        outcome.moved.push(task.id.clone());
    }
    if !outcome.is_empty() {
        info!(moved = outcome.moved.len(), %today, "rolled over unfinished tasks");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn task(id: &str, date: NaiveDate, completed: bool) -> StudyTask {
        let mut t = StudyTask::new("p", "Practice", 25, date);
        t.id = id.into();
        t.completed = completed;
        t
    }

    #[test]
    fn test_moves_only_open_past_tasks() {
        let mut tasks = vec![
            task("old-open", day(8), false),
            task("old-done", day(8), true),
            task("today", day(10), false),
            task("future", day(12), false),
        ];
        let before = tasks.clone();

        let outcome = rollover(&mut tasks, day(10));
        assert_eq!(outcome.moved, vec!["old-open".to_string()]);
        assert_eq!(tasks[0].date, day(10));
        assert_eq!(tasks[0].carryover_days, 1);
        assert_eq!(&tasks[1..], &before[1..]);
    }

    #[test]
    fn test_carryover_accumulates_across_days() {
        let mut tasks = vec![task("t", day(1), false)];
        rollover(&mut tasks, day(2));
        rollover(&mut tasks, day(5));
        assert_eq!(tasks[0].date, day(5));
        assert_eq!(tasks[0].carryover_days, 2);
    }

    #[test]
    fn test_second_run_same_day_is_noop() {
        let mut tasks = vec![task("a", day(3), false), task("b", day(4), false)];
        assert_eq!(rollover(&mut tasks, day(6)).moved.len(), 2);
        assert!(rollover(&mut tasks, day(6)).is_empty());
    }

    #[test]
    fn test_outcome_change_set() {
        let outcome = RolloverOutcome {
            moved: vec!["a".into(), "b".into()],
        };
        assert_eq!(outcome.changes(), ChangeSet::new().task("a").task("b"));
    }
}
