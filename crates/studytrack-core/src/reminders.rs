//! Reminder feed.
//!
//! Merges one-time and weekly recurring reminders into a single list tagged
//! by urgency:
//! - `today`: due today (or a recurring reminder whose weekday is today)
//! - `urgent`: due within the urgent window (default 7 days)
//! - `normal`: everything later
//!
//! Past one-time reminders are dropped. Ordering is total: today items
//! first, then by days until due, then by the due date string.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{RecurringReminder, Reminder};

/// Urgency bucket of a feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderPriority {
    Today,
    Urgent,
    Normal,
}

/// Where a feed item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderSource {
    OneTime,
    Recurring,
}

/// One entry of the prioritized feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderItem {
    pub id: String,
    pub source: ReminderSource,
    pub title: String,
    pub description: String,
    pub display_date: NaiveDate,
    pub days_until: i64,
    pub is_today: bool,
    pub priority: ReminderPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// Weekday index with 0 = Sunday, matching `RecurringReminder::days`.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Days from `now_weekday` to the next listed weekday, 0 when today is listed.
///
/// Returns `None` for an empty day set.
pub fn days_until_next(days: &std::collections::BTreeSet<u8>, now_weekday: u8) -> Option<i64> {
    let first = *days.first()?;
    let until = match days.range(now_weekday..).next() {
        Some(&day) => day - now_weekday,
        None => 7 - now_weekday + first,
    };
    Some(i64::from(until))
}

/// Builds the reminder feed.
#[derive(Debug, Clone)]
pub struct ReminderPrioritizer {
    urgent_within_days: i64,
}

impl Default for ReminderPrioritizer {
    fn default() -> Self {
        Self {
            urgent_within_days: 7,
        }
    }
}

impl ReminderPrioritizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many days ahead still counts as urgent.
    pub fn with_urgent_window(mut self, days: i64) -> Self {
        self.urgent_within_days = days;
        self
    }

    fn priority(&self, is_today: bool, days_until: i64) -> ReminderPriority {
        if is_today {
            ReminderPriority::Today
        } else if days_until <= self.urgent_within_days {
            ReminderPriority::Urgent
        } else {
            ReminderPriority::Normal
        }
    }

    fn one_time_item(&self, reminder: &Reminder, today: NaiveDate) -> Option<ReminderItem> {
        if reminder.date < today {
            return None;
        }
        let days_until = (reminder.date - today).num_days();
        let is_today = days_until == 0;
        Some(ReminderItem {
            id: reminder.id.clone(),
            source: ReminderSource::OneTime,
            title: reminder.title.clone(),
            description: reminder.description.clone(),
            display_date: reminder.date,
            days_until,
            is_today,
            priority: self.priority(is_today, days_until),
            time: None,
            end_time: None,
        })
    }

    fn recurring_item(
        &self,
        reminder: &RecurringReminder,
        today: NaiveDate,
        now_weekday: u8,
    ) -> Option<ReminderItem> {
        let days_until = days_until_next(&reminder.days, now_weekday)?;
        let is_today = reminder.days.contains(&now_weekday);
        let display_date = today.checked_add_days(Days::new(days_until.unsigned_abs()))?;
        Some(ReminderItem {
            id: reminder.id.clone(),
            source: ReminderSource::Recurring,
            title: reminder.title.clone(),
            description: reminder.description.clone(),
            display_date,
            days_until,
            is_today,
            priority: self.priority(is_today, days_until),
            time: (!reminder.time.is_empty()).then(|| reminder.time.clone()),
            end_time: reminder.end_time.clone(),
        })
    }

    /// Merge and order both reminder kinds relative to `today`.
    ///
    /// `now_weekday` is the weekday of `today` (0 = Sunday). Recurring
    /// reminders with no days never appear.
    pub fn prioritize(
        &self,
        one_time: &[Reminder],
        recurring: &[RecurringReminder],
        today: NaiveDate,
        now_weekday: u8,
    ) -> Vec<ReminderItem> {
        let mut items: Vec<ReminderItem> = one_time
            .iter()
            .filter_map(|r| self.one_time_item(r, today))
            .chain(
                recurring
                    .iter()
                    .filter_map(|r| self.recurring_item(r, today, now_weekday)),
            )
            .collect();

        items.sort_by(|a, b| {
            b.is_today
                .cmp(&a.is_today)
                .then(a.days_until.cmp(&b.days_until))
                .then_with(|| a.display_date.to_string().cmp(&b.display_date.to_string()))
        });
        items
    }
}

/// Prioritize with the default urgent window.
pub fn prioritize(
    one_time: &[Reminder],
    recurring: &[RecurringReminder],
    today: NaiveDate,
    now_weekday: u8,
) -> Vec<ReminderItem> {
    ReminderPrioritizer::default().prioritize(one_time, recurring, today, now_weekday)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    // 2024-06-12 is a Wednesday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
    }

    fn one_time(title: &str, offset: i64) -> Reminder {
        let date = today() + chrono::Duration::days(offset);
        Reminder::new("p", title, date)
    }

    fn weekly(title: &str, days: &[u8]) -> RecurringReminder {
        RecurringReminder::new("p", title, "16:00", days.iter().copied())
    }

    #[test]
    fn test_weekday_index_starts_on_sunday() {
        assert_eq!(weekday_index(today()), 3);
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2024, 6, 9).unwrap()), 0);
    }

    #[test]
    fn test_days_until_next_wraps() {
        let days: BTreeSet<u8> = [1, 5].into();
        assert_eq!(days_until_next(&days, 3), Some(2));
        assert_eq!(days_until_next(&days, 5), Some(0));
        assert_eq!(days_until_next(&days, 6), Some(2));
        assert_eq!(days_until_next(&BTreeSet::new(), 2), None);
    }

    #[test]
    fn test_today_items_precede_everything() {
        let items = prioritize(
            &[one_time("far", 10), one_time("now", 0), one_time("gone", -1)],
            &[weekly("piano", &[3])],
            today(),
            weekday_index(today()),
        );
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["now", "piano", "far"]);
        assert_eq!(items[0].priority, ReminderPriority::Today);
        assert_eq!(items[1].priority, ReminderPriority::Today);
        assert_eq!(items[2].priority, ReminderPriority::Normal);
        assert_eq!(items[1].time.as_deref(), Some("16:00"));
    }

    #[test]
    fn test_urgent_window_boundary() {
        let items = prioritize(&[one_time("a", 7), one_time("b", 8)], &[], today(), 3);
        assert_eq!(items[0].priority, ReminderPriority::Urgent);
        assert_eq!(items[1].priority, ReminderPriority::Normal);

        let narrow = ReminderPrioritizer::new().with_urgent_window(2);
        let items = narrow.prioritize(&[one_time("a", 3)], &[], today(), 3);
        assert_eq!(items[0].priority, ReminderPriority::Normal);
    }

    #[test]
    fn test_recurring_next_occurrence() {
        let items = prioritize(&[], &[weekly("swim", &[1]), weekly("none", &[])], today(), 3);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].days_until, 5);
        assert!(!items[0].is_today);
        assert_eq!(items[0].display_date, NaiveDate::from_ymd_opt(2024, 6, 17).unwrap());
    }

    #[test]
    fn test_order_ignores_input_order() {
        let one = [one_time("x", 2), one_time("y", 0), one_time("z", 9)];
        let rec = [weekly("w", &[3, 4])];
        let forward = prioritize(&one, &rec, today(), 3);
        let mut reversed_input = one.to_vec();
        reversed_input.reverse();
        let backward = prioritize(&reversed_input, &rec, today(), 3);
        let ids = |v: &[ReminderItem]| v.iter().map(|i| i.title.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&forward)[3], "z");
        assert!(forward[..2].iter().all(|i| i.is_today));
        assert!(backward[..2].iter().all(|i| i.is_today));
        assert_eq!(ids(&forward)[2..], ids(&backward)[2..]);
    }
}
