//! One-time and weekly recurring reminders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub profile_id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

impl Reminder {
    pub fn new(profile_id: impl Into<String>, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile_id.into(),
            title: title.into(),
            date,
            description: String::new(),
        }
    }
}

/// Weekly reminder. `days` holds weekdays with 0 = Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringReminder {
    pub id: String,
    pub profile_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Start time, `HH:MM`.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub days: BTreeSet<u8>,
}

impl RecurringReminder {
    pub fn new(
        profile_id: impl Into<String>,
        title: impl Into<String>,
        time: impl Into<String>,
        days: impl IntoIterator<Item = u8>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile_id.into(),
            title: title.into(),
            description: String::new(),
            time: time.into(),
            end_time: None,
            days: days.into_iter().collect(),
        }
    }
}
