//! Child profile record.

use serde::{Deserialize, Serialize};

use super::chapter::TrackingMode;

/// Version the exam-to-subject migration pass brings a profile to.
pub const CURRENT_MIGRATION_VERSION: u32 = 1;

/// One child whose study progress is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// School class or grade, free text.
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub tracking_mode: TrackingMode,
    /// Highest data migration applied to this profile's records.
    #[serde(default)]
    pub migration_version: u32,
}

impl Profile {
    pub fn new(name: impl Into<String>, class: impl Into<String>, mode: TrackingMode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            class: class.into(),
            tracking_mode: mode,
            migration_version: 0,
        }
    }

    pub fn needs_migration(&self) -> bool {
        self.migration_version < CURRENT_MIGRATION_VERSION
    }
}
