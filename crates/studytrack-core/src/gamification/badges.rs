//! Badge catalog.
//!
//! Badges are definitions, not records. A badge is unlocked exactly when its
//! predicate holds for the current [`Stats`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::stats::Stats;

/// Rarity class of a badge, which fixes its point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTier {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl BadgeTier {
    pub fn points(&self) -> u64 {
        match self {
            BadgeTier::Common => 50,
            BadgeTier::Rare => 100,
            BadgeTier::Epic => 200,
            BadgeTier::Legendary => 500,
        }
    }
}

impl fmt::Display for BadgeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BadgeTier::Common => "common",
            BadgeTier::Rare => "rare",
            BadgeTier::Epic => "epic",
            BadgeTier::Legendary => "legendary",
        };
        f.write_str(s)
    }
}

pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub tier: BadgeTier,
    pub category: &'static str,
    pub predicate: fn(&Stats) -> bool,
}

impl BadgeDefinition {
    pub fn is_unlocked(&self, stats: &Stats) -> bool {
        (self.predicate)(stats)
    }
}

impl fmt::Debug for BadgeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BadgeDefinition")
            .field("id", &self.id)
            .field("tier", &self.tier)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

pub static BADGES: &[BadgeDefinition] = &[
    BadgeDefinition {
        id: "first_steps",
        name: "First Steps",
        tier: BadgeTier::Common,
        category: "daily",
        predicate: |s| s.completed_today >= 1,
    },
    BadgeDefinition {
        id: "half_hour_hero",
        name: "Half Hour Hero",
        tier: BadgeTier::Common,
        category: "time",
        predicate: |s| s.study_minutes_today >= 30,
    },
    BadgeDefinition {
        id: "hour_of_power",
        name: "Hour of Power",
        tier: BadgeTier::Rare,
        category: "time",
        predicate: |s| s.study_minutes_today >= 60,
    },
    BadgeDefinition {
        id: "task_crusher",
        name: "Task Crusher",
        tier: BadgeTier::Epic,
        category: "daily",
        predicate: |s| s.completed_today >= 5,
    },
    BadgeDefinition {
        id: "weekly_warrior",
        name: "Weekly Warrior",
        tier: BadgeTier::Rare,
        category: "week",
        predicate: |s| s.study_minutes_week >= 300,
    },
    BadgeDefinition {
        id: "marathon_week",
        name: "Marathon Week",
        tier: BadgeTier::Epic,
        category: "week",
        predicate: |s| s.study_minutes_week >= 600,
    },
    BadgeDefinition {
        id: "explorer",
        name: "Explorer",
        tier: BadgeTier::Common,
        category: "subjects",
        predicate: |s| s.total_subjects >= 3,
    },
    BadgeDefinition {
        id: "polymath",
        name: "Polymath",
        tier: BadgeTier::Rare,
        category: "subjects",
        predicate: |s| s.total_subjects >= 6,
    },
    BadgeDefinition {
        id: "halfway_there",
        name: "Halfway There",
        tier: BadgeTier::Common,
        category: "completion",
        predicate: |s| s.completion_rate >= 50,
    },
    BadgeDefinition {
        id: "perfectionist",
        name: "Perfectionist",
        tier: BadgeTier::Legendary,
        category: "completion",
        predicate: |s| s.completion_rate >= 100,
    },
];

/// Catalog entries whose predicate holds for `stats`, in catalog order.
pub fn unlocked_badges(stats: &Stats) -> Vec<&'static BadgeDefinition> {
    BADGES.iter().filter(|b| b.is_unlocked(stats)).collect()
}

/// Serializable view of an unlocked badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockedBadge {
    pub id: &'static str,
    pub name: &'static str,
    pub tier: BadgeTier,
    pub category: &'static str,
    pub points: u64,
}

impl From<&BadgeDefinition> for UnlockedBadge {
    fn from(def: &BadgeDefinition) -> Self {
        Self {
            id: def.id,
            name: def.name,
            tier: def.tier,
            category: def.category,
            points: def.tier.points(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_are_unique() {
        let ids: HashSet<_> = BADGES.iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), BADGES.len());
    }

    #[test]
    fn test_nothing_unlocked_for_empty_stats() {
        assert!(unlocked_badges(&Stats::default()).is_empty());
    }

    #[test]
    fn test_unlock_follows_stats() {
        let stats = Stats {
            study_minutes_today: 45,
            study_minutes_week: 320,
            total_subjects: 3,
            completion_rate: 60,
            completed_today: 2,
        };
        let ids: Vec<_> = unlocked_badges(&stats).iter().map(|b| b.id).collect();
        assert_eq!(
            ids,
            vec!["first_steps", "half_hour_hero", "weekly_warrior", "explorer", "halfway_there"]
        );

        // Dropping below a threshold relocks without any stored state.
        let quieter = Stats {
            study_minutes_today: 10,
            ..stats
        };
        assert!(!unlocked_badges(&quieter).iter().any(|b| b.id == "half_hour_hero"));
    }

    #[test]
    fn test_tier_points() {
        let total: u64 = [BadgeTier::Common, BadgeTier::Rare, BadgeTier::Epic, BadgeTier::Legendary]
            .iter()
            .map(BadgeTier::points)
            .sum();
        assert_eq!(total, 850);
    }
}
