//! Points, streaks and badges.
//!
//! Everything here is a pure read-side computation over a profile's
//! snapshot. Nothing is persisted: badge unlock state and point totals are
//! recomputed from the current tasks and exams each time they are shown.

pub mod badges;
pub mod points;
pub mod stats;

pub use badges::{unlocked_badges, BadgeDefinition, BadgeTier, UnlockedBadge, BADGES};
pub use points::{completion_rate, points, streak, PointsBreakdown, Scoreboard};
pub use stats::Stats;
