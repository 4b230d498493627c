//! Streak, completion rate and point totals.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

use super::badges::{unlocked_badges, BadgeDefinition, UnlockedBadge};
use super::stats::Stats;
use crate::model::{Exam, Profile, StudyTask};
use crate::working_set::ProfileWorkingSet;

const TASK_POINTS: u64 = 10;
const STREAK_DAY_POINTS: u64 = 25;

/// Completion-rate milestones, highest first. Only the best one met counts.
const MILESTONES: [(u32, u64); 4] = [(100, 500), (90, 200), (75, 100), (50, 50)];

/// Streak bonuses. Every threshold reached counts.
const STREAK_BONUSES: [(u32, u64); 3] = [(7, 200), (14, 400), (30, 1000)];

/// Exam marks bonuses per exam subject, highest first. Only the best counts.
const MARKS_BONUSES: [(f64, u64); 3] = [(100.0, 300), (95.0, 200), (90.0, 100)];

/// Consecutive days ending at `today` with at least one completed task.
///
/// Zero when nothing was completed today, whatever happened before.
pub fn streak(tasks: &[StudyTask], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = tasks
        .iter()
        .filter(|t| t.completed)
        .map(|t| t.date)
        .collect();

    let mut count = 0;
    let mut day = today;
    while days.contains(&day) {
        count += 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }
    count
}

/// Whole percentage of tasks completed, 0 for no tasks.
pub fn completion_rate(tasks: &[StudyTask]) -> u32 {
    if tasks.is_empty() {
        return 0;
    }
    let done = tasks.iter().filter(|t| t.completed).count();
    (100.0 * done as f64 / tasks.len() as f64).round() as u32
}

fn milestone_bonus(rate: u32) -> u64 {
    MILESTONES
        .iter()
        .find(|(threshold, _)| rate >= *threshold)
        .map_or(0, |(_, bonus)| *bonus)
}

fn streak_bonus(days: u32) -> u64 {
    STREAK_BONUSES
        .iter()
        .filter(|(threshold, _)| days >= *threshold)
        .map(|(_, bonus)| bonus)
        .sum()
}

fn marks_bonus(marks: f64) -> u64 {
    MARKS_BONUSES
        .iter()
        .find(|(threshold, _)| marks >= *threshold)
        .map_or(0, |(_, bonus)| *bonus)
}

/// Points earned, split by source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsBreakdown {
    /// 10 per completed task.
    pub tasks: u64,
    /// 1 per completed minute.
    pub minutes: u64,
    pub badges: u64,
    pub milestone: u64,
    /// 25 per streak day.
    pub streak: u64,
    pub streak_bonus: u64,
    pub exams: u64,
}

impl PointsBreakdown {
    pub fn total(&self) -> u64 {
        self.tasks
            + self.minutes
            + self.badges
            + self.milestone
            + self.streak
            + self.streak_bonus
            + self.exams
    }
}

/// Score a profile.
///
/// Only tasks and exams owned by `profile` are counted. The result depends on
/// the inputs alone, not on their order.
pub fn points(
    profile: &Profile,
    tasks: &[StudyTask],
    badges: &[&BadgeDefinition],
    exams: &[Exam],
    today: NaiveDate,
) -> PointsBreakdown {
    let owned: Vec<StudyTask> = tasks
        .iter()
        .filter(|t| t.profile_id == profile.id)
        .cloned()
        .collect();

    let completed = owned.iter().filter(|t| t.completed);
    let completed_count = completed.clone().count() as u64;
    let completed_minutes: u64 = completed.map(|t| u64::from(t.duration)).sum();
    let days = streak(&owned, today);

    let exams_bonus: u64 = exams
        .iter()
        .filter(|e| e.profile_id == profile.id)
        .flat_map(|e| e.subjects.iter())
        .filter_map(|s| s.marks)
        .map(marks_bonus)
        .sum();

    PointsBreakdown {
        tasks: TASK_POINTS * completed_count,
        minutes: completed_minutes,
        badges: badges.iter().map(|b| b.tier.points()).sum(),
        milestone: milestone_bonus(completion_rate(&owned)),
        streak: STREAK_DAY_POINTS * u64::from(days),
        streak_bonus: streak_bonus(days),
        exams: exams_bonus,
    }
}

/// Everything the progress screen shows, computed in one go.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoreboard {
    pub today: NaiveDate,
    pub stats: Stats,
    pub streak: u32,
    pub badges: Vec<UnlockedBadge>,
    pub points: PointsBreakdown,
    pub total_points: u64,
}

impl Scoreboard {
    pub fn compute(ws: &ProfileWorkingSet, today: NaiveDate) -> Self {
        let stats = Stats::from_tasks(&ws.tasks, ws.subjects.len(), today);
        let unlocked = unlocked_badges(&stats);
        let points = points(&ws.profile, &ws.tasks, &unlocked, &ws.exams, today);
        Self {
            today,
            stats,
            streak: streak(&ws.tasks, today),
            badges: unlocked.into_iter().map(UnlockedBadge::from).collect(),
            total_points: points.total(),
            points,
        }
    }
}
