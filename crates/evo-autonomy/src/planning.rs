//! Sprint planning stage
//!
//! Capacity planning, story point refinement and sprint organization.
//! Organizers order candidates by priority rank, then feasibility
//! descending; they differ in what they commit.

use crate::error::IterationError;
use crate::feasibility::FeasibilityAssessment;
use crate::proposals::{FeatureProposals, Priority};
use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Story point scale estimates snap to
pub const FIBONACCI_POINTS: [u32; 7] = [1, 2, 3, 5, 8, 13, 21];

/// Working days in one sprint
pub const SPRINT_WORKING_DAYS: u32 = 10;

/// Calendar days from first to last sprint day
const SPRINT_SPAN_DAYS: u64 = 13;

/// Team shape used to derive capacity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamSettings {
    pub team_size: u32,
    pub story_points_per_developer: u32,
    /// Fraction of time the team is available, in [0, 1]
    pub availability_percent: f64,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            team_size: 5,
            story_points_per_developer: 10,
            availability_percent: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    pub team_size: u32,
    pub availability_percent: f64,
    pub story_points_per_developer: u32,
    pub raw_capacity: f64,
    pub adjusted_capacity: f64,
    pub sprint_duration_days: u32,
    pub developer_days_available: f64,
}

/// Story point capacity for one sprint
pub fn capacity_planning(team: &TeamSettings) -> Capacity {
    let raw_capacity = f64::from(team.team_size * team.story_points_per_developer);
    Capacity {
        team_size: team.team_size,
        availability_percent: team.availability_percent,
        story_points_per_developer: team.story_points_per_developer,
        raw_capacity,
        adjusted_capacity: raw_capacity * team.availability_percent,
        sprint_duration_days: SPRINT_WORKING_DAYS,
        developer_days_available: f64::from(team.team_size * SPRINT_WORKING_DAYS)
            * team.availability_percent,
    }
}

/// Nearest value on [`FIBONACCI_POINTS`]; ties go to the smaller value
pub fn nearest_fibonacci(points: u32) -> u32 {
    FIBONACCI_POINTS
        .iter()
        .copied()
        .min_by_key(|f| f.abs_diff(points))
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub description: String,
    pub assignee_role: String,
    pub estimate_days: f64,
}

/// A feature ready to be placed in a sprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintCandidate {
    pub feature_id: String,
    pub title: String,
    pub priority: Priority,
    pub feasibility_score: f64,
    pub story_points: u32,
    pub tasks: Vec<PlannedTask>,
}

impl SprintCandidate {
    /// Planning order: better candidates compare `Less`
    pub fn planning_order(&self, other: &Self) -> Ordering {
        self.priority
            .rank()
            .cmp(&other.priority.rank())
            .then_with(|| other.feasibility_score.total_cmp(&self.feasibility_score))
    }
}

fn breakdown(title: &str, story_points: u32) -> Vec<PlannedTask> {
    let points = f64::from(story_points);
    [
        ("Design and plan", "Designer", 0.2),
        ("Implement", "Developer", 0.5),
        ("Test", "QA Engineer", 0.3),
    ]
    .into_iter()
    .map(|(verb, role, share)| PlannedTask {
        description: format!("{verb} {title}"),
        assignee_role: role.to_string(),
        estimate_days: (points * share).max(1.0),
    })
    .collect()
}

/// Snap every assessed feature's estimate to the point scale
///
/// Priority comes from the matching proposal; unmatched features plan as Low.
pub fn refine_estimates(
    proposals: &FeatureProposals,
    assessment: &FeasibilityAssessment,
) -> Vec<SprintCandidate> {
    assessment
        .assessments
        .iter()
        .map(|assessed| {
            let story_points = nearest_fibonacci(assessed.story_points);
            SprintCandidate {
                feature_id: assessed.feature_id.clone(),
                title: assessed.title.clone(),
                priority: proposals
                    .get(&assessed.feature_id)
                    .map_or(Priority::Low, |f| f.priority),
                feasibility_score: assessed.feasibility_score,
                story_points,
                tasks: breakdown(&assessed.title, story_points),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintPlan {
    pub sprint_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Story point capacity the plan was organized against
    pub capacity: f64,
    pub features: Vec<SprintCandidate>,
    pub total_story_points: u32,
    /// Percent of capacity committed; may exceed 100
    pub capacity_utilization: f64,
}

impl SprintPlan {
    /// Plan starting the day after `today`
    pub fn new(today: NaiveDate, capacity: f64, features: Vec<SprintCandidate>) -> Self {
        let start_date = today.checked_add_days(Days::new(1)).unwrap_or(today);
        let end_date = start_date
            .checked_add_days(Days::new(SPRINT_SPAN_DAYS))
            .unwrap_or(start_date);
        let total_story_points = features.iter().map(|f| f.story_points).sum();

        Self {
            sprint_name: format!("Sprint {}", today.format("%Y-%m-%d")),
            start_date,
            end_date,
            capacity,
            capacity_utilization: utilization(total_story_points, capacity),
            features,
            total_story_points,
        }
    }

    pub fn contains(&self, feature_id: &str) -> bool {
        self.features.iter().any(|f| f.feature_id == feature_id)
    }
}

/// `total / capacity × 100`, 0 when there is no capacity
pub fn utilization(total_story_points: u32, capacity: f64) -> f64 {
    if capacity > 0.0 {
        f64::from(total_story_points) / capacity * 100.0
    } else {
        0.0
    }
}

pub trait SprintOrganizer: Send + Sync {
    fn organize(
        &self,
        capacity: &Capacity,
        candidates: &[SprintCandidate],
    ) -> Result<SprintPlan, IterationError>;
}

fn ordered(candidates: &[SprintCandidate]) -> Vec<SprintCandidate> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(SprintCandidate::planning_order);
    sorted
}

/// Commits every candidate, so over-commitment shows as utilization > 100
#[derive(Debug, Clone, Copy, Default)]
pub struct FullCommitOrganizer;

impl SprintOrganizer for FullCommitOrganizer {
    fn organize(
        &self,
        capacity: &Capacity,
        candidates: &[SprintCandidate],
    ) -> Result<SprintPlan, IterationError> {
        Ok(SprintPlan::new(
            Local::now().date_naive(),
            capacity.adjusted_capacity,
            ordered(candidates),
        ))
    }
}

/// Commits candidates in planning order while they fit
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyFitOrganizer;

impl SprintOrganizer for GreedyFitOrganizer {
    fn organize(
        &self,
        capacity: &Capacity,
        candidates: &[SprintCandidate],
    ) -> Result<SprintPlan, IterationError> {
        let mut committed = Vec::new();
        let mut total = 0u32;
        for candidate in ordered(candidates) {
            if f64::from(total + candidate.story_points) <= capacity.adjusted_capacity {
                total += candidate.story_points;
                committed.push(candidate);
            }
        }
        Ok(SprintPlan::new(
            Local::now().date_naive(),
            capacity.adjusted_capacity,
            committed,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn candidate(
        id: &str,
        priority: Priority,
        feasibility: f64,
        points: u32,
    ) -> SprintCandidate {
        SprintCandidate {
            feature_id: id.to_string(),
            title: format!("Improve {id}"),
            priority,
            feasibility_score: feasibility,
            story_points: points,
            tasks: breakdown(id, points),
        }
    }

    #[test]
    fn default_team_capacity() {
        let capacity = capacity_planning(&TeamSettings::default());
        assert_eq!(capacity.raw_capacity, 50.0);
        assert_eq!(capacity.adjusted_capacity, 40.0);
        assert_eq!(capacity.developer_days_available, 40.0);
        assert_eq!(capacity.sprint_duration_days, 10);
    }

    #[test]
    fn estimates_snap_to_scale() {
        assert_eq!(nearest_fibonacci(0), 1);
        assert_eq!(nearest_fibonacci(4), 3);
        assert_eq!(nearest_fibonacci(10), 8);
        assert_eq!(nearest_fibonacci(13), 13);
        assert_eq!(nearest_fibonacci(40), 21);
    }

    #[test]
    fn task_breakdown_has_one_day_floor() {
        let tasks = breakdown("Improve Search", 3);
        let days: Vec<f64> = tasks.iter().map(|t| t.estimate_days).collect();
        assert_eq!(days, vec![1.0, 1.5, 1.0]);
        assert_eq!(tasks[1].description, "Implement Improve Search");
        assert_eq!(tasks[2].assignee_role, "QA Engineer");
    }

    #[test]
    fn full_commit_orders_and_overcommits() {
        let capacity = capacity_planning(&TeamSettings::default());
        let candidates = vec![
            candidate("low", Priority::Low, 95.0, 16),
            candidate("crit-b", Priority::Critical, 58.0, 13),
            candidate("crit-a", Priority::Critical, 78.0, 13),
            candidate("high", Priority::High, 78.0, 8),
        ];

        let plan = FullCommitOrganizer.organize(&capacity, &candidates).unwrap();

        let ids: Vec<&str> = plan.features.iter().map(|f| f.feature_id.as_str()).collect();
        assert_eq!(ids, vec!["crit-a", "crit-b", "high", "low"]);
        assert_eq!(plan.total_story_points, 50);
        assert_eq!(plan.capacity_utilization, 125.0);
        assert_eq!(
            plan.end_date.signed_duration_since(plan.start_date).num_days(),
            13
        );
    }

    #[test]
    fn greedy_fit_skips_what_does_not_fit() {
        let capacity = capacity_planning(&TeamSettings::default());
        let candidates = vec![
            candidate("a", Priority::Critical, 58.0, 21),
            candidate("b", Priority::High, 78.0, 21),
            candidate("c", Priority::Low, 93.0, 13),
        ];

        let plan = GreedyFitOrganizer.organize(&capacity, &candidates).unwrap();

        assert!(plan.contains("a") && plan.contains("c") && !plan.contains("b"));
        assert_eq!(plan.total_story_points, 34);
        assert!(plan.capacity_utilization <= 100.0);
    }

    #[test]
    fn zero_capacity_means_zero_utilization() {
        assert_eq!(utilization(20, 0.0), 0.0);
    }
}
