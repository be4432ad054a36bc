//! Bounded re-planning loops
//!
//! Two loops re-enter earlier stages when a threshold is crossed:
//! - [`FeasibilityLoop`]: average feasibility under 50% regenerates the
//!   features and re-assesses them
//! - [`CapacityLoop`]: a sprint over 100% utilization first gains 10%
//!   capacity, then sheds one feature per pass
//!
//! Both stop at `max_iterations`. Every pass is recorded in
//! [`IterationMetrics`]; a pass whose stage fails keeps its partial record,
//! ends the loop, and leaves the last good result in place.

use crate::error::IterationError;
use crate::feasibility::{
    FeasibilityAssessment, FeasibilityAssessor, FeatureRegenerator, LOW_FEASIBILITY,
};
use crate::planning::{Capacity, SprintCandidate, SprintOrganizer, SprintPlan};
use crate::proposals::FeatureProposals;
use evo_engine::ExecutionLog;
use serde::{Deserialize, Serialize};

/// Utilization above this re-plans the sprint
pub const MAX_UTILIZATION: f64 = 100.0;

/// Capacity multiplier applied on the first capacity pass
pub const CAPACITY_BOOST: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    LowFeasibility,
    CapacityExceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureIteration {
    pub iteration: u32,
    pub trigger: Trigger,
    pub before_score: f64,
    pub low_feasibility_features: Vec<String>,
    pub after_score: Option<f64>,
    /// `after - before`
    pub improvement: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintIteration {
    pub iteration: u32,
    pub trigger: Trigger,
    pub before_utilization: f64,
    /// Capacity at the start of the pass
    pub capacity: f64,
    pub feature_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_feature: Option<String>,
    pub after_utilization: Option<f64>,
    /// `before - after`
    pub improvement: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationMetrics {
    pub feature_iterations: Vec<FeatureIteration>,
    pub sprint_iterations: Vec<SprintIteration>,
    /// Completed passes across both loops
    pub total_iterations: u32,
    pub iteration_triggers: Vec<Trigger>,
}

impl IterationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn complete(&mut self, trigger: Trigger) {
        self.total_iterations += 1;
        self.iteration_triggers.push(trigger);
    }

    pub fn summary(&self) -> IterationSummary {
        IterationSummary {
            total_iterations: self.total_iterations,
            feature_iterations: self.feature_iterations.len(),
            sprint_iterations: self.sprint_iterations.len(),
            triggers: self.iteration_triggers.clone(),
        }
    }
}

/// Counts reported to stakeholders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub total_iterations: u32,
    pub feature_iterations: usize,
    pub sprint_iterations: usize,
    pub triggers: Vec<Trigger>,
}

/// Why a loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The threshold is satisfied
    Converged,
    /// `max_iterations` passes ran and the threshold is still crossed
    CapReached,
    /// A stage failed mid-pass
    Failed(IterationError),
}

#[derive(Debug, Clone)]
pub struct FeasibilityOutcome {
    pub proposals: FeatureProposals,
    pub assessment: FeasibilityAssessment,
    pub iterations: u32,
    pub exit: LoopExit,
}

pub struct FeasibilityLoop<'a> {
    assessor: &'a dyn FeasibilityAssessor,
    regenerator: &'a dyn FeatureRegenerator,
    max_iterations: u32,
    threshold: f64,
}

impl<'a> FeasibilityLoop<'a> {
    pub fn new(
        assessor: &'a dyn FeasibilityAssessor,
        regenerator: &'a dyn FeatureRegenerator,
        max_iterations: u32,
    ) -> Self {
        Self {
            assessor,
            regenerator,
            max_iterations,
            threshold: LOW_FEASIBILITY,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn run(
        &self,
        mut proposals: FeatureProposals,
        mut assessment: FeasibilityAssessment,
        metrics: &mut IterationMetrics,
        log: &ExecutionLog,
    ) -> FeasibilityOutcome {
        let low = assessment.below(self.threshold);
        if !low.is_empty() {
            log.record(format!(
                "Detected {} features with low feasibility: {}",
                low.len(),
                low.join(", ")
            ));
        }

        let mut iterations = 0;
        let exit = loop {
            let before = assessment.average_feasibility_score;
            if before >= self.threshold {
                break LoopExit::Converged;
            }
            if iterations >= self.max_iterations {
                break LoopExit::CapReached;
            }

            log.record(format!(
                "Autonomous: Feasibility score too low ({before:.1}%), triggering feature regeneration"
            ));
            metrics.feature_iterations.push(FeatureIteration {
                iteration: iterations + 1,
                trigger: Trigger::LowFeasibility,
                before_score: before,
                low_feasibility_features: assessment.below(self.threshold),
                after_score: None,
                improvement: None,
            });

            let pass = self
                .regenerator
                .regenerate(&proposals.features, &assessment)
                .and_then(|features| Ok((self.assessor.assess(&features)?, features)));
            let (reassessed, features) = match pass {
                Ok(pass) => pass,
                Err(err) => {
                    log.record(format!("Autonomous: Feature iteration stopped: {err}"));
                    tracing::error!(error = %err, "Feasibility iteration failed");
                    break LoopExit::Failed(err);
                }
            };

            iterations += 1;
            let after = reassessed.average_feasibility_score;
            if let Some(record) = metrics.feature_iterations.last_mut() {
                record.after_score = Some(after);
                record.improvement = Some(after - before);
            }
            metrics.complete(Trigger::LowFeasibility);
            log.record(format!(
                "Autonomous: Iteration {iterations}, new feasibility score: {after:.1}%"
            ));

            proposals.features = features;
            assessment = reassessed;
        };

        FeasibilityOutcome {
            proposals,
            assessment,
            iterations,
            exit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CapacityOutcome {
    pub capacity: Capacity,
    /// Candidates still in play after removals
    pub candidates: Vec<SprintCandidate>,
    pub plan: SprintPlan,
    pub iterations: u32,
    pub removed: Vec<String>,
    pub exit: LoopExit,
}

pub struct CapacityLoop<'a> {
    organizer: &'a dyn SprintOrganizer,
    max_iterations: u32,
}

impl<'a> CapacityLoop<'a> {
    pub fn new(organizer: &'a dyn SprintOrganizer, max_iterations: u32) -> Self {
        Self {
            organizer,
            max_iterations,
        }
    }

    pub fn run(
        &self,
        mut capacity: Capacity,
        mut candidates: Vec<SprintCandidate>,
        mut plan: SprintPlan,
        metrics: &mut IterationMetrics,
        log: &ExecutionLog,
    ) -> CapacityOutcome {
        let mut iterations = 0;
        let mut removed = Vec::new();

        let exit = loop {
            let before = plan.capacity_utilization;
            if before <= MAX_UTILIZATION {
                break LoopExit::Converged;
            }
            if iterations >= self.max_iterations {
                break LoopExit::CapReached;
            }

            log.record(format!(
                "Autonomous: Capacity exceeded ({before:.1}%), triggering re-planning"
            ));
            let starting_capacity = capacity.adjusted_capacity;
            let feature_count = plan.features.len();

            let removed_feature = if iterations == 0 {
                capacity.adjusted_capacity = starting_capacity * CAPACITY_BOOST;
                log.record(format!(
                    "Increasing capacity from {starting_capacity:.1} to {:.1}",
                    capacity.adjusted_capacity
                ));
                None
            } else {
                worst_candidate(&candidates).map(|index| {
                    let dropped = candidates.remove(index);
                    log.record(format!("Removed feature {} from sprint plan", dropped.feature_id));
                    dropped.feature_id
                })
            };

            metrics.sprint_iterations.push(SprintIteration {
                iteration: iterations + 1,
                trigger: Trigger::CapacityExceeded,
                before_utilization: before,
                capacity: starting_capacity,
                feature_count,
                removed_feature: removed_feature.clone(),
                after_utilization: None,
                improvement: None,
            });
            removed.extend(removed_feature);

            let replanned = match self.organizer.organize(&capacity, &candidates) {
                Ok(replanned) => replanned,
                Err(err) => {
                    log.record(format!("Autonomous: Sprint iteration stopped: {err}"));
                    tracing::error!(error = %err, "Capacity iteration failed");
                    break LoopExit::Failed(err);
                }
            };

            iterations += 1;
            let after = replanned.capacity_utilization;
            if let Some(record) = metrics.sprint_iterations.last_mut() {
                record.after_utilization = Some(after);
                record.improvement = Some(before - after);
            }
            metrics.complete(Trigger::CapacityExceeded);
            log.record(format!(
                "Autonomous: Iteration {iterations}, new capacity utilization: {after:.1}%"
            ));

            plan = replanned;
        };

        CapacityOutcome {
            capacity,
            candidates,
            plan,
            iterations,
            removed,
            exit,
        }
    }
}

/// Lowest priority, then lowest feasibility; the later one on a full tie
fn worst_candidate(candidates: &[SprintCandidate]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.planning_order(b))
        .map(|(index, _)| index)
}
