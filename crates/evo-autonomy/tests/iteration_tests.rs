//! Re-planning loops: iteration caps, early exit and capacity strategy order

use evo_autonomy::feasibility::{FeasibilityAssessment, FeatureAssessment};
use evo_autonomy::planning::{capacity_planning, SprintCandidate, TeamSettings};
use evo_autonomy::{
    analyze_feedback, propose_features, CapacityLoop, FeasibilityAssessor, FeasibilityLoop,
    Feature, FeatureRegenerator, FeedbackItem, FullCommitOrganizer, HeuristicAssessor,
    IterationError, IterationMetrics, LoopExit, Priority, SimplifyingRegenerator,
    SprintOrganizer, Trigger,
};
use evo_engine::ExecutionLog;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Assessor that gives every feature the next scripted score
struct ScriptedAssessor {
    scores: Vec<f64>,
    calls: AtomicUsize,
}

impl ScriptedAssessor {
    fn new(scores: &[f64]) -> Self {
        Self {
            scores: scores.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FeasibilityAssessor for ScriptedAssessor {
    fn assess(&self, features: &[Feature]) -> Result<FeasibilityAssessment, IterationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let score = self.scores[call.min(self.scores.len() - 1)];
        let assessments: Vec<FeatureAssessment> = features
            .iter()
            .map(|feature| {
                let mut assessed = HeuristicAssessor.assess_feature(feature);
                assessed.feasibility_score = score;
                assessed
            })
            .collect();
        Ok(FeasibilityAssessment::from_assessments(assessments))
    }
}

struct BrokenRegenerator;

impl FeatureRegenerator for BrokenRegenerator {
    fn regenerate(
        &self,
        _features: &[Feature],
        _assessment: &FeasibilityAssessment,
    ) -> Result<Vec<Feature>, IterationError> {
        Err(IterationError::Regeneration("model unavailable".into()))
    }
}

fn feedback() -> Vec<FeedbackItem> {
    let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    vec![
        FeedbackItem::new(day, "bug", "Search", 5, "Crash on empty query"),
        FeedbackItem::new(day, "bug", "Login", 4, "Reset link expired"),
        FeedbackItem::new(day, "usability", "Dashboard", 2, "Too many clicks"),
    ]
}

#[test]
fn feasibility_loop_stops_at_cap_when_scores_never_rise() {
    let proposals = propose_features(&analyze_feedback(&feedback()));
    let assessor = ScriptedAssessor::new(&[30.0]);
    let initial = assessor.assess(&proposals.features).unwrap();
    let mut metrics = IterationMetrics::new();
    let log = ExecutionLog::new();

    let outcome = FeasibilityLoop::new(&assessor, &SimplifyingRegenerator, 3).run(
        proposals,
        initial,
        &mut metrics,
        &log,
    );

    assert_eq!(outcome.iterations, 3);
    assert_eq!(outcome.exit, LoopExit::CapReached);
    assert_eq!(assessor.calls(), 4);
    assert_eq!(metrics.total_iterations, 3);
    assert_eq!(metrics.feature_iterations.len(), 3);
    assert_eq!(metrics.iteration_triggers, vec![Trigger::LowFeasibility; 3]);
    for (i, record) in metrics.feature_iterations.iter().enumerate() {
        assert_eq!(record.iteration, i as u32 + 1);
        assert_eq!(record.before_score, 30.0);
        assert_eq!(record.improvement, Some(0.0));
        assert_eq!(record.low_feasibility_features.len(), 3);
    }
    // each pass prefixes the title again
    assert!(outcome.proposals.features[0]
        .title
        .starts_with("Simplified Simplified Simplified Improve"));
    assert!(log
        .entries()
        .iter()
        .any(|e| e.ends_with("Detected 3 features with low feasibility: F001, F002, F003")));
}

#[test]
fn feasibility_loop_exits_once_threshold_is_met() {
    let proposals = propose_features(&analyze_feedback(&feedback()));
    let assessor = ScriptedAssessor::new(&[40.0, 70.0]);
    let initial = assessor.assess(&proposals.features).unwrap();
    let mut metrics = IterationMetrics::new();
    let log = ExecutionLog::new();

    let outcome = FeasibilityLoop::new(&assessor, &SimplifyingRegenerator, 3).run(
        proposals,
        initial,
        &mut metrics,
        &log,
    );

    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.exit, LoopExit::Converged);
    assert_eq!(outcome.assessment.average_feasibility_score, 70.0);
    let record = &metrics.feature_iterations[0];
    assert_eq!(record.before_score, 40.0);
    assert_eq!(record.after_score, Some(70.0));
    assert_eq!(record.improvement, Some(30.0));
    assert!(log
        .entries()
        .iter()
        .any(|e| e.ends_with("Autonomous: Iteration 1, new feasibility score: 70.0%")));
}

#[test]
fn zero_iterations_disables_the_feasibility_loop() {
    let proposals = propose_features(&analyze_feedback(&feedback()));
    let assessor = ScriptedAssessor::new(&[10.0]);
    let initial = assessor.assess(&proposals.features).unwrap();
    let mut metrics = IterationMetrics::new();

    let outcome = FeasibilityLoop::new(&assessor, &SimplifyingRegenerator, 0).run(
        proposals,
        initial,
        &mut metrics,
        &ExecutionLog::new(),
    );

    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.exit, LoopExit::CapReached);
    assert!(metrics.feature_iterations.is_empty());
}

#[test]
fn regeneration_failure_keeps_partial_record_and_last_assessment() {
    let proposals = propose_features(&analyze_feedback(&feedback()));
    let assessor = ScriptedAssessor::new(&[20.0]);
    let initial = assessor.assess(&proposals.features).unwrap();
    let mut metrics = IterationMetrics::new();

    let outcome = FeasibilityLoop::new(&assessor, &BrokenRegenerator, 3).run(
        proposals.clone(),
        initial.clone(),
        &mut metrics,
        &ExecutionLog::new(),
    );

    assert!(matches!(
        outcome.exit,
        LoopExit::Failed(IterationError::Regeneration(_))
    ));
    assert_eq!(outcome.assessment, initial);
    assert_eq!(outcome.proposals, proposals);
    assert_eq!(metrics.total_iterations, 0);
    assert_eq!(metrics.feature_iterations.len(), 1);
    assert_eq!(metrics.feature_iterations[0].after_score, None);
}

fn candidate(id: &str, priority: Priority, feasibility: f64, points: u32) -> SprintCandidate {
    SprintCandidate {
        feature_id: id.to_string(),
        title: format!("Improve {id}"),
        priority,
        feasibility_score: feasibility,
        story_points: points,
        tasks: Vec::new(),
    }
}

fn overcommitted() -> Vec<SprintCandidate> {
    vec![
        candidate("c1", Priority::Critical, 58.0, 13),
        candidate("c2", Priority::Critical, 78.0, 13),
        candidate("c3", Priority::High, 93.0, 13),
        candidate("c4", Priority::Medium, 93.0, 13),
        candidate("c5", Priority::Low, 93.0, 8),
    ]
}

#[test]
fn capacity_loop_boosts_first_then_removes_one_per_pass() {
    let capacity = capacity_planning(&TeamSettings::default());
    let candidates = overcommitted();
    let plan = FullCommitOrganizer.organize(&capacity, &candidates).unwrap();
    assert_eq!(plan.capacity_utilization, 150.0);
    let mut metrics = IterationMetrics::new();
    let log = ExecutionLog::new();

    let outcome = CapacityLoop::new(&FullCommitOrganizer, 3).run(
        capacity,
        candidates,
        plan,
        &mut metrics,
        &log,
    );

    let boosted = 40.0 * 1.1;
    let records = &metrics.sprint_iterations;
    assert_eq!(records.len(), 3);

    // pass 1: +10% capacity, nothing removed
    assert_eq!(records[0].capacity, 40.0);
    assert_eq!(records[0].removed_feature, None);
    assert_eq!(records[0].feature_count, 5);

    // pass 2: exactly one removal, capacity unchanged from pass 1
    assert_eq!(records[1].capacity, boosted);
    assert_eq!(records[1].removed_feature.as_deref(), Some("c5"));
    assert_eq!(records[1].feature_count, 5);
    assert!(records[1].before_utilization > 100.0);

    assert_eq!(records[2].capacity, boosted);
    assert_eq!(records[2].removed_feature.as_deref(), Some("c4"));
    assert_eq!(records[2].feature_count, 4);

    assert_eq!(outcome.capacity.adjusted_capacity, boosted);
    assert_eq!(outcome.removed, vec!["c5", "c4"]);
    assert_eq!(outcome.exit, LoopExit::Converged);
    assert_eq!(outcome.plan.total_story_points, 39);
    assert!(outcome.plan.capacity_utilization <= 100.0);
    assert_eq!(metrics.total_iterations, 3);
    assert_eq!(metrics.iteration_triggers, vec![Trigger::CapacityExceeded; 3]);
    for record in records {
        let after = record.after_utilization.unwrap();
        assert_eq!(record.improvement, Some(record.before_utilization - after));
    }
    assert!(log
        .entries()
        .iter()
        .any(|e| e.ends_with("Increasing capacity from 40.0 to 44.0")));
    assert!(log
        .entries()
        .iter()
        .any(|e| e.ends_with("Removed feature c5 from sprint plan")));
}

#[test]
fn capacity_loop_respects_cap() {
    let capacity = capacity_planning(&TeamSettings::default());
    let candidates = overcommitted();
    let plan = FullCommitOrganizer.organize(&capacity, &candidates).unwrap();
    let mut metrics = IterationMetrics::new();

    let outcome = CapacityLoop::new(&FullCommitOrganizer, 2).run(
        capacity,
        candidates,
        plan,
        &mut metrics,
        &ExecutionLog::new(),
    );

    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.exit, LoopExit::CapReached);
    assert_eq!(outcome.removed, vec!["c5"]);
    assert_eq!(outcome.candidates.len(), 4);
    assert!(outcome.plan.capacity_utilization > 100.0);
}

#[test]
fn plan_within_capacity_never_iterates() {
    let capacity = capacity_planning(&TeamSettings::default());
    let candidates = vec![candidate("c1", Priority::High, 80.0, 13)];
    let plan = FullCommitOrganizer.organize(&capacity, &candidates).unwrap();
    let mut metrics = IterationMetrics::new();

    let outcome = CapacityLoop::new(&FullCommitOrganizer, 3).run(
        capacity,
        candidates,
        plan,
        &mut metrics,
        &ExecutionLog::new(),
    );

    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.exit, LoopExit::Converged);
    assert_eq!(metrics, IterationMetrics::new());
}
