//! Autonomous mode
//!
//! Runs analyze → propose → assess → plan → report over structured feedback,
//! re-entering assess and plan through the [`iteration`](crate::iteration)
//! loops, and persists every stage result under a fixed name.

use crate::analysis::{
    analyze_feedback, load_feedback, validate_feedback, FeedbackAnalysis, FeedbackItem,
};
use crate::error::PipelineError;
use crate::feasibility::{
    FeasibilityAssessment, FeasibilityAssessor, FeatureRegenerator, HeuristicAssessor,
    SimplifyingRegenerator,
};
use crate::iteration::{CapacityLoop, FeasibilityLoop, IterationMetrics};
use crate::planning::{
    capacity_planning, refine_estimates, FullCommitOrganizer, SprintOrganizer, SprintPlan,
    TeamSettings,
};
use crate::proposals::{propose_features, FeatureProposals};
use crate::report::{stakeholder_update, StageResults, StakeholderUpdate};
use evo_core::CrewConfig;
use evo_engine::{persist_serialized, ExecutionLog, JsonDirSink, ResultSink};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Product named in stakeholder material
pub const DEFAULT_PRODUCT: &str = "SmartAssist";

/// Everything an autonomous run produced
#[derive(Debug, Clone, Serialize)]
pub struct AutonomousReport {
    pub feedback_analysis: FeedbackAnalysis,
    pub feature_proposals: FeatureProposals,
    pub feasibility_assessment: FeasibilityAssessment,
    pub sprint_plan: SprintPlan,
    pub stakeholder_update: StakeholderUpdate,
    pub iteration_metrics: IterationMetrics,
    pub execution_log: Vec<String>,
    pub elapsed_secs: f64,
}

pub struct AutonomousPipeline {
    max_iterations: u32,
    team: TeamSettings,
    product: String,
    assessor: Arc<dyn FeasibilityAssessor>,
    regenerator: Arc<dyn FeatureRegenerator>,
    organizer: Arc<dyn SprintOrganizer>,
    sink: Arc<dyn ResultSink>,
}

impl AutonomousPipeline {
    /// Heuristic stages, full-commit planning, results under `data.output_dir`
    pub fn new(config: &CrewConfig) -> Self {
        Self {
            max_iterations: config.agents.max_iterations,
            team: TeamSettings::default(),
            product: DEFAULT_PRODUCT.to_string(),
            assessor: Arc::new(HeuristicAssessor),
            regenerator: Arc::new(SimplifyingRegenerator),
            organizer: Arc::new(FullCommitOrganizer),
            sink: Arc::new(JsonDirSink::new(config.data.output_dir.clone())),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_team(mut self, team: TeamSettings) -> Self {
        self.team = team;
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    pub fn with_assessor(mut self, assessor: Arc<dyn FeasibilityAssessor>) -> Self {
        self.assessor = assessor;
        self
    }

    pub fn with_regenerator(mut self, regenerator: Arc<dyn FeatureRegenerator>) -> Self {
        self.regenerator = regenerator;
        self
    }

    pub fn with_organizer(mut self, organizer: Arc<dyn SprintOrganizer>) -> Self {
        self.organizer = organizer;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Load feedback from a JSON file, then [`run`](Self::run)
    pub fn run_file(&self, path: &Path) -> Result<AutonomousReport, PipelineError> {
        let feedback = load_feedback(path)?;
        self.run(&feedback)
    }

    pub fn run(&self, feedback: &[FeedbackItem]) -> Result<AutonomousReport, PipelineError> {
        validate_feedback(feedback)?;
        let started = Instant::now();
        let log = ExecutionLog::new();
        let sink = self.sink.as_ref();
        let mut metrics = IterationMetrics::new();

        log.record("Starting autonomous workflow with intelligent iteration");

        log.record("Autonomous: Running feedback analysis");
        let analysis = analyze_feedback(feedback);
        log.record(format!(
            "Analyzed {} feedback items across {} categories",
            analysis.total_feedback_count,
            analysis.categories.len()
        ));
        persist_serialized(sink, "feedback_analysis", &analysis);

        log.record("Autonomous: Generating feature proposals");
        let proposals = propose_features(&analysis);
        log.record(format!("Generated {} feature proposals", proposals.len()));
        let distribution = proposals
            .priority_distribution()
            .into_iter()
            .map(|(priority, count)| format!("{priority}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        log.record(format!("Priority distribution: {distribution}"));

        log.record("Autonomous: Evaluating technical feasibility");
        let assessment = self.assessor.assess(&proposals.features)?;
        let feasibility = FeasibilityLoop::new(
            self.assessor.as_ref(),
            self.regenerator.as_ref(),
            self.max_iterations,
        )
        .run(proposals, assessment, &mut metrics, &log);
        let proposals = feasibility.proposals;
        let assessment = feasibility.assessment;
        persist_serialized(sink, "feature_proposals", &proposals);
        persist_serialized(sink, "feasibility_assessment", &assessment);

        log.record("Autonomous: Creating sprint plan");
        let capacity = capacity_planning(&self.team);
        let candidates = refine_estimates(&proposals, &assessment);
        let plan = self.organizer.organize(&capacity, &candidates)?;
        let planned = CapacityLoop::new(self.organizer.as_ref(), self.max_iterations).run(
            capacity,
            candidates,
            plan,
            &mut metrics,
            &log,
        );
        persist_serialized(sink, "sprint_plan", &planned.plan);
        persist_serialized(sink, "iteration_metrics", &metrics);

        log.record("Autonomous: Generating stakeholder update");
        let stages = StageResults {
            analysis: &analysis,
            proposals: &proposals,
            assessment: &assessment,
            candidates: &planned.candidates,
            plan: &planned.plan,
        };
        let update = stakeholder_update(&self.product, &stages, &metrics);
        persist_serialized(sink, "stakeholder_update", &update);

        log.record(format!(
            "Autonomous workflow completed with {} total iterations",
            metrics.total_iterations
        ));

        let report = AutonomousReport {
            feedback_analysis: analysis,
            feature_proposals: proposals,
            feasibility_assessment: assessment,
            sprint_plan: planned.plan,
            stakeholder_update: update,
            iteration_metrics: metrics,
            execution_log: log.entries(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        persist_serialized(sink, "autonomous_result", &report);
        Ok(report)
    }
}

impl fmt::Debug for AutonomousPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutonomousPipeline")
            .field("max_iterations", &self.max_iterations)
            .field("team", &self.team)
            .field("product", &self.product)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}
