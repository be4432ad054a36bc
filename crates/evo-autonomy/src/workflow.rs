//! The standard five-agent workflow
//!
//! Builds a [`Crew`] whose agents each own one stage of the improvement
//! cycle, chained analyze → propose → assess → plan → report.

use crate::analysis::FeedbackItem;
use evo_core::{
    Agent, CredentialRef, CrewConfig, ExecutionMode, LanguageModel, ModelConfig, Task,
};
use evo_engine::{Crew, EngineError};
use indexmap::IndexMap;
use std::sync::Arc;

pub const FEEDBACK_ANALYST: &str = "feedback_analyst";
pub const FEATURE_STRATEGIST: &str = "feature_strategist";
pub const TECHNICAL_FEASIBILITY: &str = "technical_feasibility";
pub const SPRINT_PLANNER: &str = "sprint_planner";
pub const STAKEHOLDER_COMMUNICATOR: &str = "stakeholder_communicator";

pub const ANALYZE_FEEDBACK: &str = "analyze_feedback";
pub const GENERATE_FEATURE_PROPOSALS: &str = "generate_feature_proposals";
pub const EVALUATE_FEASIBILITY: &str = "evaluate_feasibility";
pub const CREATE_SPRINT_PLAN: &str = "create_sprint_plan";
pub const GENERATE_STAKEHOLDER_UPDATE: &str = "generate_stakeholder_update";

/// Task ids in chain order
pub const STANDARD_TASKS: [&str; 5] = [
    ANALYZE_FEEDBACK,
    GENERATE_FEATURE_PROPOSALS,
    EVALUATE_FEASIBILITY,
    CREATE_SPRINT_PLAN,
    GENERATE_STAKEHOLDER_UPDATE,
];

struct Persona {
    id: &'static str,
    role: &'static str,
    goal: &'static str,
    backstory: &'static str,
}

const PERSONAS: [Persona; 5] = [
    Persona {
        id: FEEDBACK_ANALYST,
        role: "Feedback Analyst",
        goal: "Analyze user feedback to identify patterns, priorities, and insights",
        backstory: "You are an expert in data analysis with a focus on user feedback. \
                    You excel at identifying patterns and extracting actionable insights \
                    from user comments.",
    },
    Persona {
        id: FEATURE_STRATEGIST,
        role: "Feature Planner",
        goal: "Generate feature proposals based on user feedback analysis",
        backstory: "You are a product manager who specializes in translating user feedback \
                    into actionable feature proposals. You have a keen sense for prioritizing \
                    features that will have the greatest impact.",
    },
    Persona {
        id: TECHNICAL_FEASIBILITY,
        role: "Technical Evaluator",
        goal: "Evaluate the technical feasibility of proposed features",
        backstory: "You are a senior software engineer with extensive experience in evaluating \
                    the technical complexity and feasibility of new features. You can identify \
                    potential challenges and estimate implementation effort.",
    },
    Persona {
        id: SPRINT_PLANNER,
        role: "Sprint Planner",
        goal: "Create a sprint plan based on feature proposals and technical evaluation",
        backstory: "You are a project manager with expertise in agile methodologies. You excel \
                    at organizing features into sprints and creating realistic timelines for \
                    implementation.",
    },
    Persona {
        id: STAKEHOLDER_COMMUNICATOR,
        role: "Stakeholder Communicator",
        goal: "Generate clear and compelling updates for stakeholders",
        backstory: "You are a communication specialist who excels at translating technical \
                    information into clear, compelling updates for stakeholders. You know how \
                    to highlight the value and impact of planned work.",
    },
];

/// Inputs for the standard workflow
#[derive(Debug, Clone, Default)]
pub struct StandardWorkflow {
    feedback: String,
    priority_focus: Option<String>,
    credential: Option<CredentialRef>,
}

impl StandardWorkflow {
    pub fn new(feedback: impl Into<String>) -> Self {
        Self {
            feedback: feedback.into(),
            priority_focus: None,
            credential: None,
        }
    }

    /// Feedback rendered one item per line
    pub fn from_items(items: &[FeedbackItem]) -> Self {
        Self::new(
            items
                .iter()
                .map(FeedbackItem::render)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Area the feature proposals should favour
    pub fn with_priority_focus(mut self, focus: impl Into<String>) -> Self {
        self.priority_focus = Some(focus.into());
        self
    }

    /// Credential for every agent instead of the provider's environment key
    pub fn with_credential(mut self, credential: CredentialRef) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn agents(
        &self,
        config: &CrewConfig,
        model: Arc<dyn LanguageModel>,
    ) -> Vec<(&'static str, Agent)> {
        PERSONAS
            .iter()
            .map(|p| {
                let mut agent =
                    Agent::new(p.role, p.goal, p.backstory, model.clone()).configured(config);
                if let Some(credential) = &self.credential {
                    agent = agent.with_model_config(
                        ModelConfig::from_config(config).with_credential(credential.clone()),
                    );
                }
                (p.id, agent)
            })
            .collect()
    }

    pub fn tasks(&self) -> Vec<(&'static str, Task)> {
        let mut proposals = Task::new(
            "Based on the feedback analysis, generate 3-5 feature proposals that address the most \
             important user needs.",
            FEATURE_STRATEGIST,
        )
        .with_expected_output(
            "A list of 3-5 feature proposals with descriptions, justifications, and expected impact.",
        )
        .depends_on(ANALYZE_FEEDBACK);
        if let Some(focus) = &self.priority_focus {
            let mut focus_context = IndexMap::new();
            focus_context.insert("priority_focus".to_string(), focus.clone());
            proposals = proposals.with_context(focus_context);
        }

        vec![
            (
                ANALYZE_FEEDBACK,
                Task::new(
                    format!(
                        "Analyze the following user feedback and identify key patterns, \
                         priorities, and insights:\n\n{}",
                        self.feedback
                    ),
                    FEEDBACK_ANALYST,
                )
                .with_expected_output(
                    "A detailed analysis of user feedback with key patterns, priorities, and \
                     actionable insights.",
                ),
            ),
            (GENERATE_FEATURE_PROPOSALS, proposals),
            (
                EVALUATE_FEASIBILITY,
                Task::new(
                    "Evaluate the technical feasibility of the proposed features. For each \
                     feature, assess complexity, potential challenges, and estimated effort.",
                    TECHNICAL_FEASIBILITY,
                )
                .with_expected_output(
                    "A technical evaluation of each proposed feature, including complexity \
                     rating, potential challenges, and estimated effort.",
                )
                .depends_on(GENERATE_FEATURE_PROPOSALS),
            ),
            (
                CREATE_SPRINT_PLAN,
                Task::new(
                    "Create a sprint plan based on the feature proposals and technical \
                     evaluation. Organize features into sprints and create a timeline for \
                     implementation.",
                    SPRINT_PLANNER,
                )
                .with_expected_output(
                    "A sprint plan with features organized into sprints, estimated timelines, \
                     and resource allocation.",
                )
                .depends_on(EVALUATE_FEASIBILITY),
            ),
            (
                GENERATE_STAKEHOLDER_UPDATE,
                Task::new(
                    "Generate a clear and compelling update for stakeholders based on the \
                     feedback analysis, feature proposals, technical evaluation, and sprint plan.",
                    STAKEHOLDER_COMMUNICATOR,
                )
                .with_expected_output(
                    "A stakeholder update that clearly communicates the planned work, its value, \
                     and expected impact.",
                )
                .depends_on(CREATE_SPRINT_PLAN),
            ),
        ]
    }

    /// Register agents and tasks on a new crew and note dependencies in
    /// each description
    pub fn build(
        &self,
        config: &CrewConfig,
        model: Arc<dyn LanguageModel>,
        mode: ExecutionMode,
    ) -> Result<Crew, EngineError> {
        let mut crew = Crew::new(mode, config)?;
        for (id, agent) in self.agents(config, model) {
            crew.add_agent(id, agent)?;
        }
        for (id, task) in self.tasks() {
            crew.add_task(id, task)?;
        }
        crew.annotate_dependencies();
        Ok(crew)
    }
}

/// Standard crew with no feedback text
pub fn standard_crew(
    config: &CrewConfig,
    model: Arc<dyn LanguageModel>,
    mode: ExecutionMode,
) -> Result<Crew, EngineError> {
    StandardWorkflow::default().build(config, model, mode)
}
