//! Stakeholder reporting stage
//!
//! Aggregates every earlier stage into metrics and insights, renders a
//! slide outline and a per-feature decision matrix.

use crate::analysis::FeedbackAnalysis;
use crate::feasibility::{FeasibilityAssessment, Level};
use crate::iteration::{IterationMetrics, IterationSummary};
use crate::planning::{SprintCandidate, SprintPlan};
use crate::proposals::{FeatureProposals, Priority};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub feedback_items_analyzed: usize,
    pub feature_proposals_generated: usize,
    pub average_feasibility_score: f64,
    pub sprint_capacity_utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub feasibility: f64,
    pub story_points: u32,
    pub included_in_sprint: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub metrics: ReportMetrics,
    pub key_insights: Vec<String>,
    /// Sprint features first, in plan order
    pub feature_summary: Vec<FeatureSummary>,
}

/// Stage results a report is built from
#[derive(Debug, Clone, Copy)]
pub struct StageResults<'a> {
    pub analysis: &'a FeedbackAnalysis,
    pub proposals: &'a FeatureProposals,
    pub assessment: &'a FeasibilityAssessment,
    /// Candidates that were planned, for story points of features left out
    pub candidates: &'a [SprintCandidate],
    pub plan: &'a SprintPlan,
}

pub fn aggregate(stages: &StageResults<'_>) -> AggregatedReport {
    let metrics = ReportMetrics {
        feedback_items_analyzed: stages.analysis.total_feedback_count,
        feature_proposals_generated: stages.proposals.len(),
        average_feasibility_score: stages.assessment.average_feasibility_score,
        sprint_capacity_utilization: stages.plan.capacity_utilization,
    };

    let key_insights = vec![
        format!(
            "Analyzed {} feedback items across multiple categories",
            metrics.feedback_items_analyzed
        ),
        format!(
            "Generated {} feature proposals to address user pain points",
            metrics.feature_proposals_generated
        ),
        format!(
            "Technical feasibility assessment shows {:.1}% average feasibility",
            metrics.average_feasibility_score
        ),
        format!(
            "Sprint plan utilizes {:.1}% of available capacity",
            metrics.sprint_capacity_utilization
        ),
    ];

    let mut feature_summary: Vec<FeatureSummary> = stages
        .plan
        .features
        .iter()
        .map(|f| FeatureSummary {
            id: f.feature_id.clone(),
            title: f.title.clone(),
            priority: f.priority,
            feasibility: f.feasibility_score,
            story_points: f.story_points,
            included_in_sprint: true,
        })
        .collect();

    for assessed in &stages.assessment.assessments {
        if stages.plan.contains(&assessed.feature_id) {
            continue;
        }
        let story_points = stages
            .candidates
            .iter()
            .find(|c| c.feature_id == assessed.feature_id)
            .map_or(assessed.story_points, |c| c.story_points);
        feature_summary.push(FeatureSummary {
            id: assessed.feature_id.clone(),
            title: assessed.title.clone(),
            priority: stages
                .proposals
                .get(&assessed.feature_id)
                .map_or(Priority::Low, |f| f.priority),
            feasibility: assessed.feasibility_score,
            story_points,
            included_in_sprint: false,
        });
    }

    AggregatedReport {
        metrics,
        key_insights,
        feature_summary,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    pub content: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub title: String,
    pub date: NaiveDate,
    pub slides: Vec<Slide>,
}

fn slide(title: &str, content: Vec<String>) -> Slide {
    Slide {
        title: title.to_string(),
        content,
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Six-slide outline for `product`
pub fn presentation(product: &str, report: &AggregatedReport) -> Presentation {
    let metrics = &report.metrics;
    let in_sprint = report
        .feature_summary
        .iter()
        .filter(|f| f.included_in_sprint)
        .count();

    let mut summary = vec![
        format!("{product} Continuous Improvement Cycle"),
        "Powered by Agentic AI System".to_string(),
        String::new(),
    ];
    summary.extend(report.key_insights.iter().cloned());

    Presentation {
        title: format!("{product} Continuous Improvement Update"),
        date: Local::now().date_naive(),
        slides: vec![
            slide("Executive Summary", summary),
            slide(
                "Feedback Analysis",
                vec![
                    format!("Analyzed {} feedback items", metrics.feedback_items_analyzed),
                    "Identified key pain points and improvement opportunities".to_string(),
                    "Categorized feedback by feature area and severity".to_string(),
                ],
            ),
            slide(
                "Feature Proposals",
                vec![
                    format!(
                        "Generated {} feature proposals",
                        metrics.feature_proposals_generated
                    ),
                    "Prioritized based on user impact and business value".to_string(),
                    "Aligned with product roadmap and strategic goals".to_string(),
                ],
            ),
            slide(
                "Technical Assessment",
                vec![
                    format!(
                        "Average feasibility score: {:.1}%",
                        metrics.average_feasibility_score
                    ),
                    "Evaluated implementation complexity and dependencies".to_string(),
                    "Identified technical risks and mitigation strategies".to_string(),
                ],
            ),
            slide(
                "Sprint Plan",
                vec![
                    format!(
                        "Capacity utilization: {:.1}%",
                        metrics.sprint_capacity_utilization
                    ),
                    format!("Features included in sprint: {in_sprint}"),
                    "Balanced technical feasibility with business priority".to_string(),
                ],
            ),
            slide(
                "Next Steps",
                lines(&[
                    "Review and approve sprint plan",
                    "Begin implementation of selected features",
                    "Continue monitoring user feedback",
                    "Next improvement cycle scheduled in 2 weeks",
                ]),
            ),
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Approve,
    Consider,
    Defer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub feature_id: String,
    pub title: String,
    pub business_impact: Priority,
    pub technical_feasibility: Level,
    pub resource_requirement: Level,
    pub recommendation: Recommendation,
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionMatrix {
    pub matrix: Vec<Decision>,
}

pub fn feasibility_level(score: f64) -> Level {
    if score >= 80.0 {
        Level::High
    } else if score >= 50.0 {
        Level::Medium
    } else {
        Level::Low
    }
}

pub fn resource_level(story_points: u32) -> Level {
    if story_points >= 13 {
        Level::High
    } else if story_points >= 8 {
        Level::Medium
    } else {
        Level::Low
    }
}

/// Recommendation for a feature outside the sprint
pub fn recommend(impact: Priority, feasibility: Level) -> Recommendation {
    match (impact, feasibility) {
        (Priority::Critical, Level::Medium | Level::High) => Recommendation::Approve,
        (Priority::High, Level::High) => Recommendation::Approve,
        (Priority::High, Level::Medium) | (Priority::Medium, Level::High) => {
            Recommendation::Consider
        }
        _ => Recommendation::Defer,
    }
}

/// One decision per summarized feature; sprint features are approved
pub fn decision_matrix(report: &AggregatedReport) -> DecisionMatrix {
    let matrix = report
        .feature_summary
        .iter()
        .map(|feature| {
            let technical_feasibility = feasibility_level(feature.feasibility);
            let resource_requirement = resource_level(feature.story_points);
            let recommendation = if feature.included_in_sprint {
                Recommendation::Approve
            } else {
                recommend(feature.priority, technical_feasibility)
            };
            Decision {
                feature_id: feature.id.clone(),
                title: feature.title.clone(),
                business_impact: feature.priority,
                technical_feasibility,
                resource_requirement,
                recommendation,
                rationale: format!(
                    "This feature has {} business impact and {} technical feasibility, requiring {} resources.",
                    feature.priority.to_string().to_lowercase(),
                    technical_feasibility.to_string().to_lowercase(),
                    resource_requirement.to_string().to_lowercase()
                ),
            }
        })
        .collect();

    DecisionMatrix { matrix }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderUpdate {
    pub aggregated_report: AggregatedReport,
    pub presentation: Presentation,
    pub decision_matrix: DecisionMatrix,
    pub iteration_summary: IterationSummary,
}

pub fn stakeholder_update(
    product: &str,
    stages: &StageResults<'_>,
    metrics: &IterationMetrics,
) -> StakeholderUpdate {
    let aggregated_report = aggregate(stages);
    StakeholderUpdate {
        presentation: presentation(product, &aggregated_report),
        decision_matrix: decision_matrix(&aggregated_report),
        aggregated_report,
        iteration_summary: metrics.summary(),
    }
}
