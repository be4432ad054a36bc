//! Technical feasibility stage
//!
//! [`FeasibilityAssessor`] scores a feature set; [`FeatureRegenerator`]
//! rewrites it when the score is too low. Both are pluggable so the
//! feasibility loop can be driven by heuristics, a model, or a test script.

use crate::error::IterationError;
use crate::proposals::Feature;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores below this count as low feasibility
pub const LOW_FEASIBILITY: f64 = 50.0;

const SHARED_DEPENDENCIES: [&str; 2] = ["Core API integration", "User authentication system"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    #[serde(rename = "Very Simple")]
    VerySimple,
    Simple,
    Moderate,
    Complex,
    #[serde(rename = "Very Complex")]
    VeryComplex,
}

impl Complexity {
    /// Complexity, story points and developer days for an impact score
    pub fn from_impact(impact: f64) -> (Self, u32, u32) {
        if impact > 80.0 {
            (Self::Complex, 13, 10)
        } else if impact > 60.0 {
            (Self::Moderate, 8, 5)
        } else if impact > 40.0 {
            (Self::Simple, 5, 3)
        } else {
            (Self::VerySimple, 3, 1)
        }
    }

    /// Starting feasibility before risk deductions
    pub fn base_feasibility(self) -> f64 {
        match self {
            Self::VeryComplex => 40.0,
            Self::Complex => 60.0,
            Self::Moderate => 80.0,
            Self::Simple | Self::VerySimple => 95.0,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VerySimple => "Very Simple",
            Self::Simple => "Simple",
            Self::Moderate => "Moderate",
            Self::Complex => "Complex",
            Self::VeryComplex => "Very Complex",
        };
        f.write_str(name)
    }
}

/// Low / Medium / High, used for risks and decision levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub description: String,
    pub severity: Level,
}

/// Feasibility of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAssessment {
    pub feature_id: String,
    pub title: String,
    pub complexity: Complexity,
    pub story_points: u32,
    pub developer_days: u32,
    pub dependencies: Vec<String>,
    pub risks: Vec<Risk>,
    pub technical_notes: String,
    pub feasibility_score: f64,
}

/// Feasibility of a feature set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityAssessment {
    pub total_story_points: u32,
    pub total_developer_days: u32,
    /// 0 for an empty set
    pub average_feasibility_score: f64,
    pub assessments: Vec<FeatureAssessment>,
}

impl FeasibilityAssessment {
    /// Totals and average over `assessments`
    pub fn from_assessments(assessments: Vec<FeatureAssessment>) -> Self {
        let average_feasibility_score = if assessments.is_empty() {
            0.0
        } else {
            assessments.iter().map(|a| a.feasibility_score).sum::<f64>() / assessments.len() as f64
        };
        Self {
            total_story_points: assessments.iter().map(|a| a.story_points).sum(),
            total_developer_days: assessments.iter().map(|a| a.developer_days).sum(),
            average_feasibility_score,
            assessments,
        }
    }

    pub fn get(&self, feature_id: &str) -> Option<&FeatureAssessment> {
        self.assessments.iter().find(|a| a.feature_id == feature_id)
    }

    /// Ids of features scoring under `threshold`
    pub fn below(&self, threshold: f64) -> Vec<String> {
        self.assessments
            .iter()
            .filter(|a| a.feasibility_score < threshold)
            .map(|a| a.feature_id.clone())
            .collect()
    }
}

/// Risk-adjusted feasibility, clamped to [10, 100]
pub fn feasibility_score(complexity: Complexity, risks: &[Risk]) -> f64 {
    let high = risks.iter().filter(|r| r.severity == Level::High).count();
    let deduction = (risks.len() * 2 + high * 5) as f64;
    (complexity.base_feasibility() - deduction).clamp(10.0, 100.0)
}

pub trait FeasibilityAssessor: Send + Sync {
    fn assess(&self, features: &[Feature]) -> Result<FeasibilityAssessment, IterationError>;
}

/// Impact-driven complexity with one integration risk per feature
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAssessor;

impl HeuristicAssessor {
    pub fn assess_feature(&self, feature: &Feature) -> FeatureAssessment {
        let (complexity, story_points, developer_days) = Complexity::from_impact(feature.impact_score);
        let risk_severity = match complexity {
            Complexity::Complex | Complexity::Moderate => Level::Medium,
            _ => Level::Low,
        };
        let risks = vec![Risk {
            description: "Integration with legacy systems may require additional work".to_string(),
            severity: risk_severity,
        }];

        FeatureAssessment {
            feature_id: feature.id.clone(),
            title: feature.title.clone(),
            complexity,
            story_points,
            developer_days,
            dependencies: SHARED_DEPENDENCIES.iter().map(|d| d.to_string()).collect(),
            feasibility_score: feasibility_score(complexity, &risks),
            risks,
            technical_notes: format!(
                "Implementation will require updates to the {} module.",
                feature.feature_area()
            ),
        }
    }
}

impl FeasibilityAssessor for HeuristicAssessor {
    fn assess(&self, features: &[Feature]) -> Result<FeasibilityAssessment, IterationError> {
        let assessment = FeasibilityAssessment::from_assessments(
            features.iter().map(|f| self.assess_feature(f)).collect(),
        );
        tracing::debug!(
            features = features.len(),
            average = assessment.average_feasibility_score,
            "Assessed feasibility"
        );
        Ok(assessment)
    }
}

pub trait FeatureRegenerator: Send + Sync {
    /// New feature set derived from `features` and their last assessment
    fn regenerate(
        &self,
        features: &[Feature],
        assessment: &FeasibilityAssessment,
    ) -> Result<Vec<Feature>, IterationError>;
}

/// Rewrites each low-feasibility feature as a simplified variant
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifyingRegenerator;

impl FeatureRegenerator for SimplifyingRegenerator {
    fn regenerate(
        &self,
        features: &[Feature],
        assessment: &FeasibilityAssessment,
    ) -> Result<Vec<Feature>, IterationError> {
        let low = assessment.below(LOW_FEASIBILITY);
        Ok(features
            .iter()
            .map(|feature| {
                let mut feature = feature.clone();
                if low.contains(&feature.id) {
                    feature.title = format!("Simplified {}", feature.title);
                    feature.description = format!("Simplified version of: {}", feature.description);
                }
                feature
            })
            .collect())
    }
}
