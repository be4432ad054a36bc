//! Feature proposal stage

use crate::analysis::{FeedbackAnalysis, FeedbackCategory};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Priority band for an impact score in [0, 100]
    pub fn from_impact(impact: f64) -> Self {
        if impact >= 80.0 {
            Self::Critical
        } else if impact >= 60.0 {
            Self::High
        } else if impact >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// 0 for Critical up to 3 for Low
    #[inline]
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// `F001`, `F002`, ...
    pub id: String,
    pub title: String,
    pub description: String,
    pub addressing_categories: Vec<String>,
    pub impact_score: f64,
    pub priority: Priority,
    pub rationale: String,
}

impl Feature {
    /// Feature area this feature touches, from its first category
    pub fn feature_area(&self) -> &str {
        self.addressing_categories
            .first()
            .and_then(|c| c.split(" - ").next())
            .unwrap_or("core")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProposals {
    pub features: Vec<Feature>,
}

impl FeatureProposals {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Count per priority, Critical first
    pub fn priority_distribution(&self) -> Vec<(Priority, usize)> {
        [
            Priority::Critical,
            Priority::High,
            Priority::Medium,
            Priority::Low,
        ]
        .into_iter()
        .map(|p| (p, self.features.iter().filter(|f| f.priority == p).count()))
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

/// One feature per category, weightiest categories first
pub fn propose_features(analysis: &FeedbackAnalysis) -> FeatureProposals {
    let mut categories: Vec<&FeedbackCategory> = analysis.categories.iter().collect();
    categories.sort_by(|a, b| b.weight().total_cmp(&a.weight()));

    let features = categories
        .into_iter()
        .enumerate()
        .map(|(i, category)| feature_for(i + 1, category))
        .collect();

    FeatureProposals { features }
}

fn feature_for(number: usize, category: &FeedbackCategory) -> Feature {
    let impact_score = (category.severity * 20.0).min(100.0);
    let example = category
        .examples
        .first()
        .map(String::as_str)
        .unwrap_or("N/A");

    Feature {
        id: format!("F{number:03}"),
        title: format!("Improve {}", category.category),
        description: format!(
            "Address user feedback regarding {} based on {} feedback items with average severity {:.1}/5.",
            category.category, category.count, category.severity
        ),
        addressing_categories: vec![category.category.clone()],
        impact_score,
        priority: Priority::from_impact(impact_score),
        rationale: format!(
            "This feature addresses {} feedback items with an average severity of {:.1}/5. Example feedback: {example}",
            category.count, category.severity
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_feedback;
    use crate::analysis::tests::sample;
    use pretty_assertions::assert_eq;

    #[test]
    fn priority_bands() {
        assert_eq!(Priority::from_impact(100.0), Priority::Critical);
        assert_eq!(Priority::from_impact(80.0), Priority::Critical);
        assert_eq!(Priority::from_impact(79.9), Priority::High);
        assert_eq!(Priority::from_impact(60.0), Priority::High);
        assert_eq!(Priority::from_impact(40.0), Priority::Medium);
        assert_eq!(Priority::from_impact(39.0), Priority::Low);
        assert!(Priority::Critical.rank() < Priority::Low.rank());
    }

    #[test]
    fn features_follow_category_weight() {
        let proposals = propose_features(&analyze_feedback(&sample()));

        // Search - bug: 4.5 x 2 = 9.0, Dashboard - bug: 3.0, Dashboard - usability: 2.0
        let ids: Vec<&str> = proposals.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["F001", "F002", "F003"]);

        let top = &proposals.features[0];
        assert_eq!(top.title, "Improve Search - bug");
        assert_eq!(top.impact_score, 90.0);
        assert_eq!(top.priority, Priority::Critical);
        assert_eq!(top.feature_area(), "Search");
        assert!(top
            .rationale
            .ends_with("Example feedback: Search crashes on empty query"));

        assert_eq!(proposals.features[1].title, "Improve Dashboard - bug");
        assert_eq!(proposals.features[2].priority, Priority::Medium);
    }

    #[test]
    fn distribution_counts_each_band() {
        let proposals = propose_features(&analyze_feedback(&sample()));
        assert_eq!(
            proposals.priority_distribution(),
            vec![
                (Priority::Critical, 1),
                (Priority::High, 1),
                (Priority::Medium, 1)
            ]
        );
    }
}
