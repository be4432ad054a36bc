//! Feedback analysis stage
//!
//! Groups raw feedback into `"<area> - <type>"` categories and summarizes
//! counts and severities.

use crate::error::PipelineError;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Severity at or above which an item counts as high severity
pub const HIGH_SEVERITY: u8 = 4;

const MAX_EXAMPLES: usize = 3;

/// One piece of user feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub date: NaiveDate,
    #[serde(default)]
    pub user_id: String,
    pub feedback_type: String,
    pub feature_area: String,
    /// 1 (cosmetic) to 5 (blocking)
    pub severity: u8,
    pub description: String,
}

impl FeedbackItem {
    pub fn new(
        date: NaiveDate,
        feedback_type: impl Into<String>,
        feature_area: impl Into<String>,
        severity: u8,
        description: impl Into<String>,
    ) -> Self {
        Self {
            date,
            user_id: String::new(),
            feedback_type: feedback_type.into(),
            feature_area: feature_area.into(),
            severity,
            description: description.into(),
        }
    }

    /// One line for prompts
    pub fn render(&self) -> String {
        format!(
            "- [{}] {} / {} (severity {}/5): {}",
            self.date, self.feedback_type, self.feature_area, self.severity, self.description
        )
    }
}

/// Validate severities; items are otherwise taken as given
pub fn validate_feedback(items: &[FeedbackItem]) -> Result<(), PipelineError> {
    match items
        .iter()
        .enumerate()
        .find(|(_, item)| !(1..=5).contains(&item.severity))
    {
        Some((index, item)) => Err(PipelineError::InvalidSeverity {
            index,
            severity: item.severity,
        }),
        None => Ok(()),
    }
}

/// Read a JSON array of [`FeedbackItem`]s
pub fn load_feedback(path: &Path) -> Result<Vec<FeedbackItem>, PipelineError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PipelineError::ReadFeedback {
        path: path.to_path_buf(),
        source,
    })?;
    let items: Vec<FeedbackItem> =
        serde_json::from_str(&raw).map_err(|source| PipelineError::ParseFeedback {
            path: path.to_path_buf(),
            source,
        })?;
    validate_feedback(&items)?;
    tracing::info!(path = %path.display(), count = items.len(), "Loaded feedback");
    Ok(items)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub feedback_types: IndexMap<String, usize>,
    pub feature_areas: IndexMap<String, usize>,
    pub high_severity_count: usize,
    pub average_severity_by_area: IndexMap<String, f64>,
}

/// Feedback sharing one feature area and feedback type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCategory {
    /// `"<area> - <type>"`
    pub category: String,
    pub feature_area: String,
    pub feedback_type: String,
    pub count: usize,
    /// Mean severity of the category's items
    pub severity: f64,
    pub insights: Vec<String>,
    pub examples: Vec<String>,
}

impl FeedbackCategory {
    /// Weight used to rank categories against each other
    pub fn weight(&self) -> f64 {
        self.severity * self.count as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAnalysis {
    pub total_feedback_count: usize,
    /// `None` when there is no feedback
    pub date_range: Option<DateRange>,
    pub summary: FeedbackSummary,
    pub categories: Vec<FeedbackCategory>,
}

/// Categorize feedback
///
/// Areas and types keep first-appearance order.
pub fn analyze_feedback(items: &[FeedbackItem]) -> FeedbackAnalysis {
    let mut summary = FeedbackSummary::default();
    let mut grouped: IndexMap<&str, IndexMap<&str, Vec<&FeedbackItem>>> = IndexMap::new();
    let mut severity_by_area: IndexMap<&str, (u32, usize)> = IndexMap::new();

    for item in items {
        *summary
            .feedback_types
            .entry(item.feedback_type.clone())
            .or_default() += 1;
        *summary
            .feature_areas
            .entry(item.feature_area.clone())
            .or_default() += 1;
        if item.severity >= HIGH_SEVERITY {
            summary.high_severity_count += 1;
        }

        let (sum, count) = severity_by_area.entry(&item.feature_area).or_default();
        *sum += u32::from(item.severity);
        *count += 1;

        grouped
            .entry(&item.feature_area)
            .or_default()
            .entry(&item.feedback_type)
            .or_default()
            .push(item);
    }

    summary.average_severity_by_area = severity_by_area
        .into_iter()
        .map(|(area, (sum, count))| (area.to_string(), f64::from(sum) / count as f64))
        .collect();

    let categories = grouped
        .into_iter()
        .flat_map(|(area, by_type)| {
            by_type
                .into_iter()
                .map(move |(kind, members)| categorize(area, kind, &members))
        })
        .collect();

    let date_range = items
        .iter()
        .map(|item| item.date)
        .min()
        .zip(items.iter().map(|item| item.date).max())
        .map(|(start, end)| DateRange { start, end });

    FeedbackAnalysis {
        total_feedback_count: items.len(),
        date_range,
        summary,
        categories,
    }
}

fn categorize(area: &str, kind: &str, members: &[&FeedbackItem]) -> FeedbackCategory {
    let total: u32 = members.iter().map(|item| u32::from(item.severity)).sum();
    let severity = f64::from(total) / members.len() as f64;

    FeedbackCategory {
        category: format!("{area} - {kind}"),
        feature_area: area.to_string(),
        feedback_type: kind.to_string(),
        count: members.len(),
        severity,
        insights: vec![
            format!("Users report issues with {area} when performing {kind} actions"),
            format!("Average severity is {severity:.1}/5"),
        ],
        examples: members
            .iter()
            .take(MAX_EXAMPLES)
            .map(|item| item.description.clone())
            .collect(),
    }
}
