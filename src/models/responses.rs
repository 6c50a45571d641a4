use serde::{Deserialize, Serialize};

use crate::core::{MatchReport, ThemeSelection};
use crate::models::domain::{Category, Group};

/// Response for the match endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchGroupsResponse {
    pub groups: Vec<Group>,
    pub summary: MatchSummary,
}

/// Condensed view of a `MatchReport`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub placed: usize,
    pub initial_cost: f64,
    pub social_score_before: f64,
    pub social_score_after: f64,
    pub swaps: usize,
    pub passes: usize,
}

impl From<&MatchReport> for MatchSummary {
    fn from(report: &MatchReport) -> Self {
        Self {
            placed: report.placed,
            initial_cost: report.initial_cost,
            social_score_before: report.social_score_before,
            social_score_after: report.social_score_after,
            swaps: report.refinement.swaps.len(),
            passes: report.refinement.passes,
        }
    }
}

/// Response for the theme selection endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectThemesResponse {
    pub themes: Vec<Category>,
    pub total_cost: f64,
    pub evaluated: usize,
}

impl From<ThemeSelection> for SelectThemesResponse {
    fn from(selection: ThemeSelection) -> Self {
        Self {
            themes: selection.themes,
            total_cost: selection.total_cost,
            evaluated: selection.evaluated,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
