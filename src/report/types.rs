use crate::runner::state::CaseResult;
use serde::{Deserialize, Serialize};

/// Project-level results for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReport {
    pub session_id: String,
    pub project_name: String,
    pub generated_at: String,
    pub suites: Vec<SuiteReport>,
    pub summary: RunSummary,
    /// The run stopped early because cancellation was requested
    pub cancelled: bool,
}

impl ProjectReport {
    pub fn cases(&self) -> impl Iterator<Item = &CaseResult> {
        self.suites.iter().flat_map(|s| s.cases.iter())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub name: String,
    pub cases: Vec<CaseResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_cases: u32,
    pub passed: u32,
    pub failed: u32,
    pub cancelled: u32,
    pub total_steps: u32,
    pub total_duration_ms: u64,
}
