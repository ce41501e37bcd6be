use crate::report::types::{ProjectReport, RunSummary, SuiteReport};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Step execution status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Ok,
    /// The step ran but an assertion did not hold
    Failed,
    /// The executor could not run the step
    Error,
    Cancelled,
}

/// Outcome of one step execution. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    /// Raw message payloads, e.g. assertion messages and the response body
    #[serde(default)]
    pub messages: Vec<String>,
}

impl StepResult {
    pub fn ok(step_name: &str, duration_ms: u64) -> Self {
        Self {
            step_name: step_name.to_string(),
            status: StepStatus::Ok,
            duration_ms,
            error: None,
            messages: Vec::new(),
        }
    }

    pub fn error(step_name: &str, error: String, duration_ms: u64) -> Self {
        Self {
            step_name: step_name.to_string(),
            status: StepStatus::Error,
            duration_ms,
            error: Some(error),
            messages: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StepStatus::Ok
    }

    /// Single-line description of why the step did not pass.
    ///
    /// The error message wins; otherwise the first payload, compacted;
    /// otherwise `"unknown"`.
    pub fn diagnostic(&self) -> String {
        if let Some(ref error) = self.error {
            return error.clone();
        }
        if let Some(first) = self.messages.first() {
            return compact_payload(first);
        }
        "unknown".to_string()
    }
}

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\r\n]+").unwrap_or_else(|e| panic!("BUG: invalid line break pattern: {}", e))
});

static INTER_TAG_SPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r">\s+<").unwrap_or_else(|e| panic!("BUG: invalid inter-tag pattern: {}", e))
});

/// Strip line breaks and collapse whitespace between tags (`>  <` becomes `><`)
pub fn compact_payload(raw: &str) -> String {
    let single_line = LINE_BREAKS.replace_all(raw, "");
    INTER_TAG_SPACE.replace_all(&single_line, "><").into_owned()
}

/// Final status of a test case, derived once its steps have run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaseStatus {
    Ok,
    Failed,
    Cancelled,
}

/// Mutable state of a case while its steps run
#[derive(Debug, Clone)]
pub struct CaseState {
    pub case_name: String,
    pub suite_name: String,
    pub steps: Vec<StepResult>,
    pub started_at: Option<Instant>,
    abort_reason: Option<String>,
    cancelled: bool,
}

impl CaseState {
    pub fn new(suite_name: &str, case_name: &str) -> Self {
        Self {
            case_name: case_name.to_string(),
            suite_name: suite_name.to_string(),
            steps: Vec::new(),
            started_at: None,
            abort_reason: None,
            cancelled: false,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn record(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    /// Stop because the run was cancelled; remaining steps stay unexecuted
    pub fn cancel(&mut self, reason: &str) {
        self.cancelled = true;
        self.abort_reason = Some(reason.to_string());
    }

    /// Stop early for a reason of the runner's own (fail-on-error)
    pub fn stop(&mut self, reason: String) {
        self.abort_reason = Some(reason);
    }

    pub fn finish(self) -> CaseResult {
        let duration_ms = self
            .started_at
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0);

        let status = if self.cancelled {
            CaseStatus::Cancelled
        } else if self.steps.iter().all(StepResult::is_ok) && self.abort_reason.is_none() {
            CaseStatus::Ok
        } else {
            CaseStatus::Failed
        };

        let last_error = self
            .steps
            .iter()
            .rev()
            .find(|s| !s.is_ok())
            .map(StepResult::diagnostic);

        CaseResult {
            case_name: self.case_name,
            suite_name: self.suite_name,
            status,
            steps: self.steps,
            duration_ms,
            last_error,
            abort_reason: self.abort_reason,
        }
    }
}

/// Final result of one test case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub case_name: String,
    pub suite_name: String,
    pub status: CaseStatus,
    pub steps: Vec<StepResult>,
    pub duration_ms: u64,
    /// Diagnostic of the most recent step that did not end OK
    pub last_error: Option<String>,
    pub abort_reason: Option<String>,
}

impl CaseResult {
    pub fn is_ok(&self) -> bool {
        self.status == CaseStatus::Ok
    }

    /// Message for a failing case: the last failing step's diagnostic, then
    /// the runner's abort reason.
    pub fn failure_message(&self) -> String {
        self.last_error
            .clone()
            .or_else(|| self.abort_reason.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Aggregates case results for the whole project run
#[derive(Debug)]
pub struct SessionState {
    pub session_id: String,
    pub project_name: String,
    suites: Vec<SuiteReport>,
    started_at: Instant,
    cancelled: bool,
}

impl SessionState {
    pub fn new(project_name: &str) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            project_name: project_name.to_string(),
            suites: Vec::new(),
            started_at: Instant::now(),
            cancelled: false,
        }
    }

    pub fn begin_suite(&mut self, name: &str) {
        self.suites.push(SuiteReport {
            name: name.to_string(),
            cases: Vec::new(),
        });
    }

    pub fn add_case(&mut self, result: CaseResult) {
        if self.suites.last().map(|s| s.name != result.suite_name).unwrap_or(true) {
            self.begin_suite(&result.suite_name);
        }
        if let Some(suite) = self.suites.last_mut() {
            suite.cases.push(result);
        }
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for case in self.suites.iter().flat_map(|s| &s.cases) {
            summary.total_cases += 1;
            summary.total_steps += case.steps.len() as u32;
            match case.status {
                CaseStatus::Ok => summary.passed += 1,
                CaseStatus::Cancelled => summary.cancelled += 1,
                _ => summary.failed += 1,
            }
        }
        summary.total_duration_ms = self.started_at.elapsed().as_millis() as u64;
        summary
    }

    pub fn finish(self) -> ProjectReport {
        let summary = self.summary();
        ProjectReport {
            session_id: self.session_id,
            project_name: self.project_name,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            suites: self.suites,
            summary,
            cancelled: self.cancelled,
        }
    }
}
