pub mod console;
pub mod json;
pub mod junit;
pub mod types;

use crate::runner::context::ReportMode;
use crate::runner::state::CaseResult;
use anyhow::Result;
use std::path::Path;

/// A single pass/fail assertion surfaced to the invoking host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub label: String,
    pub success: bool,
    /// `"true"` on success, otherwise the failure diagnostic
    pub message: String,
    pub warning_only: bool,
    /// Group label active when the check was emitted
    pub group: Option<String>,
}

/// Receives checks as the run progresses
pub trait CheckSink {
    fn check(&mut self, check: Check);
}

/// Keeps every check in memory, in emission order
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub checks: Vec<Check>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.label.as_str()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.success)
    }
}

impl CheckSink for CollectingSink {
    fn check(&mut self, check: Check) {
        self.checks.push(check);
    }
}

/// Turns case results into checks according to the reporting mode
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    mode: ReportMode,
}

impl Reporter {
    pub fn new(mode: ReportMode) -> Self {
        Self { mode }
    }

    pub fn checks_for(&self, case: &CaseResult, group: Option<&str>) -> Vec<Check> {
        let group = group.map(|g| g.to_string());
        match self.mode {
            ReportMode::Detailed => case
                .steps
                .iter()
                .map(|step| {
                    let success = step.is_ok();
                    Check {
                        label: format!(
                            "{} - {} ({}ms)",
                            case.case_name, step.step_name, step.duration_ms
                        ),
                        success,
                        message: if success {
                            "true".to_string()
                        } else {
                            step.diagnostic()
                        },
                        warning_only: false,
                        group: group.clone(),
                    }
                })
                .collect(),
            ReportMode::Summary => {
                let success = case.is_ok();
                vec![Check {
                    label: format!("{} ({}ms)", case.case_name, case.duration_ms),
                    success,
                    message: if success {
                        "true".to_string()
                    } else {
                        case.failure_message()
                    },
                    warning_only: false,
                    group,
                }]
            }
        }
    }

    pub fn report(&self, case: &CaseResult, group: Option<&str>, sink: &mut dyn CheckSink) {
        for check in self.checks_for(case, group) {
            sink.check(check);
        }
    }
}

/// Write `test-results.json` and `junit.xml` into `output_dir`
pub fn write_reports(report: &types::ProjectReport, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    json::generate(report, Some(&output_dir.join("test-results.json")))?;
    junit::write_report(report, output_dir)?;
    Ok(())
}
