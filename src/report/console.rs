use super::types::ProjectReport;
use super::{Check, CheckSink};
use colored::Colorize;

/// Prints checks to stdout as they arrive and keeps pass/fail counts
#[derive(Debug, Default)]
pub struct ConsoleSink {
    pub passed: u32,
    pub failed: u32,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn print_summary(&self, report: &ProjectReport) {
        let summary = &report.summary;
        println!(
            "\n{} Project finished: {}",
            "■".blue().bold(),
            report.project_name.white().bold()
        );
        println!("  Total cases: {}", summary.total_cases);
        println!("  Total steps: {}", summary.total_steps);
        println!(
            "  {} passed, {} failed, {} cancelled",
            summary.passed.to_string().green(),
            summary.failed.to_string().red(),
            summary.cancelled.to_string().yellow()
        );
        println!("  Duration: {}ms", summary.total_duration_ms);
        if report.cancelled {
            println!("  {}", "Run was cancelled before completion".yellow());
        }
    }
}

impl CheckSink for ConsoleSink {
    fn check(&mut self, check: Check) {
        let group = check
            .group
            .as_deref()
            .map(|g| format!("[{}] ", g).dimmed().to_string())
            .unwrap_or_default();

        if check.success {
            self.passed += 1;
            println!("  {} {}{}", "✓".green(), group, check.label);
        } else {
            self.failed += 1;
            let marker = if check.warning_only {
                "⚠".yellow()
            } else {
                "✗".red()
            };
            println!("  {} {}{}", marker, group, check.label.bold());
            println!("      {}", check.message.red());
        }
    }
}
