use crate::runner::context::ReportMode;

/// Environment variable selecting detailed (per-step) reporting
pub const DETAILED_ENV: &str = "SOAPUI_DETAILED";

/// Runner configuration, fixed for the duration of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Report one check per step instead of one per test case
    pub detailed: bool,
}

impl RunnerConfig {
    pub fn detailed() -> Self {
        Self { detailed: true }
    }

    /// Read the configuration from the process environment.
    /// Anything other than a case-insensitive `true` counts as false.
    pub fn from_env() -> Self {
        let detailed = std::env::var(DETAILED_ENV)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self { detailed }
    }

    pub fn mode(&self) -> ReportMode {
        if self.detailed {
            ReportMode::Detailed
        } else {
            ReportMode::Summary
        }
    }
}
