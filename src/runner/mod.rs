pub mod case;
pub mod context;
pub mod state;

use crate::executor::ExecutorRegistry;
use crate::parser::types::Project;
use crate::report::types::ProjectReport;
use crate::report::{CheckSink, Reporter};
use crate::utils::config::RunnerConfig;

pub use case::TestCaseRunner;
pub use context::{CancellationFlag, ReportMode, RunContext};
pub use state::*;

/// Walks a project depth-first: suites, then cases, then steps, strictly in
/// declaration order.
///
/// Cancellation is polled before each suite and each case. Checks are
/// emitted to the sink as each case completes.
#[derive(Debug)]
pub struct ProjectRunner {
    executors: ExecutorRegistry,
    config: RunnerConfig,
}

impl ProjectRunner {
    pub fn new(executors: ExecutorRegistry, config: RunnerConfig) -> Self {
        Self { executors, config }
    }

    /// Runner with the built-in executors
    pub fn standard(config: RunnerConfig) -> Self {
        Self::new(ExecutorRegistry::standard(), config)
    }

    pub async fn run(
        &self,
        project: &Project,
        context: &mut RunContext,
        sink: &mut dyn CheckSink,
    ) -> ProjectReport {
        log::debug!("Project: {}", project.name);

        let reporter = Reporter::new(self.config.mode());
        let case_runner = TestCaseRunner::new(&self.executors);
        let mut session = state::SessionState::new(&project.name);

        for suite in &project.suites {
            if context.is_cancelled() {
                session.mark_cancelled();
                break;
            }

            log::debug!("Testsuite: {}", suite.name);
            session.begin_suite(&suite.name);
            let scope = context.enter_group(&suite.name);

            for case in &suite.cases {
                if scope.is_cancelled() {
                    session.mark_cancelled();
                    break;
                }

                log::debug!("Testcase: {}", case.name);
                let result = case_runner
                    .run(&suite.name, case, scope.cancellation())
                    .await;
                if result.status == CaseStatus::Cancelled {
                    session.mark_cancelled();
                }

                reporter.report(&result, scope.group(), sink);
                session.add_case(result);
            }
        }

        session.finish()
    }
}
