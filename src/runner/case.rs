use super::context::{ambient_var, CancellationFlag};
use super::state::{CaseResult, CaseState, StepResult, StepStatus};
use crate::error::ExecutorError;
use crate::executor::ExecutorRegistry;
use crate::parser::types::{Step, TestCase};
use std::time::Instant;

/// Runs the steps of one test case in declaration order.
///
/// Every step runs even after a failure, unless the case sets `failOnError`.
/// Cancellation is polled before each step; a step in flight is never
/// interrupted.
pub struct TestCaseRunner<'a> {
    executors: &'a ExecutorRegistry,
}

impl<'a> TestCaseRunner<'a> {
    pub fn new(executors: &'a ExecutorRegistry) -> Self {
        Self { executors }
    }

    pub async fn run(
        &self,
        suite_name: &str,
        case: &TestCase,
        cancellation: &CancellationFlag,
    ) -> CaseResult {
        let mut state = CaseState::new(suite_name, &case.name);
        state.start();

        for step in &case.steps {
            if cancellation.is_cancelled() {
                state.cancel("run cancelled");
                break;
            }

            let result = self.run_step(case, step).await;
            let passed = result.is_ok();
            state.record(result);

            if !passed && case.fail_on_error {
                state.stop(format!("stopped after failed step '{}'", step.name));
                break;
            }
        }

        state.finish()
    }

    async fn run_step(&self, case: &TestCase, step: &Step) -> StepResult {
        let started = Instant::now();

        let lookup = |name: &str| {
            case.properties
                .get(name)
                .cloned()
                .or_else(|| ambient_var(name))
        };
        let outcome = match step.resolve(lookup) {
            Ok(resolved) => self.executors.execute(&resolved).await,
            Err(e) => Err(ExecutorError::InvalidConfig(e.to_string())),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(outcome) => StepResult {
                step_name: step.name.clone(),
                status: if outcome.passed {
                    StepStatus::Ok
                } else {
                    StepStatus::Failed
                },
                duration_ms,
                error: outcome.error,
                messages: outcome.messages,
            },
            Err(e) => {
                log::warn!("Step '{}' in '{}' errored: {}", step.name, case.name, e);
                StepResult::error(&step.name, e.to_string(), duration_ms)
            }
        }
    }
}
