use super::assertion::compare;
use super::{StepExecutor, StepOutcome};
use crate::error::ExecutorError;
use crate::parser::types::Step;
use async_trait::async_trait;

/// Compares `actual` with `expected` using `operator` (`equals` by default).
/// Values usually come from case properties resolved before execution.
pub struct AssertStepExecutor;

#[async_trait]
impl StepExecutor for AssertStepExecutor {
    async fn execute(&self, step: &Step) -> Result<StepOutcome, ExecutorError> {
        let actual = step.required_attr("actual")?;
        let expected = step.required_attr("expected")?;
        let operator = step.attr("operator").unwrap_or("equals");

        match compare(operator, actual, expected)? {
            None => Ok(StepOutcome::passed()),
            Some(message) => Ok(StepOutcome::failed(message)),
        }
    }
}
