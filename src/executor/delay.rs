use super::{StepExecutor, StepOutcome};
use crate::error::ExecutorError;
use crate::parser::types::Step;
use async_trait::async_trait;
use std::time::Duration;

/// Control step that pauses the case for `ms` milliseconds
pub struct DelayStepExecutor;

#[async_trait]
impl StepExecutor for DelayStepExecutor {
    async fn execute(&self, step: &Step) -> Result<StepOutcome, ExecutorError> {
        let raw = step.required_attr("ms")?;
        let ms: u64 = raw.trim().parse().map_err(|_| {
            ExecutorError::InvalidConfig(format!("step '{}': invalid delay '{}'", step.name, raw))
        })?;

        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(StepOutcome::passed())
    }
}
