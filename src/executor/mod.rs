pub mod assert;
pub mod assertion;
pub mod delay;
pub mod http;

use crate::error::ExecutorError;
use crate::parser::types::{Step, StepKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Normal completion of a step. A failed assertion is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub passed: bool,
    pub error: Option<String>,
    /// Diagnostic payloads (assertion messages, response body)
    pub messages: Vec<String>,
}

impl StepOutcome {
    pub fn passed() -> Self {
        Self {
            passed: true,
            error: None,
            messages: Vec::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            passed: false,
            error: Some(error.into()),
            messages: Vec::new(),
        }
    }

    /// Failed without an error message; the payloads carry the diagnostic
    pub fn failed_with_messages(messages: Vec<String>) -> Self {
        Self {
            passed: false,
            error: None,
            messages,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

/// Performs one step against a live target.
///
/// Implementations return `Err` only for infrastructure problems (transport,
/// malformed configuration). Assertion failures come back as a failed
/// [`StepOutcome`].
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(&self, step: &Step) -> Result<StepOutcome, ExecutorError>;
}

/// Executors selected by step kind, configured once before the run
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<StepKind, Arc<dyn StepExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in request, delay and assert executors
    pub fn standard() -> Self {
        Self::new()
            .with(StepKind::Request, http::HttpStepExecutor::new())
            .with(StepKind::Delay, delay::DelayStepExecutor)
            .with(StepKind::Assert, assert::AssertStepExecutor)
    }

    pub fn with<E: StepExecutor + 'static>(mut self, kind: StepKind, executor: E) -> Self {
        self.register(kind, Arc::new(executor));
        self
    }

    pub fn register(&mut self, kind: StepKind, executor: Arc<dyn StepExecutor>) {
        self.executors.insert(kind, executor);
    }

    pub fn get(&self, kind: StepKind) -> Option<&Arc<dyn StepExecutor>> {
        self.executors.get(&kind)
    }

    pub async fn execute(&self, step: &Step) -> Result<StepOutcome, ExecutorError> {
        let executor = self
            .get(step.kind)
            .ok_or_else(|| ExecutorError::Unsupported(step.kind.to_string()))?;
        executor.execute(step).await
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.executors.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ExecutorRegistry").field("kinds", &kinds).finish()
    }
}
