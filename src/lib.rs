pub mod error;
pub mod executor;
pub mod parser;
pub mod provider;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::{ExecutorError, ParseError, RunError};
pub use provider::{ProjectSource, SoapUiProvider};
pub use report::{Check, CheckSink};
pub use runner::{CancellationFlag, ProjectRunner, RunContext};
pub use utils::config::RunnerConfig;
