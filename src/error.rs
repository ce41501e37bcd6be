use thiserror::Error;

/// Failure to turn a project source into a [`crate::parser::types::Project`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("project source is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("placeholder substitution failed: {0}")]
    Substitution(String),

    #[error("malformed project XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid project definition: {0}")]
    Structure(String),
}

/// Fatal failure of a whole invocation. Raised before any check is reported.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to read project source: {0}")]
    Io(#[from] std::io::Error),
}

/// Infrastructure failure while executing a single step.
///
/// The case runner downgrades these to a step result with status `ERROR`;
/// they never abort the surrounding case.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("invalid step configuration: {0}")]
    InvalidConfig(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no executor registered for step kind '{0}'")]
    Unsupported(String),
}
