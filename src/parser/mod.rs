pub mod substitute;
pub mod types;
pub mod xml;

use crate::error::ParseError;
use crate::runner::context::RunContext;
use types::Project;

/// Load a project definition from text.
///
/// Placeholders naming a host variable of the run context are substituted
/// before the XML is parsed; other names are left for execution time.
/// No step is executed.
pub fn load_project(content: &str, context: &RunContext) -> Result<Project, ParseError> {
    let substituted = substitute::substitute(content, |name| context.get_var(name))?;
    xml::parse_project(&substituted)
}

/// Load a project definition from raw UTF-8 bytes
pub fn load_project_bytes(bytes: Vec<u8>, context: &RunContext) -> Result<Project, ParseError> {
    let content = String::from_utf8(bytes)?;
    load_project(&content, context)
}
