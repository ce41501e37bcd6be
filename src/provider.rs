use crate::error::RunError;
use crate::parser;
use crate::report::types::ProjectReport;
use crate::report::CheckSink;
use crate::runner::{ProjectRunner, RunContext};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// Name under which the run operation is exposed to the host
pub const METHOD_NAME: &str = "soapui";

/// Fully qualified alias of [`METHOD_NAME`]
pub const QUALIFIED_METHOD_NAME: &str = "soapui.soapui";

/// Project file used when the operation is called without an argument
pub const DEFAULT_SOURCE: &str = "testcase.xml";

/// Where a project definition comes from
pub enum ProjectSource {
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
    Path(PathBuf),
}

impl ProjectSource {
    pub fn read(self) -> std::io::Result<Vec<u8>> {
        match self {
            ProjectSource::Bytes(bytes) => Ok(bytes),
            ProjectSource::Reader(mut reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
            ProjectSource::Path(path) => std::fs::read(path),
        }
    }
}

impl std::fmt::Debug for ProjectSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectSource::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            ProjectSource::Reader(_) => f.write_str("Reader"),
            ProjectSource::Path(p) => write!(f, "Path({})", p.display()),
        }
    }
}

impl From<&str> for ProjectSource {
    fn from(path: &str) -> Self {
        ProjectSource::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for ProjectSource {
    fn from(path: PathBuf) -> Self {
        ProjectSource::Path(path)
    }
}

impl From<Vec<u8>> for ProjectSource {
    fn from(bytes: Vec<u8>) -> Self {
        ProjectSource::Bytes(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescription {
    pub name: String,
    pub description: String,
    pub types: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescription {
    pub namespace: String,
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterDescription>,
    pub return_values: Vec<ParameterDescription>,
}

/// Host-facing entry point: resolves method names to the run operation and
/// describes what it offers.
#[derive(Debug, Clone)]
pub struct SoapUiProvider {
    runner: Arc<ProjectRunner>,
}

impl SoapUiProvider {
    pub fn new(runner: ProjectRunner) -> Self {
        Self {
            runner: Arc::new(runner),
        }
    }

    /// `soapui` matches case-insensitively, `soapui.soapui` only exactly
    pub fn resolve(&self, name: &str) -> Option<RunOperation> {
        if name.eq_ignore_ascii_case(METHOD_NAME) || name == QUALIFIED_METHOD_NAME {
            Some(RunOperation {
                runner: self.runner.clone(),
            })
        } else {
            None
        }
    }

    pub fn available_methods(&self) -> Vec<MethodDescription> {
        vec![MethodDescription {
            namespace: METHOD_NAME.to_string(),
            name: METHOD_NAME.to_string(),
            description: "This will run a soapUI project file".to_string(),
            parameters: vec![ParameterDescription {
                name: "script".to_string(),
                description: "You can pass in the name of the project file that holds the \
                              soapui tests or alternatively you can pass in byte[] or InputStream"
                    .to_string(),
                types: "String, byte[], InputStream".to_string(),
            }],
            return_values: Vec::new(),
        }]
    }
}

/// The resolved run operation
#[derive(Debug, Clone)]
pub struct RunOperation {
    runner: Arc<ProjectRunner>,
}

impl RunOperation {
    /// Load the first argument (or `testcase.xml`) and run it, reporting checks
    /// to `sink`. Only load failures are errors; failing tests are reported.
    pub async fn run(
        &self,
        args: Vec<ProjectSource>,
        context: &mut RunContext,
        sink: &mut dyn CheckSink,
    ) -> Result<ProjectReport, RunError> {
        let source = args
            .into_iter()
            .next()
            .unwrap_or_else(|| ProjectSource::from(DEFAULT_SOURCE));
        log::debug!("Loading project from {:?}", source);

        let bytes = source.read()?;
        let project = parser::load_project_bytes(bytes, context)?;

        Ok(self.runner.run(&project, context, sink).await)
    }

    /// Host invocation contract: `true` on normal completion
    pub async fn evaluate(
        &self,
        args: Vec<ProjectSource>,
        context: &mut RunContext,
        sink: &mut dyn CheckSink,
    ) -> Result<bool, RunError> {
        self.run(args, context, sink).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CollectingSink;
    use crate::utils::config::RunnerConfig;
    use std::io::Cursor;

    const PROJECT: &str = r#"<project name="Checks">
  <suite name="Values">
    <case name="Equal">
      <properties><property name="answer" value="42"/></properties>
      <step name="compare" kind="assert" actual="${answer}" expected="42"/>
    </case>
    <case name="Different">
      <step name="compare" kind="assert" actual="${left}" expected="2"/>
    </case>
  </suite>
</project>"#;

    fn provider() -> SoapUiProvider {
        SoapUiProvider::new(ProjectRunner::standard(RunnerConfig::default()))
    }

    #[test]
    fn test_resolve_names() {
        let p = provider();
        assert!(p.resolve("soapui").is_some());
        assert!(p.resolve("SoapUI").is_some());
        assert!(p.resolve("soapui.soapui").is_some());
        assert!(p.resolve("SOAPUI.SOAPUI").is_none());
        assert!(p.resolve("junit").is_none());
    }

    #[test]
    fn test_available_methods() {
        let methods = provider().available_methods();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "soapui");
        assert_eq!(methods[0].parameters[0].name, "script");
    }

    #[tokio::test]
    async fn test_evaluate_bytes_source() {
        let op = provider().resolve("soapui").unwrap();
        let mut ctx = RunContext::default();
        ctx.set_var("left", "1");
        let mut sink = CollectingSink::new();

        let ok = op
            .evaluate(vec![PROJECT.as_bytes().to_vec().into()], &mut ctx, &mut sink)
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(sink.checks.len(), 2);
        assert!(sink.checks[0].success);
        assert!(!sink.checks[1].success);
        assert_eq!(sink.checks[1].message, "expected '2' but was '1'");
    }

    #[tokio::test]
    async fn test_evaluate_reader_source() {
        let op = provider().resolve("soapui").unwrap();
        let mut sink = CollectingSink::new();
        let source = ProjectSource::Reader(Box::new(Cursor::new(PROJECT.as_bytes().to_vec())));

        let report = op
            .run(vec![source], &mut RunContext::default(), &mut sink)
            .await
            .unwrap();
        assert_eq!(report.project_name, "Checks");
        assert_eq!(report.summary.total_cases, 2);
    }

    #[tokio::test]
    async fn test_evaluate_path_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.xml");
        std::fs::write(&path, PROJECT).unwrap();

        let op = provider().resolve("soapui").unwrap();
        let mut sink = CollectingSink::new();
        let ok = op
            .evaluate(vec![path.into()], &mut RunContext::default(), &mut sink)
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(sink.checks.len(), 2);
    }

    /// Switches the working directory and puts it back on drop, even when
    /// the test panics
    struct CurrentDirGuard {
        original: std::path::PathBuf,
    }

    impl CurrentDirGuard {
        fn enter(dir: &std::path::Path) -> Self {
            let original = std::env::current_dir().unwrap();
            std::env::set_current_dir(dir).unwrap();
            Self { original }
        }
    }

    impl Drop for CurrentDirGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.original);
        }
    }

    #[tokio::test]
    async fn test_missing_argument_defaults_to_testcase_xml() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = CurrentDirGuard::enter(dir.path());

        let op = provider().resolve("soapui").unwrap();
        let mut sink = CollectingSink::new();
        let missing = op.run(vec![], &mut RunContext::default(), &mut sink).await;
        assert!(matches!(missing, Err(RunError::Io(_))));

        std::fs::write(dir.path().join(DEFAULT_SOURCE), PROJECT).unwrap();
        let found = op.run(vec![], &mut RunContext::default(), &mut sink).await;
        assert_eq!(found.unwrap().project_name, "Checks");
    }

    #[tokio::test]
    async fn test_case_property_wins_over_dynamic_value_of_same_name() {
        let project = r#"<project name="Dates">
  <suite name="s">
    <case name="Fixed date">
      <properties><property name="date" value="2020-01-01"/></properties>
      <step name="compare" kind="assert" actual="${date}" expected="2020-01-01"/>
    </case>
  </suite>
</project>"#;
        let op = provider().resolve("soapui").unwrap();
        let mut sink = CollectingSink::new();

        op.evaluate(
            vec![project.as_bytes().to_vec().into()],
            &mut RunContext::default(),
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(sink.checks.len(), 1);
        assert!(sink.checks[0].success, "{}", sink.checks[0].message);
    }

    #[tokio::test]
    async fn test_malformed_project_fails_without_checks() {
        let op = provider().resolve("soapui").unwrap();
        let mut sink = CollectingSink::new();
        let err = op
            .evaluate(
                vec![b"<project name=\"x\"><suite name=\"s\">".to_vec().into()],
                &mut RunContext::default(),
                &mut sink,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Parse(_)));
        assert!(sink.checks.is_empty());
    }
}
