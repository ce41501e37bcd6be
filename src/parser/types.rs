use crate::error::ParseError;
use crate::parser::substitute::substitute;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A loaded project: ordered suites of ordered test cases
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub suites: Vec<Suite>,
}

impl Project {
    pub fn case_count(&self) -> usize {
        self.suites.iter().map(|s| s.cases.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    pub name: String,
    pub cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub steps: Vec<Step>,

    /// Case properties, resolved into step configuration at execution time
    pub properties: HashMap<String, String>,

    /// Stop the case after the first step that does not end OK
    pub fail_on_error: bool,
}

/// Step kinds understood by the executor registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// HTTP/SOAP request against an endpoint
    Request,
    /// Pause the case for a fixed time
    Delay,
    /// Compare two values
    Assert,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Request => "request",
            StepKind::Delay => "delay",
            StepKind::Assert => "assert",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "request" | "soap" | "http" => Ok(StepKind::Request),
            "delay" => Ok(StepKind::Delay),
            "assert" => Ok(StepKind::Assert),
            other => Err(ParseError::Structure(format!("unknown step kind '{}'", other))),
        }
    }
}

/// A single executable step and the configuration its executor needs
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub kind: StepKind,
    pub attributes: HashMap<String, String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub assertions: Vec<Assertion>,
}

impl Step {
    pub fn new(name: &str, kind: StepKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            attributes: HashMap::new(),
            headers: Vec::new(),
            body: None,
            assertions: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }

    /// Get a required attribute or report which one is missing
    pub fn required_attr(&self, key: &str) -> Result<&str, crate::error::ExecutorError> {
        self.attr(key).ok_or_else(|| {
            crate::error::ExecutorError::InvalidConfig(format!(
                "step '{}' is missing the '{}' attribute",
                self.name, key
            ))
        })
    }

    /// Copy of this step with `${name}` placeholders in its configuration
    /// replaced through `lookup`. Unknown placeholders stay as written.
    pub fn resolve<F>(&self, lookup: F) -> Result<Step, ParseError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut attributes = HashMap::with_capacity(self.attributes.len());
        for (k, v) in &self.attributes {
            attributes.insert(k.clone(), substitute(v, &lookup)?);
        }

        let mut headers = Vec::with_capacity(self.headers.len());
        for (k, v) in &self.headers {
            headers.push((k.clone(), substitute(v, &lookup)?));
        }

        let body = match &self.body {
            Some(b) => Some(substitute(b, &lookup)?),
            None => None,
        };

        let mut assertions = Vec::with_capacity(self.assertions.len());
        for a in &self.assertions {
            let value = match &a.value {
                Some(v) => Some(substitute(v, &lookup)?),
                None => None,
            };
            assertions.push(Assertion {
                kind: a.kind,
                value,
            });
        }

        Ok(Step {
            name: self.name.clone(),
            kind: self.kind,
            attributes,
            headers,
            body,
            assertions,
        })
    }
}

/// Response assertion attached to a request step
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub kind: AssertionKind,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    /// Response status is one of a comma separated list of codes
    Status,
    Contains,
    NotContains,
    /// Response body matches a regex
    Matches,
    /// Response body carries no SOAP fault
    NoSoapFault,
}

impl AssertionKind {
    pub fn needs_value(&self) -> bool {
        !matches!(self, AssertionKind::NoSoapFault)
    }
}

impl FromStr for AssertionKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "status" => Ok(AssertionKind::Status),
            "contains" => Ok(AssertionKind::Contains),
            "not-contains" | "notcontains" => Ok(AssertionKind::NotContains),
            "matches" | "regex" => Ok(AssertionKind::Matches),
            "no-soap-fault" | "nosoapfault" => Ok(AssertionKind::NoSoapFault),
            other => Err(ParseError::Structure(format!(
                "unknown assertion type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssertionKind::Status => "status",
            AssertionKind::Contains => "contains",
            AssertionKind::NotContains => "not-contains",
            AssertionKind::Matches => "matches",
            AssertionKind::NoSoapFault => "no-soap-fault",
        };
        f.write_str(name)
    }
}
