use crate::error::ExecutorError;
use crate::parser::types::{Assertion, AssertionKind};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

/// What a request step got back
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// Evaluate response assertions. Returns one message per assertion that did not hold.
pub fn evaluate(assertions: &[Assertion], response: &Response) -> Result<Vec<String>, ExecutorError> {
    let mut failures = Vec::new();

    if assertions.is_empty() {
        if response.status >= 400 {
            failures.push(format!("[status] unexpected HTTP status {}", response.status));
        }
        return Ok(failures);
    }

    for assertion in assertions {
        let value = assertion.value.as_deref().unwrap_or_default();
        let failure = match assertion.kind {
            AssertionKind::Status => check_status(value, response.status)?,
            AssertionKind::Contains => (!response.body.contains(value))
                .then(|| format!("[contains] missing token '{}' in response", value)),
            AssertionKind::NotContains => response
                .body
                .contains(value)
                .then(|| format!("[not-contains] response contains token '{}'", value)),
            AssertionKind::Matches => {
                let re = compile(value)?;
                (!re.is_match(&response.body))
                    .then(|| format!("[matches] response does not match /{}/", value))
            }
            AssertionKind::NoSoapFault => find_soap_fault(&response.body)
                .map(|fault| format!("[no-soap-fault] response contains a SOAP fault: {}", fault)),
        };
        failures.extend(failure);
    }

    Ok(failures)
}

fn check_status(expected: &str, actual: u16) -> Result<Option<String>, ExecutorError> {
    let mut codes = Vec::new();
    for part in expected.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let code: u16 = part.parse().map_err(|_| {
            ExecutorError::InvalidConfig(format!("invalid status code '{}' in assertion", part))
        })?;
        codes.push(code);
    }
    if codes.is_empty() {
        return Err(ExecutorError::InvalidConfig(
            "status assertion lists no codes".to_string(),
        ));
    }

    Ok((!codes.contains(&actual)).then(|| {
        format!(
            "[status] expected HTTP status {}, got {}",
            expected.trim(),
            actual
        )
    }))
}

pub fn compile(pattern: &str) -> Result<Regex, ExecutorError> {
    Regex::new(pattern)
        .map_err(|e| ExecutorError::InvalidConfig(format!("invalid regex '{}': {}", pattern, e)))
}

/// Find a SOAP 1.1/1.2 `Fault` element and return its fault string
/// (`faultstring`, or `Reason/Text`), or `"Fault"` when it carries none.
/// Bodies that are not well-formed XML are searched up to the first error.
pub fn find_soap_fault(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut depth = 0usize;
    let mut fault_depth: Option<usize> = None;
    let mut capturing = false;
    let mut message: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match fault_depth {
                    None if name.as_ref() == b"Fault" => fault_depth = Some(depth),
                    Some(_) if message.is_none() => {
                        capturing = matches!(name.as_ref(), b"faultstring" | b"Text");
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if fault_depth.is_none() && e.local_name().as_ref() == b"Fault" {
                    return Some("Fault".to_string());
                }
            }
            Ok(Event::Text(t)) if capturing => {
                message = t.unescape().ok().map(|text| text.trim().to_string());
                capturing = false;
            }
            Ok(Event::CData(c)) if capturing => {
                message = std::str::from_utf8(&c).ok().map(|text| text.trim().to_string());
                capturing = false;
            }
            Ok(Event::End(_)) => {
                capturing = false;
                if fault_depth == Some(depth) {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    fault_depth.map(|_| {
        message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Fault".to_string())
    })
}

/// Compare two values for the `assert` step
pub fn compare(operator: &str, actual: &str, expected: &str) -> Result<Option<String>, ExecutorError> {
    let failure = match operator.trim().to_lowercase().as_str() {
        "equals" | "eq" => (actual != expected)
            .then(|| format!("expected '{}' but was '{}'", expected, actual)),
        "not-equals" | "ne" => (actual == expected)
            .then(|| format!("expected a value other than '{}'", expected)),
        "contains" => (!actual.contains(expected))
            .then(|| format!("'{}' does not contain '{}'", actual, expected)),
        "matches" => {
            let re = compile(expected)?;
            (!re.is_match(actual)).then(|| format!("'{}' does not match /{}/", actual, expected))
        }
        other => {
            return Err(ExecutorError::InvalidConfig(format!(
                "unknown assert operator '{}'",
                other
            )))
        }
    };
    Ok(failure)
}
