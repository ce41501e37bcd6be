use super::assertion::{self, Response};
use super::{StepExecutor, StepOutcome};
use crate::error::ExecutorError;
use crate::parser::types::Step;
use async_trait::async_trait;
use std::time::Duration;

/// Sends an HTTP (or SOAP over HTTP) request and evaluates the step's assertions
/// against the response.
///
/// Step attributes:
/// * `endpoint` - target URL (required)
/// * `method` - HTTP method; `POST` when a body is present, `GET` otherwise
/// * `timeoutMs` - request timeout
pub struct HttpStepExecutor {
    client: reqwest::Client,
}

impl HttpStepExecutor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpStepExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepExecutor for HttpStepExecutor {
    async fn execute(&self, step: &Step) -> Result<StepOutcome, ExecutorError> {
        let endpoint = step.required_attr("endpoint")?;
        let method_name = step
            .attr("method")
            .unwrap_or(if step.body.is_some() { "POST" } else { "GET" });
        let method = reqwest::Method::from_bytes(method_name.trim().to_uppercase().as_bytes())
            .map_err(|_| {
                ExecutorError::InvalidConfig(format!("invalid HTTP method '{}'", method_name))
            })?;

        let mut req = self.client.request(method, endpoint);

        for (name, value) in &step.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(ref body) = step.body {
            req = req.body(body.clone());
        }

        if let Some(timeout) = step.attr("timeoutMs") {
            let ms: u64 = timeout.trim().parse().map_err(|_| {
                ExecutorError::InvalidConfig(format!("invalid timeoutMs '{}'", timeout))
            })?;
            req = req.timeout(Duration::from_millis(ms));
        }

        log::debug!("{} {}", method_name, endpoint);
        let res = req.send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        log::debug!("{} answered {} ({} bytes)", endpoint, status, body.len());

        let response = Response { status, body };
        let failures = assertion::evaluate(&step.assertions, &response)?;

        if failures.is_empty() {
            Ok(StepOutcome::passed().with_message(response.body))
        } else {
            let mut messages = failures;
            messages.push(response.body);
            Ok(StepOutcome::failed_with_messages(messages))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::{Assertion, AssertionKind, StepKind};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const FAULT: &str = "<soap:Envelope xmlns:soap=\"urn:s\"><soap:Body><soap:Fault>\
        <faultcode>soap:Server</faultcode><faultstring>Invoice not found</faultstring>\
        </soap:Fault></soap:Body></soap:Envelope>";

    /// Serve one canned response on a local port and return its URL
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 8192];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/ws", addr)
    }

    fn request(endpoint: &str) -> Step {
        let mut step = Step::new("Send", StepKind::Request).with_attr("endpoint", endpoint);
        step.body = Some("<ping/>".to_string());
        step
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_a_config_error() {
        let executor = HttpStepExecutor::new();
        let step = Step::new("Send", StepKind::Request);
        let err = executor.execute(&step).await.unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_bad_method_is_a_config_error() {
        let executor = HttpStepExecutor::new();
        let step = Step::new("Send", StepKind::Request)
            .with_attr("endpoint", "http://127.0.0.1:9/")
            .with_attr("method", "NOT A METHOD");
        let err = executor.execute(&step).await.unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_transport_error() {
        let executor = HttpStepExecutor::new();
        let step = Step::new("Send", StepKind::Request)
            .with_attr("endpoint", "http://127.0.0.1:9/ws")
            .with_attr("timeoutMs", "2000");
        let err = executor.execute(&step).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Transport(_)));
    }

    #[tokio::test]
    async fn test_success_response_passes_and_keeps_body() {
        let endpoint = serve_once("200 OK", "<r><id>42</id></r>").await;
        let mut step = request(&endpoint);
        step.assertions.push(Assertion {
            kind: AssertionKind::Contains,
            value: Some("<id>42</id>".to_string()),
        });

        let outcome = HttpStepExecutor::new().execute(&step).await.unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.messages, vec!["<r><id>42</id></r>".to_string()]);
    }

    #[tokio::test]
    async fn test_error_status_without_assertions_fails() {
        let endpoint = serve_once("500 Internal Server Error", FAULT).await;

        let outcome = HttpStepExecutor::new().execute(&request(&endpoint)).await.unwrap();

        assert!(!outcome.passed);
        assert_eq!(outcome.messages[0], "[status] unexpected HTTP status 500");
        assert_eq!(outcome.messages.last().map(|m| m.as_str()), Some(FAULT));
    }

    #[tokio::test]
    async fn test_soap_fault_assertion_reports_fault_string() {
        let endpoint = serve_once("500 Internal Server Error", FAULT).await;
        let mut step = request(&endpoint);
        step.assertions.push(Assertion {
            kind: AssertionKind::NoSoapFault,
            value: None,
        });

        let outcome = HttpStepExecutor::new().execute(&step).await.unwrap();

        assert!(!outcome.passed);
        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(
            outcome.messages[0],
            "[no-soap-fault] response contains a SOAP fault: Invoice not found"
        );
        assert_eq!(outcome.messages[1], FAULT);
    }
}
