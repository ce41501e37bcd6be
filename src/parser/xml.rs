use super::types::{Assertion, AssertionKind, Project, Step, StepKind, Suite, TestCase};
use crate::error::ParseError;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;

/// Element tree built from the raw XML before it is mapped onto the project model
#[derive(Debug, Default)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn from_start(e: &BytesStart) -> Result<Self, ParseError> {
        let mut node = Node {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            ..Default::default()
        };

        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            node.attributes.push((key, value));
        }

        Ok(node)
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Text content of an element that must not contain other elements
    fn text_only(&self) -> Result<&str, ParseError> {
        match self.children.first() {
            None => Ok(&self.text),
            Some(child) => Err(structure(format!(
                "<{}> must contain text only, found <{}>",
                self.name, child.name
            ))),
        }
    }

    fn required_attr(&self, key: &str) -> Result<&str, ParseError> {
        match self.attr(key) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(structure(format!(
                "<{}> requires a non-empty '{}' attribute",
                self.name, key
            ))),
        }
    }
}

fn structure(msg: impl Into<String>) -> ParseError {
    ParseError::Structure(msg.into())
}

fn unexpected(child: &Node, parent: &str) -> ParseError {
    structure(format!("unexpected <{}> inside <{}>", child.name, parent))
}

/// Parse a project definition. Nothing is executed.
pub fn parse_project(xml: &str) -> Result<Project, ParseError> {
    let root = read_tree(xml)?;
    if root.name != "project" {
        return Err(structure(format!(
            "root element must be <project>, found <{}>",
            root.name
        )));
    }

    let name = root.required_attr("name")?.to_string();
    let suites = root
        .children
        .iter()
        .map(|child| match child.name.as_str() {
            "suite" => parse_suite(child),
            _ => Err(unexpected(child, "project")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Project { name, suites })
}

fn parse_suite(node: &Node) -> Result<Suite, ParseError> {
    let name = node.required_attr("name")?.to_string();
    let cases = node
        .children
        .iter()
        .map(|child| match child.name.as_str() {
            "case" => parse_case(child),
            _ => Err(unexpected(child, "suite")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Suite { name, cases })
}

fn parse_case(node: &Node) -> Result<TestCase, ParseError> {
    let name = node.required_attr("name")?.to_string();
    let fail_on_error = match node.attr("failOnError") {
        None => false,
        Some(v) => parse_bool(v)
            .ok_or_else(|| structure(format!("case '{}': failOnError must be true or false", name)))?,
    };

    let mut properties = HashMap::new();
    let mut steps = Vec::new();

    for child in &node.children {
        match child.name.as_str() {
            "properties" => {
                for prop in &child.children {
                    if prop.name != "property" {
                        return Err(unexpected(prop, "properties"));
                    }
                    let key = prop.required_attr("name")?.to_string();
                    let value = match prop.attr("value") {
                        Some(v) => v.to_string(),
                        None => prop.text_only()?.to_string(),
                    };
                    properties.insert(key, value);
                }
            }
            "step" => steps.push(parse_step(child)?),
            _ => return Err(unexpected(child, "case")),
        }
    }

    Ok(TestCase {
        name,
        steps,
        properties,
        fail_on_error,
    })
}

fn parse_step(node: &Node) -> Result<Step, ParseError> {
    let name = node.required_attr("name")?;
    let kind: StepKind = node.required_attr("kind")?.parse()?;
    let mut step = Step::new(name, kind);

    for (k, v) in &node.attributes {
        if k != "name" && k != "kind" {
            step.attributes.insert(k.clone(), v.clone());
        }
    }

    for child in &node.children {
        match child.name.as_str() {
            "header" => {
                let header = child.required_attr("name")?.to_string();
                step.headers.push((header, child.text_only()?.to_string()));
            }
            "body" => {
                if step.body.is_some() {
                    return Err(structure(format!("step '{}' has more than one <body>", name)));
                }
                step.body = Some(child.text.clone());
            }
            "assertion" => step.assertions.push(parse_assertion(child, name)?),
            _ => return Err(unexpected(child, "step")),
        }
    }

    Ok(step)
}

fn parse_assertion(node: &Node, step: &str) -> Result<Assertion, ParseError> {
    let kind: AssertionKind = node.required_attr("type")?.parse()?;
    let text = node.text_only()?;
    let value = node
        .attr("value")
        .map(|v| v.to_string())
        .or_else(|| (!text.is_empty()).then(|| text.to_string()));

    if kind.needs_value() && value.is_none() {
        return Err(structure(format!(
            "step '{}': '{}' assertion needs a value",
            step, kind
        )));
    }

    Ok(Assertion { kind, value })
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Element whose content is kept as raw XML instead of being parsed into nodes
const RAW_CONTENT: &str = "body";

/// Re-serialises everything inside a raw-content element.
///
/// Direct text and CDATA are written unescaped, so a payload may be given as
/// escaped text, as CDATA or as inline elements. Nested markup is written back
/// as it appeared.
struct RawCapture {
    node: Node,
    writer: Writer<Vec<u8>>,
    depth: usize,
}

impl RawCapture {
    fn new(node: Node) -> Self {
        Self {
            node,
            writer: Writer::new(Vec::new()),
            depth: 0,
        }
    }

    /// Feed one event; returns the finished node once the element closes
    fn push(&mut self, event: Event<'_>) -> Result<Option<Node>, ParseError> {
        match event {
            Event::Start(e) => {
                self.depth += 1;
                self.writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                if self.depth == 0 {
                    let raw = std::mem::take(self.writer.get_mut());
                    let mut node = std::mem::take(&mut self.node);
                    node.text = String::from_utf8(raw)?;
                    return Ok(Some(node));
                }
                self.depth -= 1;
                self.writer.write_event(Event::End(e))?;
            }
            Event::Text(t) if self.depth == 0 => {
                let text = t.unescape()?;
                self.writer
                    .write_event(Event::Text(BytesText::from_escaped(text.as_ref())))?;
            }
            Event::CData(c) if self.depth == 0 => {
                let raw = c.into_inner();
                let text = std::str::from_utf8(&raw)
                    .map_err(|e| structure(format!("CDATA is not valid UTF-8: {}", e)))?;
                self.writer
                    .write_event(Event::Text(BytesText::from_escaped(text)))?;
            }
            Event::Eof => {
                return Err(structure(format!(
                    "document ended inside <{}>",
                    self.node.name
                )))
            }
            other => self.writer.write_event(other)?,
        }
        Ok(None)
    }
}

fn read_tree(xml: &str) -> Result<Node, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;
    let mut capture: Option<RawCapture> = None;

    loop {
        let event = reader.read_event()?;

        if let Some(raw) = capture.as_mut() {
            if let Some(node) = raw.push(event)? {
                capture = None;
                attach(&mut stack, &mut root, node)?;
            }
            continue;
        }

        match event {
            Event::Start(e) => {
                let node = Node::from_start(&e)?;
                if node.name == RAW_CONTENT && !stack.is_empty() {
                    capture = Some(RawCapture::new(node));
                } else {
                    stack.push(node);
                }
            }
            Event::Empty(e) => {
                let node = Node::from_start(&e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| structure("closing tag without an open element"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                let text = std::str::from_utf8(&raw)
                    .map_err(|e| structure(format!("CDATA is not valid UTF-8: {}", e)))?;
                push_text(&mut stack, text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(structure(format!(
            "document ended inside <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| structure("document has no root element"))
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(structure("document has more than one root element")),
    }
}

fn push_text(stack: &mut [Node], text: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(node) => {
            node.text.push_str(text);
            Ok(())
        }
        None => Err(structure("text outside the root element")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project name="Billing">
  <suite name="Invoices">
    <case name="Create invoice" failOnError="true">
      <properties>
        <property name="endpoint" value="http://localhost:8088/billing"/>
        <property name="customer">ACME</property>
      </properties>
      <step name="Send" kind="request" endpoint="${endpoint}" method="POST">
        <header name="SOAPAction">urn:create</header>
        <body><![CDATA[<soap:Envelope>
  <customer>${customer}</customer>
</soap:Envelope>]]></body>
        <assertion type="status" value="200"/>
        <assertion type="no-soap-fault"/>
      </step>
      <step name="Wait" kind="delay" ms="10"/>
    </case>
    <case name="Empty case"/>
  </suite>
  <suite name="Customers"/>
</project>"#;

    #[test]
    fn test_parse_full_project() {
        let project = parse_project(PROJECT).unwrap();
        assert_eq!(project.name, "Billing");
        assert_eq!(project.suites.len(), 2);
        assert_eq!(project.case_count(), 2);

        let case = &project.suites[0].cases[0];
        assert!(case.fail_on_error);
        assert_eq!(case.properties.get("customer").map(|s| s.as_str()), Some("ACME"));
        assert_eq!(case.steps.len(), 2);

        let send = &case.steps[0];
        assert_eq!(send.kind, StepKind::Request);
        assert_eq!(send.attr("method"), Some("POST"));
        assert_eq!(send.attr("name"), None);
        assert_eq!(send.headers, vec![("SOAPAction".to_string(), "urn:create".to_string())]);
        assert!(send.body.as_deref().unwrap().contains("${customer}"));
        assert_eq!(send.assertions.len(), 2);
        assert_eq!(send.assertions[1].kind, AssertionKind::NoSoapFault);

        assert!(!project.suites[0].cases[1].fail_on_error);
        assert!(project.suites[1].cases.is_empty());
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let xml = r#"<project name="p">
            <suite name="b"><case name="2"/><case name="1"/></suite>
            <suite name="a"/>
        </project>"#;
        let project = parse_project(xml).unwrap();
        let names: Vec<_> = project.suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        let cases: Vec<_> = project.suites[0].cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(cases, vec!["2", "1"]);
    }

    #[test]
    fn test_malformed_xml_is_rejected() {
        assert!(parse_project("<project name=\"p\"><suite name=\"s\"></project>").is_err());
        assert!(parse_project("<project name=\"p\"><suite name=\"s\">").is_err());
        assert!(parse_project("not xml at all").is_err());
        assert!(parse_project("").is_err());
    }

    #[test]
    fn test_structure_errors() {
        let wrong_root = parse_project("<suite name=\"s\"/>").unwrap_err();
        assert!(matches!(wrong_root, ParseError::Structure(_)));

        let missing_name = parse_project("<project><suite name=\"s\"/></project>");
        assert!(missing_name.is_err());

        let unknown_kind = parse_project(
            "<project name=\"p\"><suite name=\"s\"><case name=\"c\">\
             <step name=\"x\" kind=\"groovy\"/></case></suite></project>",
        );
        assert!(unknown_kind.is_err());

        let missing_value = parse_project(
            "<project name=\"p\"><suite name=\"s\"><case name=\"c\">\
             <step name=\"x\" kind=\"request\"><assertion type=\"contains\"/></step>\
             </case></suite></project>",
        );
        assert!(missing_value.is_err());
    }

    fn single_step(step_xml: &str) -> Result<Step, ParseError> {
        let xml = format!(
            "<project name=\"p\"><suite name=\"s\"><case name=\"c\">{}</case></suite></project>",
            step_xml
        );
        let project = parse_project(&xml)?;
        Ok(project.suites[0].cases[0].steps[0].clone())
    }

    #[test]
    fn test_inline_body_is_kept_as_raw_xml() {
        let step = single_step(
            r#"<step name="Send" kind="request">
                <body><soap:Envelope xmlns:soap="urn:s"><a>1</a><b/><c>x &amp; y</c></soap:Envelope></body>
            </step>"#,
        )
        .unwrap();
        assert_eq!(
            step.body.as_deref(),
            Some(r#"<soap:Envelope xmlns:soap="urn:s"><a>1</a><b/><c>x &amp; y</c></soap:Envelope>"#)
        );
    }

    #[test]
    fn test_escaped_body_text_is_unescaped() {
        let step = single_step(
            r#"<step name="Send" kind="request"><body>&lt;a&gt;1&lt;/a&gt;</body></step>"#,
        )
        .unwrap();
        assert_eq!(step.body.as_deref(), Some("<a>1</a>"));
    }

    #[test]
    fn test_truncated_body_is_rejected() {
        let xml = r#"<project name="p"><suite name="s"><case name="c">
            <step name="Send" kind="request"><body><a>1</a>"#;
        assert!(parse_project(xml).is_err());
    }

    #[test]
    fn test_markup_inside_text_elements_is_rejected() {
        let header = single_step(
            r#"<step name="Send" kind="request"><header name="X"><v>1</v></header></step>"#,
        );
        assert!(matches!(header, Err(ParseError::Structure(_))));

        let assertion = single_step(
            r#"<step name="Send" kind="request"><assertion type="contains"><v>1</v></assertion></step>"#,
        );
        assert!(matches!(assertion, Err(ParseError::Structure(_))));

        let property = parse_project(
            r#"<project name="p"><suite name="s"><case name="c">
                <properties><property name="x"><v>1</v></property></properties>
            </case></suite></project>"#,
        );
        assert!(matches!(property, Err(ParseError::Structure(_))));
    }
}
