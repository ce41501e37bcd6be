use super::types::{ProjectReport, SuiteReport};
use crate::runner::state::{CaseResult, CaseStatus};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

fn counts<'a>(cases: impl Iterator<Item = &'a CaseResult>) -> (usize, usize, usize) {
    cases.fold((0, 0, 0), |(t, f, s), case| match case.status {
        CaseStatus::Ok => (t + 1, f, s),
        CaseStatus::Cancelled => (t + 1, f, s + 1),
        _ => (t + 1, f + 1, s),
    })
}

/// Generate JUnit XML with one `<testsuite>` per project suite
pub fn generate_junit_xml(report: &ProjectReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let (tests, failures, skipped) = counts(report.cases());
    let total_ms: u64 = report.cases().map(|c| c.duration_ms).sum();

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", report.project_name.as_str()));
    suites_start.push_attribute(("tests", tests.to_string().as_str()));
    suites_start.push_attribute(("failures", failures.to_string().as_str()));
    suites_start.push_attribute(("skipped", skipped.to_string().as_str()));
    suites_start.push_attribute(("time", seconds(total_ms).as_str()));
    writer.write_event(Event::Start(suites_start))?;

    for (index, suite) in report.suites.iter().enumerate() {
        write_suite(&mut writer, report, suite, index)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_suite<W: std::io::Write>(
    writer: &mut Writer<W>,
    report: &ProjectReport,
    suite: &SuiteReport,
    index: usize,
) -> Result<()> {
    let (tests, failures, skipped) = counts(suite.cases.iter());
    let suite_ms: u64 = suite.cases.iter().map(|c| c.duration_ms).sum();

    let mut start = BytesStart::new("testsuite");
    start.push_attribute(("name", suite.name.as_str()));
    start.push_attribute(("id", index.to_string().as_str()));
    start.push_attribute(("tests", tests.to_string().as_str()));
    start.push_attribute(("failures", failures.to_string().as_str()));
    start.push_attribute(("skipped", skipped.to_string().as_str()));
    start.push_attribute(("time", seconds(suite_ms).as_str()));
    start.push_attribute(("timestamp", report.generated_at.as_str()));
    writer.write_event(Event::Start(start))?;

    for case in &suite.cases {
        write_test_case(writer, case)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    Ok(())
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, case: &CaseResult) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", case.case_name.as_str()));
    case_start.push_attribute(("classname", case.suite_name.as_str()));
    case_start.push_attribute(("time", seconds(case.duration_ms).as_str()));
    writer.write_event(Event::Start(case_start))?;

    match case.status {
        CaseStatus::Ok => {}
        CaseStatus::Cancelled => {
            let message = case.failure_message();
            let mut skipped = BytesStart::new("skipped");
            skipped.push_attribute(("message", message.as_str()));
            writer.write_event(Event::Empty(skipped))?;
        }
        _ => {
            let message = case.failure_message();
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", message.as_str()));
            fail_start.push_attribute(("type", "AssertionError"));
            writer.write_event(Event::Start(fail_start))?;

            let details: Vec<String> = case
                .steps
                .iter()
                .filter(|s| !s.is_ok())
                .map(|s| format!("{} ({:?}): {}", s.step_name, s.status, s.diagnostic()))
                .collect();
            if !details.is_empty() {
                writer.write_event(Event::Text(BytesText::new(&details.join("\n"))))?;
            }

            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write `junit.xml` into `output_dir`
pub fn write_report(report: &ProjectReport, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(report)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    log::info!("Generated JUnit report: {}", path.display());
    Ok(())
}
