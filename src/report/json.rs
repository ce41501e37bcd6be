use super::types::ProjectReport;
use anyhow::Result;
use std::path::Path;

/// Write the JSON report to `output`, or stdout when no path is given
pub fn generate(report: &ProjectReport, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        log::info!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}
