//! SARIF v2.1.0 parser.
//!
//! Decodes the subset of the schema linters actually emit: runs, the driver
//! name, and results with an optional level, rule id, message, and first
//! physical location. Anything else in the document is ignored.

use serde::Deserialize;

use crate::report::{Diagnostic, Severity};

use super::{empty_stdout_verdict, is_blank, ParseError, ParseResult};

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    runs: Vec<Run>,
}

#[derive(Debug, Deserialize)]
struct Run {
    tool: Tool,
    #[serde(default)]
    results: Vec<RunResult>,
}

#[derive(Debug, Deserialize)]
struct Tool {
    driver: Driver,
}

#[derive(Debug, Deserialize)]
struct Driver {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RunResult {
    #[serde(default)]
    level: Option<String>,
    #[serde(default, rename = "ruleId")]
    rule_id: Option<String>,
    #[serde(default)]
    message: Message,
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Default, Deserialize)]
struct Message {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(default, rename = "physicalLocation")]
    physical: Option<PhysicalLocation>,
}

#[derive(Debug, Deserialize)]
struct PhysicalLocation {
    #[serde(default, rename = "artifactLocation")]
    artifact: Option<ArtifactLocation>,
    #[serde(default)]
    region: Option<Region>,
}

#[derive(Debug, Deserialize)]
struct ArtifactLocation {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Region {
    #[serde(default, rename = "startLine")]
    start_line: Option<u32>,
    #[serde(default, rename = "startColumn")]
    start_column: Option<u32>,
}

pub(super) fn parse(stdout: &[u8], stderr: &[u8], exit_code: i32) -> Result<ParseResult, ParseError> {
    if is_blank(stdout) {
        return Ok(empty_stdout_verdict(
            stderr,
            exit_code,
            "sarif",
            "Tool failed with non-zero exit code and empty stdout",
        ));
    }

    let report: Report = serde_json::from_slice(stdout).map_err(ParseError::Sarif)?;

    let mut errors = Vec::new();
    let mut failed = false;

    for run in &report.runs {
        let tool_name = run.tool.driver.name.as_str();

        for result in &run.results {
            let severity = match result.level.as_deref().map(str::to_ascii_lowercase).as_deref() {
                Some("error") => {
                    failed = true;
                    Severity::Error
                }
                Some("warning") => Severity::Warning,
                // "note", "none", missing, or anything unrecognized.
                _ => Severity::Info,
            };

            let (file, line, column) = location_fields(result.locations.first());

            errors.push(Diagnostic {
                file,
                line,
                column,
                severity,
                rule: result.rule_id.clone().unwrap_or_default(),
                message: result.message.text.clone().unwrap_or_default(),
                hint: String::new(),
                tool: tool_name.to_string(),
            });
        }
    }

    Ok(ParseResult {
        passed: !failed,
        errors,
    })
}

fn location_fields(location: Option<&Location>) -> (String, u32, u32) {
    let Some(physical) = location.and_then(|l| l.physical.as_ref()) else {
        return (String::new(), 0, 0);
    };

    let file = physical
        .artifact
        .as_ref()
        .and_then(|a| a.uri.clone())
        .unwrap_or_default();

    let (line, column) = physical
        .region
        .as_ref()
        .map_or((0, 0), |r| (r.start_line.unwrap_or(0), r.start_column.unwrap_or(0)));

    (file, line, column)
}
