//! Parser for `go test -json` output (newline-delimited test events).
//!
//! Output lines are buffered per `(package, test)` key. Test-level failures
//! are emitted first; a package-level failure is emitted only when no test in
//! that package already failed (build errors fail the package without running
//! any test).

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::report::{Diagnostic, Severity};

use super::{empty_stdout_verdict, is_blank, ParseError, ParseResult};

/// One event emitted by `go test -json` (see `cmd/test2json`).
#[derive(Debug, Default, Deserialize)]
struct TestEvent {
    #[serde(default, rename = "Action")]
    action: String,
    #[serde(default, rename = "Package")]
    package: String,
    #[serde(default, rename = "Test")]
    test: String,
    #[serde(default, rename = "Output")]
    output: String,
}

pub(super) fn parse(stdout: &[u8], stderr: &[u8], exit_code: i32) -> Result<ParseResult, ParseError> {
    if is_blank(stdout) {
        return Ok(empty_stdout_verdict(
            stderr,
            exit_code,
            "go-test",
            "go test failed with non-zero exit code and empty output",
        ));
    }

    let events = parse_events(stdout)?;

    // Buffer output lines per (package, test); package-level output has an
    // empty test name.
    let mut outputs: HashMap<(&str, &str), String> = HashMap::new();
    for ev in &events {
        if ev.action == "output" {
            outputs
                .entry((ev.package.as_str(), ev.test.as_str()))
                .or_default()
                .push_str(&ev.output);
        }
    }

    let mut errors = Vec::new();
    let mut failed_packages: HashSet<&str> = HashSet::new();

    // Test-level failures first.
    for ev in &events {
        if ev.action != "fail" || ev.test.is_empty() {
            continue;
        }

        failed_packages.insert(ev.package.as_str());

        let buffered = outputs
            .get(&(ev.package.as_str(), ev.test.as_str()))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let message = if buffered.is_empty() {
            format!("test {} failed", ev.test)
        } else {
            buffered
        };

        errors.push(test_failure(&ev.package, message));
    }

    // Package-level failures, unless already reported through a test.
    for ev in &events {
        if ev.action != "fail" || !ev.test.is_empty() {
            continue;
        }
        if failed_packages.contains(ev.package.as_str()) {
            continue;
        }

        let buffered = outputs
            .get(&(ev.package.as_str(), ""))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let message = if buffered.is_empty() {
            format!("package {} failed", ev.package)
        } else {
            buffered
        };

        errors.push(test_failure(&ev.package, message));
    }

    Ok(ParseResult {
        passed: errors.is_empty() && exit_code == 0,
        errors,
    })
}

fn test_failure(package: &str, message: String) -> Diagnostic {
    Diagnostic {
        file: package.to_string(),
        line: 0,
        column: 0,
        severity: Severity::Error,
        rule: String::new(),
        message,
        hint: String::new(),
        tool: "go-test".to_string(),
    }
}

fn parse_events(data: &[u8]) -> Result<Vec<TestEvent>, ParseError> {
    let text = String::from_utf8_lossy(data);
    let mut events = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let ev: TestEvent = serde_json::from_str(line).map_err(|source| ParseError::TestEvent {
            line: line.to_string(),
            source,
        })?;
        events.push(ev);
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(action: &str, package: &str, test: &str, output: &str) -> String {
        serde_json::json!({
            "Action": action,
            "Package": package,
            "Test": test,
            "Output": output,
        })
        .to_string()
    }

    #[test]
    fn all_passing_stream_passes() {
        let input = [
            event("run", "example.com/pkg", "TestOne", ""),
            event("pass", "example.com/pkg", "TestOne", ""),
            event("pass", "example.com/pkg", "", ""),
        ]
        .join("\n");

        let result = parse(input.as_bytes(), b"", 0).unwrap();
        assert!(result.passed);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn failed_test_collects_buffered_output() {
        let input = [
            event("run", "example.com/pkg", "TestBoom", ""),
            event("output", "example.com/pkg", "TestBoom", "=== RUN TestBoom\n"),
            event("output", "example.com/pkg", "TestBoom", "    boom_test.go:12: want 2, got 3\n"),
            event("fail", "example.com/pkg", "TestBoom", ""),
            event("fail", "example.com/pkg", "", ""),
        ]
        .join("\n");

        let result = parse(input.as_bytes(), b"", 1).unwrap();
        assert!(!result.passed);
        assert_eq!(result.errors.len(), 1, "package failure folds into test failure");

        let err = &result.errors[0];
        assert_eq!(err.file, "example.com/pkg");
        assert_eq!(err.tool, "go-test");
        assert!(err.message.contains("want 2, got 3"));
    }

    #[test]
    fn build_failure_emits_package_level_diagnostic() {
        let input = [
            event("output", "example.com/broken", "", "# example.com/broken\n"),
            event("output", "example.com/broken", "", "./main.go:5:2: undefined: frob\n"),
            event("fail", "example.com/broken", "", ""),
        ]
        .join("\n");

        let result = parse(input.as_bytes(), b"", 2).unwrap();
        assert!(!result.passed);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("undefined: frob"));
    }

    #[test]
    fn package_failure_without_output_gets_synthetic_message() {
        let input = event("fail", "example.com/silent", "", "");
        let result = parse(input.as_bytes(), b"", 1).unwrap();
        assert_eq!(result.errors[0].message, "package example.com/silent failed");
    }

    #[test]
    fn failed_test_without_output_gets_synthetic_message() {
        let input = event("fail", "example.com/pkg", "TestQuiet", "");
        let result = parse(input.as_bytes(), b"", 1).unwrap();
        assert_eq!(result.errors[0].message, "test TestQuiet failed");
    }

    #[test]
    fn skip_events_produce_no_diagnostics() {
        let input = [
            event("skip", "example.com/pkg", "TestSkipped", ""),
            event("pass", "example.com/pkg", "", ""),
        ]
        .join("\n");

        let result = parse(input.as_bytes(), b"", 0).unwrap();
        assert!(result.passed);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn clean_stream_with_nonzero_exit_still_fails() {
        let input = event("pass", "example.com/pkg", "", "");
        let result = parse(input.as_bytes(), b"", 1).unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn malformed_line_is_a_parse_error() {
        let err = parse(b"{\"Action\": \"run\"}\nnot json\n", b"", 0).unwrap_err();
        match err {
            ParseError::TestEvent { line, .. } => assert_eq!(line, "not json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
