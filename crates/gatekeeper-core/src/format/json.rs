//! Machine-readable JSON output.
//!
//! The shape is stable: `{passed, duration_ms, gates:[{name, type, passed,
//! blocking, skipped?, duration_ms, errors?, system_error?, raw_output?}]}`.

use crate::report::RunResult;

pub(super) fn render(result: &RunResult) -> String {
    serde_json::to_string_pretty(result)
        .unwrap_or_else(|_| r#"{"error": "failed to marshal result"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Diagnostic, GateResult, Severity};

    #[test]
    fn emits_stable_machine_shape() {
        let result = RunResult {
            passed: false,
            duration_ms: 88,
            gates: vec![GateResult {
                name: "sec".into(),
                kind: "exec".into(),
                passed: false,
                blocking: true,
                duration_ms: 60,
                errors: vec![Diagnostic {
                    file: "a.js".into(),
                    line: 10,
                    column: 4,
                    severity: Severity::Error,
                    rule: "R1".into(),
                    message: "bad".into(),
                    hint: "fix it".into(),
                    tool: "lintX".into(),
                }],
                ..GateResult::default()
            }],
        };

        let parsed: serde_json::Value = serde_json::from_str(&render(&result)).unwrap();
        assert_eq!(parsed["passed"], false);
        assert_eq!(parsed["duration_ms"], 88);

        let gate = &parsed["gates"][0];
        assert_eq!(gate["name"], "sec");
        assert_eq!(gate["type"], "exec");
        assert_eq!(gate["blocking"], true);
        assert!(gate.get("skipped").is_none(), "skipped omitted when false");
        assert!(gate.get("system_error").is_none());

        let error = &gate["errors"][0];
        assert_eq!(error["file"], "a.js");
        assert_eq!(error["line"], 10);
        assert_eq!(error["column"], 4);
        assert_eq!(error["severity"], "error");
        assert_eq!(error["rule"], "R1");
        assert_eq!(error["hint"], "fix it");
        assert_eq!(error["tool"], "lintX");
    }

    #[test]
    fn round_trips_through_serde() {
        let result = RunResult {
            passed: true,
            duration_ms: 5,
            gates: Vec::new(),
        };
        let back: RunResult = serde_json::from_str(&render(&result)).unwrap();
        assert!(back.passed);
        assert_eq!(back.duration_ms, 5);
    }
}
