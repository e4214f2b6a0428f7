//! Static rule-id → remediation-hint table.
//!
//! Covers the rule ids that show up most often across Go, JS/TS, and Python
//! lint output. Enrichment never overwrites a hint the tool already supplied.

use crate::report::Diagnostic;

/// Populate empty `hint` fields from the static table. Idempotent.
pub fn enrich_hints(errors: &mut [Diagnostic]) {
    for err in errors.iter_mut() {
        if !err.hint.is_empty() {
            continue;
        }
        if let Some(hint) = hint_for(&err.rule) {
            err.hint = hint.to_string();
        }
    }
}

fn hint_for(rule: &str) -> Option<&'static str> {
    let hint = match rule {
        // Go: gosec
        "G101" => "Use environment variables or a secret manager instead of hardcoded credentials.",
        "G102" => "Bind to a specific IP address instead of 0.0.0.0 to limit network exposure.",
        "G103" => "Avoid unsafe.Pointer unless absolutely necessary; prefer safe alternatives.",
        "G104" => "Always check returned errors — unhandled errors hide failures.",
        "G107" => "Validate or sanitize URLs before making HTTP requests to prevent SSRF.",
        "G110" => "Limit the size of decompressed data to prevent zip bomb attacks.",
        "G201" => "Use parameterized queries to prevent SQL injection.",
        "G202" => "Use parameterized queries instead of string concatenation for SQL.",
        "G204" => "Validate and sanitize arguments before passing to exec.Command.",
        "G301" => "Use restrictive directory permissions (0750 or less).",
        "G302" => "Use restrictive file permissions (0600 or 0644).",
        "G303" => "Use os.CreateTemp instead of predictable temp file names.",
        "G304" => "Validate file paths against a known-safe base directory before opening.",
        "G306" => "Use restrictive permissions when writing files (0600 or 0644).",
        "G401" => "Use SHA-256 or SHA-3 instead of weak hash algorithms (MD5/SHA1).",
        "G501" => "Import crypto/sha256 or crypto/sha3 instead of weak hash packages.",

        // Go: staticcheck
        "S1000" => "Use a plain channel send/receive instead of a single-case select.",
        "S1001" => "Replace the loop with copy().",
        "S1003" => "Use strings.Contains instead of strings.Index to check for substrings.",
        "S1005" => "Drop the blank identifier from the range; it is unnecessary.",
        "S1023" => "Omit redundant return/break at the end of a function/case block.",
        "S1025" => "Use the value directly instead of fmt.Sprintf(\"%s\", x).",
        "S1028" => "Use fmt.Errorf instead of errors.New(fmt.Sprintf(...)).",
        "SA1019" => "This API is deprecated — check the documentation for the replacement.",
        "SA4006" => "This value is assigned but never used.",
        "SA5001" => "Defer the Close call to ensure the resource is always released.",
        "ST1003" => "Use MixedCaps (Go naming convention) instead of underscores.",

        // Go: common linters
        "errcheck" => "Always handle returned errors with 'if err != nil'.",
        "ineffassign" => "Remove the assignment — the variable is reassigned before it is read.",
        "govet" => "Fix the issue reported by go vet — it usually indicates a real bug.",

        // JavaScript/TypeScript: ESLint
        "no-unused-vars" => "Remove the unused variable, or prefix with _ if intentionally unused.",
        "no-undef" => "Declare the variable or import it before use.",
        "no-console" => "Remove console.log statements or use a proper logger.",
        "eqeqeq" => "Use === and !== instead of == and != for strict equality.",
        "no-var" => "Use let or const instead of var.",
        "prefer-const" => "Use const for variables that are never reassigned.",
        "no-async-promise-executor" => {
            "Remove async from the Promise executor — throw will silently fail."
        }

        // Python: ruff / flake8
        "E501" => "Break long lines to improve readability (default limit: 88 or 120 chars).",
        "F401" => "Remove the unused import.",
        "F811" => "Remove the redefined variable — it shadows an earlier definition.",
        "F841" => "Remove the unused variable assignment.",
        "E712" => "Use 'is' / 'is not' for comparisons to True/False/None.",
        "W291" => "Remove trailing whitespace.",

        // Python: bandit
        "B101" => "Avoid assert in production code — it is stripped with python -O.",
        "B105" => "Do not hardcode passwords — use environment variables or a secret manager.",
        "B108" => "Avoid hardcoded /tmp paths — use tempfile.mkdtemp() instead.",
        "B301" => "Avoid pickle — it can execute arbitrary code during deserialization.",
        "B608" => "Use parameterized queries to prevent SQL injection.",

        _ => return None,
    };
    Some(hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;

    fn diag(rule: &str, hint: &str) -> Diagnostic {
        Diagnostic {
            file: "main.go".into(),
            line: 1,
            column: 0,
            severity: Severity::Error,
            rule: rule.into(),
            message: "m".into(),
            hint: hint.into(),
            tool: "t".into(),
        }
    }

    #[test]
    fn fills_hint_for_known_rule() {
        let mut errors = vec![diag("G101", "")];
        enrich_hints(&mut errors);
        assert!(errors[0].hint.contains("secret manager"));
    }

    #[test]
    fn preserves_existing_hint() {
        let mut errors = vec![diag("G101", "already helpful")];
        enrich_hints(&mut errors);
        assert_eq!(errors[0].hint, "already helpful");
    }

    #[test]
    fn unknown_rule_stays_empty() {
        let mut errors = vec![diag("NOPE-999", "")];
        enrich_hints(&mut errors);
        assert!(errors[0].hint.is_empty());
    }

    #[test]
    fn enrichment_is_idempotent() {
        let mut errors = vec![diag("F401", ""), diag("eqeqeq", "")];
        enrich_hints(&mut errors);
        let once = errors.clone();
        enrich_hints(&mut errors);
        assert_eq!(errors, once);
    }
}
