//! File-based gate filtering.
//!
//! Decides whether a gate should run for the current staged file set based on
//! its `only`/`except` glob patterns. Patterns are matched against both the
//! full path and the basename, so `*.go` matches `cmd/main.go`.

use glob::Pattern;

use crate::config::GateConfig;

/// Whether a gate should run given the staged file list.
///
/// Rules, in order:
/// - no `only` and no `except` ⇒ always run;
/// - `except` first: drop staged files matching any `except` pattern;
/// - with `only`: run iff at least one surviving file matches an `only`
///   pattern;
/// - with only `except`: run iff at least one file survives.
#[must_use]
pub fn should_run(cfg: &GateConfig, staged_files: &[String]) -> bool {
    if cfg.only.is_empty() && cfg.except.is_empty() {
        return true;
    }

    let surviving: Vec<&String> = if cfg.except.is_empty() {
        staged_files.iter().collect()
    } else {
        staged_files
            .iter()
            .filter(|f| !matches_any(f, &cfg.except))
            .collect()
    };

    if !cfg.only.is_empty() {
        return surviving.iter().any(|f| matches_any(f, &cfg.only));
    }

    !surviving.is_empty()
}

/// Filter a gate list down to the gates that should run.
///
/// When `staged_files` is empty ALL gates are returned: gates without file
/// filters may perform global checks and must still run on an empty index.
#[must_use]
pub fn filter_gates(gates: Vec<GateConfig>, staged_files: &[String]) -> Vec<GateConfig> {
    if staged_files.is_empty() {
        return gates;
    }

    gates
        .into_iter()
        .filter(|g| should_run(g, staged_files))
        .collect()
}

/// Glob match against the full path and the basename. Invalid patterns never
/// match.
fn matches_any(file: &str, patterns: &[String]) -> bool {
    let base = file.rsplit('/').next().unwrap_or(file);
    patterns.iter().any(|p| {
        Pattern::new(p).is_ok_and(|pat| pat.matches(file) || pat.matches(base))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateKind;

    fn gate(only: &[&str], except: &[&str]) -> GateConfig {
        GateConfig {
            name: "g".into(),
            kind: Some(GateKind::Exec),
            command: "true".into(),
            only: only.iter().map(|s| s.to_string()).collect(),
            except: except.iter().map(|s| s.to_string()).collect(),
            ..GateConfig::default()
        }
    }

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_patterns_always_runs() {
        assert!(should_run(&gate(&[], &[]), &files(&["a.txt"])));
        assert!(should_run(&gate(&[], &[]), &[]));
    }

    #[test]
    fn only_matches_basename_in_subdirectory() {
        let g = gate(&["*.go"], &[]);
        assert!(should_run(&g, &files(&["cmd/main.go"])));
        assert!(!should_run(&g, &files(&["docs/readme.md"])));
    }

    #[test]
    fn except_removes_files_before_only() {
        let g = gate(&["*.go"], &["*_test.go"]);
        assert!(!should_run(&g, &files(&["pkg/a_test.go"])));
        assert!(should_run(&g, &files(&["pkg/a_test.go", "pkg/a.go"])));
    }

    #[test]
    fn except_only_runs_when_files_survive() {
        let g = gate(&[], &["*.md"]);
        assert!(!should_run(&g, &files(&["readme.md"])));
        assert!(should_run(&g, &files(&["readme.md", "main.go"])));
    }

    #[test]
    fn invalid_pattern_never_matches() {
        let g = gate(&["[unclosed"], &[]);
        assert!(!should_run(&g, &files(&["main.go"])));
    }

    #[test]
    fn empty_staged_set_returns_all_gates() {
        let gates = vec![gate(&["*.go"], &[]), gate(&[], &["*.md"])];
        let filtered = filter_gates(gates.clone(), &[]);
        assert_eq!(filtered.len(), gates.len());
    }

    #[test]
    fn filter_is_idempotent() {
        let gates = vec![gate(&["*.go"], &[]), gate(&["*.py"], &[]), gate(&[], &[])];
        let staged = files(&["src/main.go", "notes.txt"]);

        let once = filter_gates(gates, &staged);
        let twice = filter_gates(once.clone(), &staged);
        assert_eq!(once.len(), twice.len());
        assert_eq!(once.len(), 2); // *.go gate and the unfiltered gate
    }
}
