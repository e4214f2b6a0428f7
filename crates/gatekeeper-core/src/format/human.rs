//! Human-readable CLI report.

use std::fmt::Write;

use crate::report::{Diagnostic, GateResult, RunResult, Severity};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";

pub(super) fn render(result: &RunResult, color: bool, verbose: bool) -> String {
    let p = Painter { color };
    let mut out = String::new();

    let (icon, status) = if result.passed {
        (p.paint("✅", GREEN), "passed")
    } else {
        (p.paint("❌", RED), "failed")
    };
    let _ = write!(
        out,
        "\n{icon} {} — {status} in {}ms\n\n",
        p.paint("Gatekeeper", BOLD),
        result.duration_ms
    );

    for gate in &result.gates {
        render_gate(&mut out, &p, gate, verbose);
    }

    out
}

fn render_gate(out: &mut String, p: &Painter, gate: &GateResult, verbose: bool) {
    let _ = writeln!(
        out,
        "  {} {} {}",
        gate_icon(p, gate),
        p.paint(&gate.name, BOLD),
        p.paint(&format!("{}ms", gate.duration_ms), DIM)
    );

    if let Some(system_error) = &gate.system_error {
        let _ = writeln!(out, "    💥 {}", p.paint(system_error, RED));
    }

    for diagnostic in &gate.errors {
        render_diagnostic(out, p, diagnostic);
    }

    if verbose {
        if let Some(raw) = gate.raw_output.as_deref().filter(|raw| !raw.is_empty()) {
            let _ = writeln!(out, "\n    {}", p.paint("--- raw output ---", DIM));
            for line in raw.lines() {
                let _ = writeln!(out, "    {}", p.paint(line, DIM));
            }
        }
    }
}

fn render_diagnostic(out: &mut String, p: &Painter, diag: &Diagnostic) {
    let mut location = String::new();
    if !diag.file.is_empty() {
        location = diag.file.clone();
        if diag.line > 0 {
            let _ = write!(location, ":{}", diag.line);
            if diag.column > 0 {
                let _ = write!(location, ":{}", diag.column);
            }
        }
        location = format!("{} ", p.paint(&location, CYAN));
    }

    let (icon, color) = match diag.severity {
        Severity::Error => ("❌", RED),
        Severity::Warning => ("⚠️", YELLOW),
        Severity::Info => ("ℹ️", DIM),
    };

    let rule = if diag.rule.is_empty() {
        String::new()
    } else {
        format!("{} ", p.paint(&format!("[{}]", diag.rule), DIM))
    };

    let _ = writeln!(
        out,
        "    {icon} {location}{rule}{}",
        p.paint(&diag.message, color)
    );

    if !diag.hint.is_empty() {
        let _ = writeln!(out, "      💡 {}", diag.hint);
    }
}

fn gate_icon(p: &Painter, gate: &GateResult) -> String {
    if gate.skipped {
        return "⏭️".to_string();
    }
    if gate.system_error.is_some() {
        return "💥".to_string();
    }
    if gate.passed {
        p.paint("✅", GREEN)
    } else {
        p.paint("❌", RED)
    }
}

struct Painter {
    color: bool,
}

impl Painter {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}
