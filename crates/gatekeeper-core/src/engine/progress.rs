//! Live gate status on the side channel (stderr).
//!
//! Suppressed entirely in JSON mode so machine output stays clean. The
//! writer sits behind a mutex because gate tasks report concurrently.

use std::io::Write;
use std::sync::Mutex;

use crate::report::GateResult;

/// Progress reporter for one engine run.
pub struct Progress {
    out: Mutex<Box<dyn Write + Send>>,
    suppressed: bool,
    results: Mutex<Vec<Status>>,
}

struct Status {
    passed: bool,
    system_error: bool,
}

impl Progress {
    /// Create a reporter. With `suppressed`, nothing is ever written. A
    /// non-zero `total` prints a header line immediately.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>, suppressed: bool, total: usize) -> Self {
        let progress = Self {
            out: Mutex::new(out),
            suppressed,
            results: Mutex::new(Vec::new()),
        };

        if !suppressed && total > 0 {
            progress.write_line(&format!("⏳ Running {total} gate(s)..."));
        }

        progress
    }

    /// Reporter writing to stderr.
    #[must_use]
    pub fn stderr(suppressed: bool, total: usize) -> Self {
        Self::new(Box::new(std::io::stderr()), suppressed, total)
    }

    /// A gate began executing.
    pub fn on_start(&self, name: &str) {
        if self.suppressed {
            return;
        }
        self.write_line(&format!("  ⏳ {name}"));
    }

    /// A gate finished.
    pub fn on_complete(&self, result: &GateResult) {
        if self.suppressed {
            return;
        }

        self.results.lock().expect("progress lock poisoned").push(Status {
            passed: result.passed,
            system_error: result.system_error.is_some(),
        });

        let icon = if result.system_error.is_some() {
            "💥"
        } else if result.passed {
            "✅"
        } else {
            "❌"
        };

        self.write_line(&format!(
            "  {icon} {}  {}",
            result.name,
            format_duration_ms(result.duration_ms)
        ));
    }

    /// Print the summary line after the run.
    pub fn finish(&self) {
        if self.suppressed {
            return;
        }

        let results = self.results.lock().expect("progress lock poisoned");
        let mut passed = 0usize;
        let mut failed = 0usize;
        let mut errors = 0usize;
        for status in results.iter() {
            if status.system_error {
                errors += 1;
            } else if status.passed {
                passed += 1;
            } else {
                failed += 1;
            }
        }
        drop(results);

        self.write_line("");
        if failed == 0 && errors == 0 {
            self.write_line(&format!("✅ All {passed} gate(s) passed"));
        } else {
            self.write_line(&format!(
                "Results: {passed} passed, {failed} failed, {errors} errors"
            ));
        }
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock().expect("progress lock poisoned");
        let _ = writeln!(out, "{line}");
    }
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Shared in-memory writer so tests can inspect what was printed.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn result(name: &str, passed: bool, system_error: Option<&str>, duration_ms: u64) -> GateResult {
        GateResult {
            name: name.into(),
            kind: "exec".into(),
            passed,
            blocking: true,
            duration_ms,
            system_error: system_error.map(String::from),
            ..GateResult::default()
        }
    }

    #[test]
    fn reports_lifecycle_and_summary() {
        let buf = SharedBuf::default();
        let progress = Progress::new(Box::new(buf.clone()), false, 2);

        progress.on_start("lint");
        progress.on_complete(&result("lint", true, None, 42));
        progress.on_start("test");
        progress.on_complete(&result("test", true, None, 1500));
        progress.finish();

        let out = buf.contents();
        assert!(out.contains("Running 2 gate(s)"));
        assert!(out.contains("✅ lint  42ms"));
        assert!(out.contains("✅ test  1.5s"));
        assert!(out.contains("All 2 gate(s) passed"));
    }

    #[test]
    fn summary_counts_failures_and_errors() {
        let buf = SharedBuf::default();
        let progress = Progress::new(Box::new(buf.clone()), false, 3);

        progress.on_complete(&result("a", true, None, 1));
        progress.on_complete(&result("b", false, None, 1));
        progress.on_complete(&result("c", false, Some("boom"), 1));
        progress.finish();

        let out = buf.contents();
        assert!(out.contains("❌ b"));
        assert!(out.contains("💥 c"));
        assert!(out.contains("Results: 1 passed, 1 failed, 1 errors"));
    }

    #[test]
    fn suppressed_mode_writes_nothing() {
        let buf = SharedBuf::default();
        let progress = Progress::new(Box::new(buf.clone()), true, 5);

        progress.on_start("lint");
        progress.on_complete(&result("lint", true, None, 1));
        progress.finish();

        assert!(buf.contents().is_empty());
    }
}
