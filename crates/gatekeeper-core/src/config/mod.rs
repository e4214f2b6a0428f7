//! Project configuration: `.gatekeeper/gates.yaml`.
//!
//! Loading folds the `defaults` section into gates missing optional fields,
//! then validates every gate and reports all problems at once.

mod detect;
mod global;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub use detect::{detect_stacks, generate_gates_yaml, Stack};
pub use global::{GlobalConfig, OutputPrefs, DEFAULT_CONTAINER_TTL};

/// Gate kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    /// Run a command string inside a container.
    Exec,
    /// Run a shell script (by path) inside a container.
    Script,
    /// Send staged diffs to an LLM reviewer.
    Llm,
}

impl GateKind {
    /// The tag used in configuration and machine output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exec => "exec",
            Self::Script => "script",
            Self::Llm => "llm",
        }
    }
}

/// Behavior when a gate hits a system error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// A system error blocks the commit (default).
    Block,
    /// A system error is reported but does not block.
    Warn,
}

/// One gate entry from `gates.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Unique gate name.
    #[serde(default)]
    pub name: String,

    /// Gate kind; required.
    #[serde(default, rename = "type")]
    pub kind: Option<GateKind>,

    /// Command string for `exec` gates.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,

    /// Script path for `script` gates, relative to the project root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Container image reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,

    /// Parser name; empty means the generic parser.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parser: String,

    /// Per-gate timeout; defaults to 30s at execution time when unset.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Whether a failure blocks the commit; unset means blocking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,

    /// System-error policy; unset means block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OnError>,

    /// Run only when a staged file matches one of these globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub only: Vec<String>,

    /// Staged files matching these globs are ignored by the filter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,

    /// Mount the project read-write and run as the invoking user.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub writable: bool,

    /// LLM provider name for `llm` gates.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,

    /// Review rules prompt for `llm` gates.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt: String,

    /// Per-file diff size cap for `llm` gates, e.g. `100KB`; empty or
    /// invalid means unlimited.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub max_file_size: String,
}

impl GateConfig {
    /// Whether this gate blocks commits on failure. Defaults to true.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.blocking.unwrap_or(true)
    }

    /// The system-error policy. Defaults to [`OnError::Block`].
    #[must_use]
    pub fn on_error(&self) -> OnError {
        self.on_error.unwrap_or(OnError::Block)
    }

    /// The kind tag string, defaulting to `exec` when the kind is missing
    /// (only reachable before validation).
    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        self.kind.map_or("exec", GateKind::as_str)
    }

    /// Parse `max_file_size` (`100KB`, `2MB`, or a bare byte count) into
    /// bytes. Returns 0 (unlimited) for empty or invalid values.
    #[must_use]
    pub fn max_file_size_bytes(&self) -> usize {
        let s = self.max_file_size.trim().to_ascii_uppercase();
        if s.is_empty() {
            return 0;
        }

        let (num, multiplier) = if let Some(rest) = s.strip_suffix("MB") {
            (rest, 1024 * 1024)
        } else if let Some(rest) = s.strip_suffix("KB") {
            (rest, 1024)
        } else {
            (s.as_str(), 1)
        };

        match num.trim().parse::<usize>() {
            Ok(n) if n > 0 => n * multiplier,
            _ => 0,
        }
    }
}

/// Defaults applied to gates missing optional fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,

    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OnError>,

    /// Cancel remaining gates when a blocking gate fails.
    #[serde(default)]
    pub fail_fast: bool,
}

/// Top-level `.gatekeeper/gates.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub version: u32,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub gates: Vec<GateConfig>,
}

/// Load and validate the project configuration.
///
/// # Errors
///
/// [`PipelineError::ConfigMissing`] when the file does not exist;
/// [`PipelineError::ConfigInvalid`] on YAML or schema problems, carrying one
/// message per problem.
pub fn load_project_config(path: &Path) -> Result<ProjectConfig, PipelineError> {
    tracing::debug!(path = %path.display(), "loading config file");

    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::ConfigMissing);
        }
        Err(err) => {
            return Err(PipelineError::invalid_config(format!(
                "reading config file: {err}"
            )));
        }
    };

    let mut cfg: ProjectConfig = serde_yaml::from_str(&data)
        .map_err(|err| PipelineError::invalid_config(format!("parsing gates.yaml: {err}")))?;

    apply_defaults(&mut cfg);
    validate(&cfg)?;

    Ok(cfg)
}

fn apply_defaults(cfg: &mut ProjectConfig) {
    let defaults = cfg.defaults.clone();
    for gate in &mut cfg.gates {
        if gate.container.is_empty() && !defaults.container.is_empty() {
            gate.container = defaults.container.clone();
        }
        if gate.timeout.is_none() {
            gate.timeout = defaults.timeout;
        }
        if gate.blocking.is_none() {
            gate.blocking = defaults.blocking;
        }
        if gate.on_error.is_none() {
            gate.on_error = defaults.on_error;
        }
    }
}

/// Check required fields per gate kind, collecting every problem so users can
/// fix all of them in one pass.
fn validate(cfg: &ProjectConfig) -> Result<(), PipelineError> {
    let mut messages = Vec::new();

    for (idx, gate) in cfg.gates.iter().enumerate() {
        if gate.name.is_empty() {
            messages.push(format!("gate at position {idx}: missing required field 'name'"));
            continue;
        }

        match gate.kind {
            Some(GateKind::Exec) => {
                if gate.command.is_empty() {
                    messages.push(format!(
                        "gate {:?}: missing required field 'command' for type 'exec'",
                        gate.name
                    ));
                }
            }
            Some(GateKind::Script) => {
                if gate.path.is_empty() {
                    messages.push(format!(
                        "gate {:?}: missing required field 'path' for type 'script'",
                        gate.name
                    ));
                } else if gate.path.contains('\'') {
                    // Defense in depth alongside shell quoting at exec time.
                    messages.push(format!(
                        "gate {:?}: path contains invalid character (single quote)",
                        gate.name
                    ));
                }
            }
            Some(GateKind::Llm) => {
                if gate.provider.is_empty() {
                    messages.push(format!(
                        "gate {:?}: missing required field 'provider' for type 'llm'",
                        gate.name
                    ));
                }
                if gate.prompt.is_empty() {
                    messages.push(format!(
                        "gate {:?}: missing required field 'prompt' for type 'llm'",
                        gate.name
                    ));
                }
            }
            None => {
                messages.push(format!("gate {:?}: missing required field 'type'", gate.name));
            }
        }
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::ConfigInvalid { messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("tmp file");
        f.write_all(content.as_bytes()).expect("write");
        f
    }

    #[test]
    fn missing_file_is_config_missing() {
        let err = load_project_config(Path::new("/nonexistent/gates.yaml")).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigMissing));
    }

    #[test]
    fn loads_minimal_config() {
        let f = write_config(
            r"
version: 1
gates:
  - name: vet
    type: exec
    command: go vet ./...
    container: golang:1.23
",
        );
        let cfg = load_project_config(f.path()).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.gates.len(), 1);
        assert_eq!(cfg.gates[0].kind, Some(GateKind::Exec));
        assert!(cfg.gates[0].is_blocking());
        assert_eq!(cfg.gates[0].on_error(), OnError::Block);
    }

    #[test]
    fn defaults_fold_into_gates() {
        let f = write_config(
            r"
version: 1
defaults:
  container: alpine:latest
  timeout: 90s
  blocking: false
  on_error: warn
gates:
  - name: a
    type: exec
    command: 'true'
  - name: b
    type: exec
    command: 'true'
    container: golang:1.23
    timeout: 10s
    blocking: true
",
        );
        let cfg = load_project_config(f.path()).unwrap();

        let a = &cfg.gates[0];
        assert_eq!(a.container, "alpine:latest");
        assert_eq!(a.timeout, Some(Duration::from_secs(90)));
        assert!(!a.is_blocking());
        assert_eq!(a.on_error(), OnError::Warn);

        let b = &cfg.gates[1];
        assert_eq!(b.container, "golang:1.23");
        assert_eq!(b.timeout, Some(Duration::from_secs(10)));
        assert!(b.is_blocking());
    }

    #[test]
    fn validation_collects_all_problems() {
        let f = write_config(
            r#"
version: 1
gates:
  - name: no-command
    type: exec
  - name: no-path
    type: script
  - name: quoted
    type: script
    path: "evil'path.sh"
  - name: no-provider
    type: llm
"#,
        );
        let err = load_project_config(f.path()).unwrap_err();
        match err {
            PipelineError::ConfigInvalid { messages } => {
                assert_eq!(messages.len(), 5, "{messages:?}"); // llm gate missing provider AND prompt
                assert!(messages.iter().any(|m| m.contains("'command'")));
                assert!(messages.iter().any(|m| m.contains("'path'")));
                assert!(messages.iter().any(|m| m.contains("single quote")));
                assert!(messages.iter().any(|m| m.contains("'provider'")));
                assert!(messages.iter().any(|m| m.contains("'prompt'")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_type_is_reported() {
        let f = write_config(
            r"
gates:
  - name: mystery
    command: 'true'
",
        );
        let err = load_project_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("missing required field 'type'"));
    }

    #[test]
    fn malformed_yaml_is_config_invalid() {
        let f = write_config("gates: [not: closed");
        let err = load_project_config(f.path()).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigInvalid { .. }));
    }

    #[test]
    fn max_file_size_parses_suffixes() {
        let mut gate = GateConfig {
            max_file_size: "100KB".into(),
            ..GateConfig::default()
        };
        assert_eq!(gate.max_file_size_bytes(), 100 * 1024);

        gate.max_file_size = "2MB".into();
        assert_eq!(gate.max_file_size_bytes(), 2 * 1024 * 1024);

        gate.max_file_size = "512".into();
        assert_eq!(gate.max_file_size_bytes(), 512);

        gate.max_file_size = "100kb".into();
        assert_eq!(gate.max_file_size_bytes(), 100 * 1024);
    }

    #[test]
    fn max_file_size_invalid_means_unlimited() {
        for bad in ["", "  ", "-5KB", "lots", "0"] {
            let gate = GateConfig {
                max_file_size: bad.into(),
                ..GateConfig::default()
            };
            assert_eq!(gate.max_file_size_bytes(), 0, "{bad:?}");
        }
    }
}
