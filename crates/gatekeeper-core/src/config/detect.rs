//! Technology stack detection and config template generation for `init`.

/// A detected technology stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stack {
    /// Go project (`go.mod`).
    Go,
    /// Node.js project (`package.json`).
    Node,
    /// Python project (`requirements.txt` or `pyproject.toml`).
    Python,
}

impl Stack {
    /// Human-readable stack name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Node => "node",
            Self::Python => "python",
        }
    }
}

/// Scan project-root file names for well-known markers. Pure function, no
/// I/O. Each stack is reported at most once.
#[must_use]
pub fn detect_stacks(files: &[String]) -> Vec<Stack> {
    let mut stacks = Vec::new();

    for file in files {
        let stack = match file.as_str() {
            "go.mod" => Stack::Go,
            "package.json" => Stack::Node,
            "requirements.txt" | "pyproject.toml" => Stack::Python,
            _ => continue,
        };
        if !stacks.contains(&stack) {
            stacks.push(stack);
        }
    }

    stacks
}

/// Produce a `gates.yaml` for the detected stacks, or a commented minimal
/// template when nothing was detected. Generated commands use check/diff
/// modes so gates stay read-only.
#[must_use]
pub fn generate_gates_yaml(stacks: &[Stack]) -> String {
    if stacks.is_empty() {
        return FALLBACK_YAML.to_string();
    }

    let mut out = String::from(YAML_HEADER);
    for stack in stacks {
        out.push_str(match stack {
            Stack::Go => GO_GATES,
            Stack::Node => NODE_GATES,
            Stack::Python => PYTHON_GATES,
        });
    }
    out
}

const YAML_HEADER: &str = r#"# Gatekeeper configuration — auto-generated
# Customize gates to match your project's needs.
# Docs: https://github.com/irahardianto/gatekeeper-rs
version: 1

defaults:
  timeout: 60s
  blocking: true
  on_error: block

gates:
"#;

const GO_GATES: &str = r#"  # --- Go ---
  - name: go-vet
    type: exec
    command: "go vet ./..."
    container: "golang:1.23"
    only: ["*.go"]

  - name: go-test
    type: exec
    command: "go test -race ./..."
    container: "golang:1.23"
    timeout: 120s
    only: ["*.go"]

  # - name: golangci-lint
  #   type: exec
  #   command: "golangci-lint run --out-format sarif ./..."
  #   container: "golangci/golangci-lint:latest"
  #   parser: sarif
  #   only: ["*.go"]

"#;

const NODE_GATES: &str = r#"  # --- Node.js ---
  - name: eslint
    type: exec
    command: "npx eslint --format json ."
    container: "node:20"
    only: ["*.js", "*.ts", "*.jsx", "*.tsx"]

  # - name: vitest
  #   type: exec
  #   command: "npx vitest run"
  #   container: "node:20"
  #   timeout: 120s
  #   only: ["*.js", "*.ts", "*.jsx", "*.tsx"]

  # - name: prettier-check
  #   type: exec
  #   command: "npx prettier --check ."
  #   container: "node:20"

"#;

const PYTHON_GATES: &str = r#"  # --- Python ---
  - name: ruff
    type: exec
    command: "ruff check --output-format sarif ."
    container: "python:3.12"
    parser: sarif
    only: ["*.py"]

  # - name: pytest
  #   type: exec
  #   command: "pytest"
  #   container: "python:3.12"
  #   timeout: 120s
  #   only: ["*.py"]

  # - name: ruff-format-check
  #   type: exec
  #   command: "ruff format --check ."
  #   container: "python:3.12"

"#;

const FALLBACK_YAML: &str = r#"# Gatekeeper configuration
# No technology stack detected. Add gates below to get started.
# Docs: https://github.com/irahardianto/gatekeeper-rs
version: 1

defaults:
  timeout: 60s
  blocking: true
  on_error: block

gates:
  # Example gate — uncomment and customize:
  # - name: lint
  #   type: exec
  #   command: "echo 'Add your linter command here'"
  #   container: "alpine:latest"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    fn names(files: &[&str]) -> Vec<String> {
        files.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_each_stack_once() {
        let stacks = detect_stacks(&names(&[
            "go.mod",
            "main.go",
            "requirements.txt",
            "pyproject.toml",
        ]));
        assert_eq!(stacks, vec![Stack::Go, Stack::Python]);
    }

    #[test]
    fn detects_nothing_in_unmarked_project() {
        assert!(detect_stacks(&names(&["README.md", "Makefile"])).is_empty());
    }

    #[test]
    fn generated_yaml_parses_as_project_config() {
        for stacks in [
            vec![],
            vec![Stack::Go],
            vec![Stack::Node, Stack::Python],
            vec![Stack::Go, Stack::Node, Stack::Python],
        ] {
            let yaml = generate_gates_yaml(&stacks);
            let cfg: ProjectConfig = serde_yaml::from_str(&yaml).expect("template must parse");
            assert_eq!(cfg.version, 1);
            if stacks.is_empty() {
                assert!(cfg.gates.is_empty());
            } else {
                assert!(!cfg.gates.is_empty());
            }
        }
    }

    #[test]
    fn go_template_filters_on_go_files() {
        let yaml = generate_gates_yaml(&[Stack::Go]);
        let cfg: ProjectConfig = serde_yaml::from_str(&yaml).unwrap();
        let vet = cfg.gates.iter().find(|g| g.name == "go-vet").unwrap();
        assert_eq!(vet.only, vec!["*.go"]);
        assert_eq!(vet.container, "golang:1.23");
    }
}
