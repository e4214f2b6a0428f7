//! User-level configuration: `~/.config/gatekeeper/config.yaml`.
//!
//! A missing file yields defaults, never an error. Environment variables
//! override file values. The LLM credential is held as a [`SecretString`] and
//! redacts to `[REDACTED]` in any Debug or serialized form.

use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Default idle TTL for pooled containers.
pub const DEFAULT_CONTAINER_TTL: Duration = Duration::from_secs(5 * 60);

/// Output-related user preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputPrefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

/// User-level settings that persist across projects.
#[derive(Debug, Deserialize)]
pub struct GlobalConfig {
    /// Gemini API key; absent means LLM gates are unavailable.
    #[serde(default)]
    pub gemini_api_key: Option<SecretString>,

    /// Idle TTL before pooled containers are evicted.
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub container_ttl: Duration,

    /// Output preferences.
    #[serde(default)]
    pub output: OutputPrefs,
}

fn default_ttl() -> Duration {
    DEFAULT_CONTAINER_TTL
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            container_ttl: DEFAULT_CONTAINER_TTL,
            output: OutputPrefs::default(),
        }
    }
}

// The credential must never round-trip in clear text. Everything else
// serializes normally.
impl Serialize for GlobalConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GlobalConfig", 3)?;
        state.serialize_field(
            "gemini_api_key",
            &self.gemini_api_key.as_ref().map(|_| "[REDACTED]"),
        )?;
        state.serialize_field(
            "container_ttl",
            &humantime::format_duration(self.container_ttl).to_string(),
        )?;
        state.serialize_field("output", &self.output)?;
        state.end()
    }
}

impl GlobalConfig {
    /// Whether color output is enabled. Defaults to true.
    #[must_use]
    pub fn color(&self) -> bool {
        self.output.color.unwrap_or(true)
    }

    /// Whether verbose output is enabled. Defaults to false.
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.output.verbose.unwrap_or(false)
    }

    /// The credential in clear text, if configured.
    #[must_use]
    pub fn gemini_api_key(&self) -> Option<&str> {
        self.gemini_api_key.as_ref().map(ExposeSecret::expose_secret).map(String::as_str)
    }

    /// Load from the default location (`~/.config/gatekeeper/config.yaml`),
    /// applying environment overrides. A missing home directory or file
    /// yields defaults.
    ///
    /// # Errors
    ///
    /// Only a present-but-unreadable or malformed file is an error.
    pub fn load(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, String> {
        match dirs::home_dir() {
            Some(home) => {
                let path = home.join(".config").join("gatekeeper").join("config.yaml");
                Self::load_from(&path, env)
            }
            None => {
                let mut cfg = Self::default();
                cfg.apply_env_overrides(env);
                Ok(cfg)
            }
        }
    }

    /// Load from a specific path, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Only a present-but-unreadable or malformed file is an error.
    pub fn load_from(path: &Path, env: &dyn Fn(&str) -> Option<String>) -> Result<Self, String> {
        tracing::debug!(path = %path.display(), "loading global config");

        let mut cfg = match std::fs::read_to_string(path) {
            Ok(data) => serde_yaml::from_str(&data)
                .map_err(|err| format!("parsing global config: {err}"))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => return Err(format!("reading global config: {err}")),
        };

        cfg.apply_env_overrides(env);
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self, env: &dyn Fn(&str) -> Option<String>) {
        if let Some(key) = env("GATEKEEPER_GEMINI_KEY").filter(|k| !k.is_empty()) {
            self.gemini_api_key = Some(SecretString::new(key));
        }

        if let Some(ttl) = env("GATEKEEPER_TTL").filter(|t| !t.is_empty()) {
            match humantime::parse_duration(&ttl) {
                Ok(d) => self.container_ttl = d,
                Err(err) => {
                    tracing::warn!(value = %ttl, error = %err, "invalid GATEKEEPER_TTL value, using default");
                }
            }
        }

        if let Some(no_color) = env("GATEKEEPER_NO_COLOR") {
            let no_color = no_color.to_ascii_lowercase();
            if no_color == "1" || no_color == "true" || no_color == "yes" {
                self.output.color = Some(false);
            }
        }
    }
}
