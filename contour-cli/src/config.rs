//! Contour configuration loading from `.contour.toml`.
//!
//! Configuration is optional. Every setting has a default, and command-line
//! flags override whatever the file says.
//!
//! # Example Configuration
//!
//! ```toml
//! [scope]
//! ignore_file = ".scopeignore"
//! extension = "sol"
//! ignore = ["script/"]
//!
//! [analysis]
//! threads = 4
//! timeout_secs = 300
//!
//! [output]
//! format = "json"
//! color = true
//! file = "changed_declarations.json"
//!
//! [submit]
//! endpoint = "https://audit.example.com/api/v1/changes"
//! token_env = "CONTOUR_AUDIT_TOKEN"
//! timeout_secs = 30
//! retries = 3
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use contour_core::scope::{DEFAULT_EXTENSION, DEFAULT_SCOPEIGNORE};

/// Name of the configuration file looked up in the tree root.
pub const CONFIG_FILE: &str = ".contour.toml";

/// Environment variable holding the audit service bearer token, unless overridden.
pub const DEFAULT_TOKEN_ENV: &str = "CONTOUR_AUDIT_TOKEN";

/// Root configuration structure loaded from `.contour.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct ContourConfig {
    /// Which files enter analysis.
    #[serde(default)]
    pub scope: ScopeConfig,

    /// Pipeline tuning.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,

    /// Audit service submission.
    #[serde(default)]
    pub submit: SubmitConfig,
}

/// Scope filter configuration.
#[derive(Debug, Deserialize, Default)]
pub struct ScopeConfig {
    /// Ignore file relative to the tree root. Default: `.scopeignore`.
    #[serde(default)]
    pub ignore_file: Option<String>,

    /// Source file extension without the dot. Default: `sol`.
    #[serde(default)]
    pub extension: Option<String>,

    /// Extra rules appended after the ignore file's rules.
    ///
    /// # Example
    /// ```toml
    /// ignore = ["script/", "!script/Deploy.sol"]
    /// ```
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AnalysisConfig {
    /// Worker threads. Default: one per core.
    #[serde(default)]
    pub threads: Option<usize>,

    /// Run deadline in seconds. Default: none.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g., `--format table`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Valid values: `json`, `table`. Default: `json`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output in table mode.
    #[serde(default)]
    pub color: Option<bool>,

    /// Also write the JSON report to this file.
    #[serde(default)]
    pub file: Option<String>,
}

/// Audit service settings.
#[derive(Debug, Deserialize)]
pub struct SubmitConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_submit_timeout")]
    pub timeout_secs: u64,

    /// Total attempts, including the first.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_submit_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token_env: default_token_env(),
            timeout_secs: default_submit_timeout(),
            retries: default_retries(),
        }
    }
}

impl ContourConfig {
    /// Load configuration from `.contour.toml` in the given directory.
    ///
    /// A missing file yields defaults. A file that does not parse is logged as a
    /// warning and also yields defaults. Any other read failure is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        match std::fs::read_to_string(&config_path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::debug!("Loaded {}", config_path.display());
                    Ok(config)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    Ok(Self::default())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read {}", config_path.display()))
            }
        }
    }

    /// Ignore file path relative to the tree root.
    pub fn ignore_file(&self) -> &str {
        self.scope.ignore_file.as_deref().unwrap_or(DEFAULT_SCOPEIGNORE)
    }

    pub fn extension(&self) -> &str {
        self.scope.extension.as_deref().unwrap_or(DEFAULT_EXTENSION)
    }

    /// Extra scope rules joined as ignore-file content.
    pub fn extra_rules(&self) -> String {
        self.scope.ignore.join("\n")
    }

    pub fn threads(&self) -> Option<usize> {
        self.analysis.threads
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.analysis.timeout_secs.map(Duration::from_secs)
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Returns the configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    pub fn output_file(&self) -> Option<&str> {
        self.output.file.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.submit.endpoint.as_deref()
    }

    /// Bearer token from the configured environment variable, if set and non-empty.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.submit.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit.timeout_secs)
    }

    pub fn retries(&self) -> u32 {
        self.submit.retries.max(1)
    }
}
