//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! backend connection, list-view defaults and progress display settings.
//! Every section defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub view: ViewConfig,
    pub progress: ProgressConfig,
    /// Language profile used when a command does not name one.
    #[serde(default = "default_profile_id")]
    pub profile_id: i64,
}

fn default_profile_id() -> i64 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            view: ViewConfig::default(),
            progress: ProgressConfig::default(),
            profile_id: default_profile_id(),
        }
    }
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, the file does not exist, or it cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let url = self.backend.url.trim();
        if url.is_empty() {
            warnings.push("backend.url is empty".into());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!("backend.url '{url}' is not an http(s) URL"));
        }

        if self.backend.timeout_secs == 0 {
            warnings.push("backend.timeout_secs is 0; requests will fail immediately".into());
        }

        if self.view.page_size == 0 {
            warnings.push("view.page_size is 0; a page size of 1 will be used".into());
        }

        if self.profile_id <= 0 {
            warnings.push(format!("profile_id {} is not a valid id", self.profile_id));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Subtitle backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9876".into(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// List view defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_sort")]
    pub default_sort: String,
    pub descending: bool,
}

fn default_page_size() -> usize {
    25
}

fn default_sort() -> String {
    "title".into()
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_sort: default_sort(),
            descending: false,
        }
    }
}

/// Batch progress display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Seconds a finished job stays visible; 0 keeps it until dismissed.
    #[serde(default = "default_auto_dismiss")]
    pub auto_dismiss_secs: u64,
}

fn default_auto_dismiss() -> u64 {
    5
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            auto_dismiss_secs: default_auto_dismiss(),
        }
    }
}
