//! Server settings
//!
//! Settings live in a YAML (or JSON, by extension) file. A missing file
//! yields the defaults, and every field may be omitted.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CapabilityError, Result};

/// Name of the settings file inside the config directory
const SETTINGS_FILE: &str = "server.yaml";

/// When discovery runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPolicy {
    /// Only when discovery is requested explicitly (server startup)
    Startup,
    /// Before every catalog and dispatch request
    #[default]
    EveryRequest,
}

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Configuration consumed by the builtin tool units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Timeout applied by the HTTP client tool unless a call overrides it
    pub http_timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server name reported during initialization
    pub server_name: String,
    /// When capability units are discovered
    pub discovery: DiscoveryPolicy,
    /// Unit ids excluded from discovery
    pub disabled_units: Vec<String>,
    /// Seconds before a request-path refresh retries a unit that failed to load
    pub retry_interval_secs: u64,
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
    pub http: HttpSettings,
    pub tools: ToolSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_name: "chatdata-mcp".to_string(),
            discovery: DiscoveryPolicy::default(),
            disabled_units: Vec::new(),
            retry_interval_secs: 30,
            log_filter: None,
            http: HttpSettings::default(),
            tools: ToolSettings::default(),
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "chatdata", "chatdata-mcp")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Load settings from `path`, falling back to defaults if it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings = if is_json(path) {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };

        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to `path`
    pub async fn save(&self, path: &Path) -> Result<()> {
        let contents = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)?
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, path).await?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Reject settings no server could run with
    pub fn validate(&self) -> Result<()> {
        if self.server_name.trim().is_empty() {
            return Err(CapabilityError::SettingsError(
                "server_name must not be empty".to_string(),
            ));
        }
        if self.tools.http_timeout_secs == 0 {
            return Err(CapabilityError::SettingsError(
                "tools.http_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
