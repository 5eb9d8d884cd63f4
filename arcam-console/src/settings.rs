//! Console settings

use std::path::{Path, PathBuf};

use anyhow::Context;
use arcam_control::ControllerConfig;
use serde::{Deserialize, Serialize};

/// How the console reaches the amplifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Physical serial port from `controller.port`
    #[default]
    Serial,
    /// In-process virtual receiver
    Simulated,
}

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Serial or simulated amplifier
    pub connection_type: ConnectionType,
    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: Option<String>,
    /// Link, polling and reconnect settings
    pub controller: ControllerConfig,
}

impl Settings {
    /// Get the XDG config directory for arcamctl
    /// Uses $XDG_CONFIG_HOME/arcamctl, falls back to ~/.config/arcamctl
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("arcamctl"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("arcamctl"))
    }

    /// Default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load from the default location, falling back to defaults if no file exists
    pub fn load() -> anyhow::Result<Self> {
        match Self::settings_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse settings in {}", path.display()))
    }

    /// Effective log filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// Default filter covering every crate in the workspace
pub const DEFAULT_LOG_FILTER: &str =
    "arcamctl=info,arcam_protocol=info,arcam_control=info,arcam_sim=info";
