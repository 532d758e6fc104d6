//! Client configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (CONFAB_*)
//! - TOML configuration file
//! - Command line arguments (room and handle)

use anyhow::{Context, Result};
use confab_core::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server origin, e.g. `http://localhost:9000`. An `http(s)` scheme is
    /// upgraded to `ws(s)` when the room URL is built.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Preferred handle; the server may assign a different one.
    #[serde(default = "default_handle")]
    pub handle: Option<String>,

    /// Session timing.
    #[serde(default)]
    pub session: SessionSettings,
}

/// Session timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Wait before a reconnect attempt, in milliseconds.
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,

    /// Debounce window for typing signals, in milliseconds.
    #[serde(default = "default_typing_debounce")]
    pub typing_debounce_ms: u64,
}

// Default value functions
fn default_origin() -> String {
    std::env::var("CONFAB_ORIGIN").unwrap_or_else(|_| "http://localhost:9000".to_string())
}

fn default_handle() -> Option<String> {
    std::env::var("CONFAB_HANDLE").ok()
}

fn default_reconnect_interval() -> u64 {
    4_000
}

fn default_typing_debounce() -> u64 {
    3_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            handle: default_handle(),
            session: SessionSettings::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: default_reconnect_interval(),
            typing_debounce_ms: default_typing_debounce(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        // Try to load from default paths
        let config_paths = ["confab.toml", "~/.config/confab/confab.toml"];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Session configuration derived from the timing settings.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            reconnect_interval: Duration::from_millis(self.session.reconnect_interval_ms),
            typing_debounce: Duration::from_millis(self.session.typing_debounce_ms),
            ..SessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_settings() {
        let config = Config {
            origin: "http://localhost:9000".into(),
            handle: None,
            session: SessionSettings::default(),
        };
        let session = config.session_config();
        assert_eq!(session.reconnect_interval, Duration::from_millis(4_000));
        assert_eq!(session.typing_debounce, Duration::from_millis(3_000));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            origin = "https://chat.example.com"
            handle = "ada"

            [session]
            reconnect_interval_ms = 2000
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.origin, "https://chat.example.com");
        assert_eq!(config.handle.as_deref(), Some("ada"));
        assert_eq!(config.session.reconnect_interval_ms, 2000);
        assert_eq!(config.session.typing_debounce_ms, 3_000);
    }
}
