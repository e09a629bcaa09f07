//! Configuration management for Cosmic Md2Word
//!
//! Configuration lives in `config.json` under the platform config directory.
//! A missing file means defaults; a malformed one is reported and ignored.

use crate::error::{ConfigError, ConfigResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier following reverse-DNS convention
pub const APP_ID: &str = "com.cosmic.Md2Word";

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Name of the optional user macro table for the math typesetter
pub const MACROS_FILE_NAME: &str = "macros.json";

/// Default backend address
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Quiet period before an edit propagates to the preview
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// How long an alert stays on screen
pub const DEFAULT_ALERT_MS: u64 = 3000;

/// Maximum image size accepted for formula recognition - 10MB
pub const MAX_IMAGE_SIZE: u64 = 10 * 1024 * 1024;

/// Split pane limits, in percent of the container width
pub const MIN_SPLIT_PERCENT: f32 = 20.0;
pub const MAX_SPLIT_PERCENT: f32 = 80.0;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection
    pub server: ServerConfig,

    /// Editor behaviour
    pub editor: EditorConfig,

    /// UI configuration
    pub ui: UiConfig,

    /// Formula recognition
    pub ocr: OcrConfig,

    /// Math typesetting
    pub math: MathConfig,
}

impl Config {
    /// Load configuration from the config directory or return defaults
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_dir()?.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))
            .map_err(|e| ConfigError::LoadError(format!("{:#}", e)))?;
        let config: Config =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the application cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "server.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !(MIN_SPLIT_PERCENT..=MAX_SPLIT_PERCENT).contains(&self.ui.default_split_percent) {
            return Err(ConfigError::InvalidValue {
                key: "ui.default_split_percent".to_string(),
                reason: format!("must be between {} and {}", MIN_SPLIT_PERCENT, MAX_SPLIT_PERCENT),
            });
        }
        if self.ocr.max_image_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ocr.max_image_bytes".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Get the configuration directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Path of the user macro table for the math typesetter
    pub fn macros_path() -> ConfigResult<PathBuf> {
        Self::config_dir().map(|p| p.join(MACROS_FILE_NAME))
    }

    /// Directory converted documents are saved into
    pub fn download_dir(&self) -> PathBuf {
        self.editor
            .download_dir
            .clone()
            .or_else(dirs::download_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL the `/api/*` and `/recognize_formula` paths are joined to
    pub base_url: String,

    /// Optional per-request timeout; transport defaults apply when unset
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Editor-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before a change reaches the preview
    pub debounce_ms: u64,

    /// File name (without extension) requested from the converter
    pub convert_filename: String,

    /// Where converted documents are written; defaults to the Downloads folder
    pub download_dir: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            convert_filename: "document".to_string(),
            download_dir: None,
        }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Alert lifetime in milliseconds
    pub alert_ms: u64,

    /// Initial editor share of the split view
    pub default_split_percent: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            alert_ms: DEFAULT_ALERT_MS,
            default_split_percent: 50.0,
        }
    }
}

impl UiConfig {
    pub fn alert_duration(&self) -> Duration {
        Duration::from_millis(self.alert_ms)
    }
}

/// Formula recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Largest accepted image, in bytes
    pub max_image_bytes: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: MAX_IMAGE_SIZE,
        }
    }
}

/// Math typesetting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MathConfig {
    /// Interval between engine readiness checks
    pub poll_interval_ms: u64,

    /// Give up waiting for the engine after this long
    pub ready_timeout_ms: u64,

    /// Delay before retrying a typeset pass while the engine loads
    pub retry_delay_ms: u64,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            ready_timeout_ms: 10_000,
            retry_delay_ms: 500,
        }
    }
}

impl MathConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
