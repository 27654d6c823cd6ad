//! Configuration management for mood-charts

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::window::WindowType;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Database settings
    pub database: DatabaseConfig,

    /// Chart view settings
    pub chart: ChartConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Data directory (default: ~/.local/share/mood-charts)
    pub data_dir: Option<PathBuf>,
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path (default: `<data_dir>/moods.duckdb`)
    pub path: Option<String>,
}

/// Chart view settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Window shown when none is given on the command line
    pub default_window: WindowType,

    /// Subject whose full log (raw mood and events) is charted
    pub owner_id: i64,

    /// Logged days in the rolling mean/deviation window
    pub rolling_window: usize,

    /// Give up on a fetch after this long, e.g. "5s" (unset = wait forever)
    pub fetch_timeout: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: None,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            default_window: WindowType::Month,
            owner_id: 1,
            rolling_window: crate::db::DEFAULT_ROLLING_WINDOW,
            fetch_timeout: None,
        }
    }
}

impl ChartConfig {
    /// Parsed `fetch_timeout`
    pub fn fetch_timeout(&self) -> Result<Option<Duration>> {
        self.fetch_timeout
            .as_deref()
            .map(|s| {
                humantime::parse_duration(s)
                    .map_err(|e| Error::config(format!("invalid fetch_timeout '{s}': {e}")))
            })
            .transpose()
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::config("Could not determine config directory"))?;
        Ok(config_dir.join("mood-charts").join("config.toml"))
    }

    /// Get the data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.general.data_dir {
            Ok(dir.clone())
        } else {
            let data_dir = dirs::data_local_dir()
                .ok_or_else(|| Error::config("Could not determine data directory"))?;
            Ok(data_dir.join("mood-charts"))
        }
    }

    /// Get the database path
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.database.path {
            return Ok(PathBuf::from(path));
        }
        Ok(self.data_dir()?.join("moods.duckdb"))
    }

    /// Validate configuration values.
    ///
    /// Call this after loading to ensure all values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "log_level must be one of {:?}, got '{}'",
                valid_levels, self.general.log_level
            )));
        }

        let window_range = crate::db::ROLLING_WINDOW_RANGE;
        if !window_range.contains(&self.chart.rolling_window) {
            return Err(Error::config(format!(
                "rolling_window must be between {} and {} days, got {}",
                window_range.start(),
                window_range.end(),
                self.chart.rolling_window
            )));
        }

        if self.chart.owner_id < 1 {
            return Err(Error::config(format!(
                "owner_id must be positive, got {}",
                self.chart.owner_id
            )));
        }

        self.chart.fetch_timeout()?;

        Ok(())
    }
}
