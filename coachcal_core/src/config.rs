//! Configuration file support for Coachcal.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/coachcal/config.toml`.

use crate::projector::DEFAULT_INDICATOR_LIMIT;
use crate::{Error, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub progress: ProgressConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Calendar display configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Athlete's local offset from UTC; all day boundaries use it
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Session indicators shown per month cell before "+N"
    #[serde(default = "default_month_indicator_limit")]
    pub month_indicator_limit: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            month_indicator_limit: default_month_indicator_limit(),
        }
    }
}

/// Progress report windows
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_weeks_back")]
    pub weeks_back: u32,

    #[serde(default = "default_months_back")]
    pub months_back: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            weeks_back: default_weeks_back(),
            months_back: default_months_back(),
        }
    }
}

// Default value functions
fn home_dir_or_cwd() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir_or_cwd().join(".local/share"));
    base.join("coachcal")
}

fn default_month_indicator_limit() -> usize {
    DEFAULT_INDICATOR_LIMIT
}

fn default_weeks_back() -> u32 {
    8
}

fn default_months_back() -> u32 {
    6
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.offset()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_dir_or_cwd().join(".config"));
        base.join("coachcal").join("config.toml")
    }

    /// The configured UTC offset
    pub fn offset(&self) -> Result<FixedOffset> {
        self.calendar
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::Config(format!(
                    "utc_offset_minutes out of range: {}",
                    self.calendar.utc_offset_minutes
                ))
            })
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
