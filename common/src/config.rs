use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::region::{MinSize, Region};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transition: TransitionConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub replay: Option<ReplayConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Options recognised by `press_and_wait` and `wait_for_transition_to_end`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionConfig {
    /// Only look at this part of the frame. Omitted means the whole frame.
    #[serde(default)]
    pub region: Option<Region>,
    /// Black & white image, sized like the region; white pixels are analysed.
    #[serde(default)]
    pub mask: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    #[serde(default = "default_stable_secs")]
    pub stable_secs: f64,
    #[serde(default)]
    pub min_size: Option<MinSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Directory of captured frames named `<unix_millis>.<extension>`.
    pub dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// A key-press that already happened while the frames were being captured.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    pub key: String,
    pub press_time_ms: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            region: None,
            mask: None,
            timeout_secs: default_timeout_secs(),
            stable_secs: default_stable_secs(),
            min_size: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TransitionConfig {
    pub fn region(&self) -> Region {
        self.region.unwrap_or(Region::ALL)
    }

    pub fn timeout_ms(&self) -> i64 {
        secs_to_ms(self.timeout_secs)
    }

    pub fn stable_ms(&self) -> i64 {
        secs_to_ms(self.stable_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.timeout_secs.is_finite() || self.timeout_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "timeout_secs must be a non-negative number, got {}",
                self.timeout_secs
            )));
        }
        if !self.stable_secs.is_finite() || self.stable_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "stable_secs must be a non-negative number, got {}",
                self.stable_secs
            )));
        }
        if let Some(min) = self.min_size {
            if min.width == 0 || min.height == 0 {
                return Err(ConfigError::Invalid(format!(
                    "min_size must be non-zero, got {}x{}",
                    min.width, min.height
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::parse(&content)?;
        debug!(path = path.display().to_string(), "config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.transition.validate()?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Seconds to whole milliseconds, rounded to nearest.
pub fn secs_to_ms(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

// Default value functions
fn default_timeout_secs() -> f64 {
    10.0
}
fn default_stable_secs() -> f64 {
    1.0
}
fn default_extension() -> String {
    "png".into()
}
fn default_log_level() -> String {
    "info".into()
}
