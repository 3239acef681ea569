//! Guide configuration
//!
//! One TOML file covers every layer. All sections are optional; missing
//! fields take their defaults.
//!
//! ```toml
//! [vision.detection]
//! confidence_threshold = 0.4
//!
//! [alerts]
//! alert_cooldown_seconds = 3.0
//!
//! [scheduling.cadence]
//! mode = "frame_synced"
//! refresh_hz = 30.0
//! ```

use crate::error::GuideError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use wayfinder_eye::VisionConfig;
use wayfinder_spk::{AlertConfig, SpeechConfig};

/// Complete guide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    pub vision: VisionConfig,
    pub alerts: AlertConfig,
    pub speech: SpeechConfig,
    pub scheduling: SchedulingConfig,
}

/// Frame loop pacing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub cadence: Cadence,
    pub retry: RetryConfig,
}

/// When the next pass starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Cadence {
    /// On the next display refresh; late ticks are skipped, not bunched
    FrameSynced { refresh_hz: f32 },
    /// A fixed pause after each pass, to bound CPU and thermal load
    FixedDelay { delay_millis: u64 },
}

/// Backoff while the inference engine is unavailable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_delay_millis: u64,
    pub max_delay_millis: u64,
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence::FixedDelay { delay_millis: 100 }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_millis: 100,
            max_delay_millis: 5000,
        }
    }
}

impl Cadence {
    /// Time between passes
    pub fn period(&self) -> Duration {
        match *self {
            Cadence::FrameSynced { refresh_hz } if refresh_hz.is_finite() && refresh_hz > 0.0 => {
                Duration::from_secs_f32(1.0 / refresh_hz)
            }
            Cadence::FrameSynced { .. } => Duration::ZERO,
            Cadence::FixedDelay { delay_millis } => Duration::from_millis(delay_millis),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Cadence::FrameSynced { refresh_hz } => {
                if !refresh_hz.is_finite() || refresh_hz <= 0.0 || refresh_hz > 240.0 {
                    return Err("refresh_hz must be in (0, 240]".to_string());
                }
            }
            Cadence::FixedDelay { delay_millis } => {
                if delay_millis > 60_000 {
                    return Err("delay_millis too large (max 60000)".to_string());
                }
            }
        }
        Ok(())
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_delay_millis == 0 {
            return Err("Initial retry delay must be greater than 0".to_string());
        }

        if self.max_delay_millis > 300_000 {
            return Err("Max retry delay too large (max 300000 ms)".to_string());
        }

        if self.initial_delay_millis > self.max_delay_millis {
            return Err("Initial delay cannot be greater than max delay".to_string());
        }

        Ok(())
    }
}

impl GuideConfig {
    /// Read and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, GuideError> {
        let text = std::fs::read_to_string(path)?;
        let config: GuideConfig = toml::from_str(&text)
            .map_err(|e| GuideError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate().map_err(GuideError::Config)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Explicit path if given, else the per-user file if it exists, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self, GuideError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/wayfinder/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wayfinder").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), String> {
        self.vision.validate().map_err(|e| format!("vision: {}", e))?;
        self.alerts.validate().map_err(|e| format!("alerts: {}", e))?;
        self.speech.validate().map_err(|e| format!("speech: {}", e))?;
        self.scheduling.cadence.validate().map_err(|e| format!("scheduling: {}", e))?;
        self.scheduling.retry.validate().map_err(|e| format!("scheduling.retry: {}", e))?;
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, GuideError> {
        toml::to_string_pretty(self).map_err(|e| GuideError::Config(e.to_string()))
    }
}
