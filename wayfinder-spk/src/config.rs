//! Configuration for speech output and alert arbitration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Speech output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speak alerts; when off, alerts complete immediately and only render
    pub enabled: bool,

    /// Preferred speech engine
    pub engine: TtsEngine,

    /// Speech rate (words per minute, 80-500, default 175)
    pub rate: u32,

    /// Volume (0.0-1.0, default 0.8)
    pub volume: f32,

    /// Pitch adjustment (-1.0 to 1.0, default 0.0)
    pub pitch: f32,

    /// Vibrate alongside collision warnings
    pub haptics_enabled: bool,

    /// Voice settings
    pub voice: VoiceConfig,
}

/// Speech engine type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TtsEngine {
    /// Platform speech (espeak-ng on Linux, say on macOS)
    Native,
    /// Logs utterances without producing audio
    Silent,
}

/// Voice configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice name/identifier
    pub name: Option<String>,

    /// Language code (e.g., "en-US", "es-ES")
    pub language: String,
}

/// Alert arbitration thresholds and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Objects nearer than this raise a collision warning
    pub collision_distance_meters: f32,

    /// Collision warnings nearer than this are the most urgent tier
    pub very_close_distance_meters: f32,

    /// Minimum gap between alerts of the same or lower urgency
    pub alert_cooldown_seconds: f32,

    /// Gap between unprompted scene descriptions
    pub scene_summary_interval_seconds: f32,

    /// Hold after a speech failure before the next alert
    pub failure_guard_millis: u64,

    /// An utterance with no completion after this long is abandoned
    pub max_utterance_seconds: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: TtsEngine::Native,
            rate: 175,
            volume: 0.8,
            pitch: 0.0,
            haptics_enabled: true,
            voice: VoiceConfig::default(),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            language: "en-US".to_string(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            collision_distance_meters: 2.0,
            very_close_distance_meters: 1.0,
            alert_cooldown_seconds: 4.0,
            scene_summary_interval_seconds: 15.0,
            failure_guard_millis: 500,
            max_utterance_seconds: 10.0,
        }
    }
}

impl VoiceConfig {
    /// Validate voice configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.language.is_empty() {
            return Err("Language code cannot be empty".to_string());
        }

        if self.language.len() > 32 {
            return Err("Language code too long (max 32 chars)".to_string());
        }

        if !self.language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("Language code contains invalid characters (only alphanumeric and '-' allowed)".to_string());
        }

        if let Some(ref name) = self.name {
            if name.is_empty() {
                return Err("Voice name cannot be empty if provided".to_string());
            }

            if name.len() > 256 {
                return Err("Voice name too long (max 256 chars)".to_string());
            }

            if name.chars().any(|c| c == '\0' || c.is_control()) {
                return Err("Voice name contains invalid characters".to_string());
            }
        }

        Ok(())
    }
}

impl SpeechConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(80..=500).contains(&self.rate) {
            return Err("Speech rate must be between 80 and 500 WPM".to_string());
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }

        if !(-1.0..=1.0).contains(&self.pitch) {
            return Err("Pitch must be between -1.0 and 1.0".to_string());
        }

        self.voice.validate()
    }
}

impl AlertConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("collision_distance_meters", self.collision_distance_meters),
            ("very_close_distance_meters", self.very_close_distance_meters),
            ("scene_summary_interval_seconds", self.scene_summary_interval_seconds),
            ("max_utterance_seconds", self.max_utterance_seconds),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be a positive number", name));
            }
        }

        if !self.alert_cooldown_seconds.is_finite() || self.alert_cooldown_seconds < 0.0 {
            return Err("alert_cooldown_seconds must not be negative".to_string());
        }

        let intervals = [
            ("alert_cooldown_seconds", self.alert_cooldown_seconds),
            ("scene_summary_interval_seconds", self.scene_summary_interval_seconds),
            ("max_utterance_seconds", self.max_utterance_seconds),
        ];
        for (name, value) in intervals {
            if value > MAX_INTERVAL_SECONDS {
                return Err(format!("{} too large (max {})", name, MAX_INTERVAL_SECONDS));
            }
        }

        if self.very_close_distance_meters > self.collision_distance_meters {
            return Err("very_close_distance_meters cannot exceed collision_distance_meters".to_string());
        }

        if self.failure_guard_millis > 60_000 {
            return Err("failure_guard_millis too large (max 60000)".to_string());
        }

        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        seconds(self.alert_cooldown_seconds)
    }

    pub fn scene_summary_interval(&self) -> Duration {
        seconds(self.scene_summary_interval_seconds)
    }

    pub fn failure_guard(&self) -> Duration {
        Duration::from_millis(self.failure_guard_millis)
    }

    pub fn max_utterance(&self) -> Duration {
        seconds(self.max_utterance_seconds)
    }
}

/// Upper bound for every interval setting, in seconds
pub const MAX_INTERVAL_SECONDS: f32 = 3600.0;

// Unvalidated values clamp into [0, MAX_INTERVAL_SECONDS] so from_secs_f32
// and Instant arithmetic cannot overflow.
fn seconds(value: f32) -> Duration {
    if value.is_nan() || value <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f32(value.min(MAX_INTERVAL_SECONDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SpeechConfig::default().validate().is_ok());
        assert!(AlertConfig::default().validate().is_ok());
    }

    #[test]
    fn test_speech_ranges() {
        let mut config = SpeechConfig::default();
        config.volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = SpeechConfig::default();
        config.rate = 20;
        assert!(config.validate().is_err());

        let mut config = SpeechConfig::default();
        config.voice.language = "en US".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alert_distance_order() {
        let config = AlertConfig {
            very_close_distance_meters: 3.0,
            ..AlertConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alert_rejects_nan() {
        let config = AlertConfig {
            collision_distance_meters: f32::NAN,
            ..AlertConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_durations() {
        let config = AlertConfig::default();
        assert_eq!(config.cooldown(), Duration::from_secs(4));
        assert_eq!(config.failure_guard(), Duration::from_millis(500));

        let broken = AlertConfig {
            alert_cooldown_seconds: -1.0,
            ..AlertConfig::default()
        };
        assert_eq!(broken.cooldown(), Duration::ZERO);
    }

    #[test]
    fn test_alert_rejects_huge_intervals() {
        let huge = [
            AlertConfig { alert_cooldown_seconds: 1e30, ..AlertConfig::default() },
            AlertConfig { scene_summary_interval_seconds: 1e30, ..AlertConfig::default() },
            AlertConfig { max_utterance_seconds: 1e30, ..AlertConfig::default() },
        ];
        for config in huge {
            assert!(config.validate().is_err());
        }

        let at_limit = AlertConfig {
            alert_cooldown_seconds: MAX_INTERVAL_SECONDS,
            ..AlertConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_unvalidated_huge_intervals_clamp() {
        let config = AlertConfig {
            alert_cooldown_seconds: 1e30,
            scene_summary_interval_seconds: f32::INFINITY,
            max_utterance_seconds: f32::MAX,
            ..AlertConfig::default()
        };
        let limit = Duration::from_secs(3600);
        assert_eq!(config.cooldown(), limit);
        assert_eq!(config.scene_summary_interval(), limit);
        assert_eq!(config.max_utterance(), limit);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SpeechConfig = serde_json::from_str(r#"{"engine": "silent", "rate": 200}"#).unwrap();
        assert_eq!(config.engine, TtsEngine::Silent);
        assert_eq!(config.rate, 200);
        assert_eq!(config.voice.language, "en-US");
        assert!(config.haptics_enabled);
    }
}
