//! Speech and haptic engine implementations

pub mod haptic;
pub mod native;
pub mod silent;

use crate::error::SpeechError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for speech engines
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Speak `text`, resolving once the utterance has finished playing
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;

    /// Stop whatever is currently being spoken
    fn cancel(&self);

    /// Check if engine is available
    fn is_available(&self) -> bool;

    /// Get engine name
    fn name(&self) -> &str;
}

/// Vibration to play, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VibrationPattern {
    Single(u32),
    /// Alternating on/off durations, starting with on
    Pulses(Vec<u32>),
}

impl VibrationPattern {
    pub fn total_millis(&self) -> u32 {
        match self {
            VibrationPattern::Single(ms) => *ms,
            VibrationPattern::Pulses(steps) => steps.iter().sum(),
        }
    }
}

/// Trait for haptic output
#[async_trait]
pub trait HapticEngine: Send + Sync {
    async fn vibrate(&self, pattern: &VibrationPattern) -> Result<(), SpeechError>;

    fn name(&self) -> &str;
}
