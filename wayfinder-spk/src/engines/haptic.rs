//! Haptic output that reports through tracing

use crate::engines::{HapticEngine, VibrationPattern};
use crate::error::SpeechError;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

/// Stand-in vibration motor: logs each pattern and remembers it
#[derive(Default)]
pub struct TracingHaptics {
    played: Mutex<Vec<VibrationPattern>>,
}

impl TracingHaptics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<VibrationPattern> {
        self.played.lock().clone()
    }
}

#[async_trait]
impl HapticEngine for TracingHaptics {
    async fn vibrate(&self, pattern: &VibrationPattern) -> Result<(), SpeechError> {
        debug!("Vibrate {:?} ({} ms)", pattern, pattern.total_millis());
        self.played.lock().push(pattern.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
