//! Speech engine that only logs

use crate::engines::SpeechEngine;
use crate::error::SpeechError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

/// Logs utterances instead of playing them; keeps a transcript.
#[derive(Default)]
pub struct SilentSpeechEngine {
    /// Simulated speaking time
    duration: Duration,
    transcript: Mutex<Vec<String>>,
    cancel: Notify,
}

impl SilentSpeechEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each utterance takes `duration` to "play"
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    /// Everything spoken so far, in order
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().clone()
    }
}

#[async_trait]
impl SpeechEngine for SilentSpeechEngine {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        info!(target: "wayfinder::speech", "{}", text);
        self.transcript.lock().push(text.to_string());

        if self.duration.is_zero() {
            return Ok(());
        }

        let cancelled = self.cancel.notified();
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => Ok(()),
            _ = cancelled => Err(SpeechError::Cancelled),
        }
    }

    fn cancel(&self) {
        self.cancel.notify_waiters();
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "silent"
    }
}
