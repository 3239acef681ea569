//! Session status broadcast

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const STATUS_BUFFER_SIZE: usize = 64;

/// Coarse health of the guide, as a listener would want to hear it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideStatus {
    Starting,
    Online,
    /// The inference engine is not answering; retrying after `retry_in_millis`
    InferenceUnavailable { retry_in_millis: u64 },
    CameraUnavailable(String),
    /// Speech is off; alerts are still drawn
    SpeechUnavailable(String),
    Stopped,
}

/// A status change with the wall-clock time it happened
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub status: GuideStatus,
    pub at: DateTime<Utc>,
}

/// Publishes status changes to any number of subscribers
pub struct StatusChannel {
    sender: broadcast::Sender<StatusUpdate>,
    current: Mutex<Option<GuideStatus>>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(STATUS_BUFFER_SIZE);
        Self {
            sender,
            current: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.sender.subscribe()
    }

    /// Publish `status` unless it repeats the current one.
    /// Returns whether anything was sent.
    pub fn publish(&self, status: GuideStatus) -> bool {
        {
            let mut current = self.current.lock();
            if current.as_ref() == Some(&status) {
                return false;
            }
            *current = Some(status.clone());
        }

        debug!("Guide status: {:?}", status);
        // No subscribers is fine
        let _ = self.sender.send(StatusUpdate {
            status,
            at: Utc::now(),
        });
        true
    }

    pub fn current(&self) -> Option<GuideStatus> {
        self.current.lock().clone()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}
