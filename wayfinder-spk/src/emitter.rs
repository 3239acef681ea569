//! Fire-and-forget alert playback
//!
//! Each accepted alert is spoken (and vibrated) on its own task. The task
//! reports back through an mpsc channel rather than being awaited, so the
//! frame loop never blocks on audio. At most one utterance task is alive:
//! a new alert aborts the previous one.

use crate::arbiter::{Alert, SpeechEvent};
use crate::engines::{HapticEngine, SpeechEngine};
use crate::error::SpeechError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Plays alerts and posts their completion events
pub struct AlertEmitter {
    speech: Arc<dyn SpeechEngine>,
    haptics: Option<Arc<dyn HapticEngine>>,
    speech_enabled: bool,
    events: mpsc::UnboundedSender<SpeechEvent>,
    in_flight: Option<(u64, JoinHandle<()>)>,
    stopped: bool,
}

impl AlertEmitter {
    /// Create an emitter and the receiver its completion events arrive on.
    /// `haptics` of `None` disables vibration.
    pub fn new(
        speech: Arc<dyn SpeechEngine>,
        haptics: Option<Arc<dyn HapticEngine>>,
        speech_enabled: bool,
    ) -> (Self, mpsc::UnboundedReceiver<SpeechEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                speech,
                haptics,
                speech_enabled,
                events,
                in_flight: None,
                stopped: false,
            },
            receiver,
        )
    }

    pub fn speech_engine(&self) -> &Arc<dyn SpeechEngine> {
        &self.speech
    }

    /// Id of the utterance still playing, if any
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
            .as_ref()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| *id)
    }

    /// Start playing `alert`, replacing anything still in flight.
    pub fn emit(&mut self, alert: &Alert) {
        if self.stopped {
            debug!("Emitter stopped; dropping alert {}", alert.id);
            return;
        }

        self.cancel_current();

        let id = alert.id;
        let events = self.events.clone();
        let speech = self.speech_enabled.then(|| self.speech.clone());
        let haptics = self.haptics.clone();
        let utterance = alert.utterance.clone();
        let vibration = alert.vibration.clone();

        let handle = tokio::spawn(async move {
            let vibrate = async move {
                if let (Some(haptics), Some(pattern)) = (haptics, vibration) {
                    if let Err(e) = haptics.vibrate(&pattern).await {
                        warn!("Haptic output failed: {}", e);
                    }
                }
            };
            let speak = async move {
                match speech {
                    Some(engine) => engine.speak(&utterance).await,
                    None => Ok(()),
                }
            };

            let ((), result) = tokio::join!(vibrate, speak);
            let event = match result {
                Ok(()) => SpeechEvent::Finished { id },
                Err(SpeechError::Cancelled) => {
                    debug!("Utterance {} cancelled", id);
                    return;
                }
                Err(e) => SpeechEvent::Failed {
                    id,
                    error: e.to_string(),
                },
            };
            // The receiver is gone only when the session has ended.
            let _ = events.send(event);
        });

        self.in_flight = Some((id, handle));
    }

    /// Abort the utterance in flight, if any
    pub fn cancel_current(&mut self) {
        if let Some((id, handle)) = self.in_flight.take() {
            if !handle.is_finished() {
                debug!("Cancelling utterance {}", id);
                handle.abort();
                self.speech.cancel();
            }
        }
    }

    /// Stop playback for good. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.cancel_current();
        self.speech.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Drop for AlertEmitter {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::{AlertKind, Urgency};
    use crate::engines::haptic::TracingHaptics;
    use crate::engines::silent::SilentSpeechEngine;
    use crate::engines::VibrationPattern;
    use async_trait::async_trait;
    use std::time::Duration;

    struct BrokenSpeech;

    #[async_trait]
    impl SpeechEngine for BrokenSpeech {
        async fn speak(&self, _text: &str) -> Result<(), SpeechError> {
            Err(SpeechError::Engine("audio device lost".into()))
        }

        fn cancel(&self) {}

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn alert(id: u64, vibration: Option<VibrationPattern>) -> Alert {
        Alert {
            id,
            urgency: Urgency::Close,
            kind: AlertKind::SceneSummary { labels: vec![] },
            utterance: format!("alert {}", id),
            vibration,
            preempts: None,
        }
    }

    #[tokio::test]
    async fn test_completion_event_posted() {
        let speech = Arc::new(SilentSpeechEngine::new());
        let haptics = Arc::new(TracingHaptics::new());
        let (mut emitter, mut events) = AlertEmitter::new(speech.clone(), Some(haptics.clone()), true);

        emitter.emit(&alert(1, Some(VibrationPattern::Single(200))));
        assert_eq!(events.recv().await, Some(SpeechEvent::Finished { id: 1 }));
        assert_eq!(speech.transcript(), vec!["alert 1"]);
        assert_eq!(haptics.played(), vec![VibrationPattern::Single(200)]);
    }

    #[tokio::test]
    async fn test_failure_event_posted() {
        let (mut emitter, mut events) = AlertEmitter::new(Arc::new(BrokenSpeech), None, true);
        emitter.emit(&alert(7, None));
        match events.recv().await {
            Some(SpeechEvent::Failed { id, error }) => {
                assert_eq!(id, 7);
                assert!(error.contains("audio device lost"));
            }
            other => panic!("Expected failure event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disabled_speech_finishes_immediately() {
        let speech = Arc::new(SilentSpeechEngine::new());
        let (mut emitter, mut events) = AlertEmitter::new(speech.clone(), None, false);
        emitter.emit(&alert(3, None));
        assert_eq!(events.recv().await, Some(SpeechEvent::Finished { id: 3 }));
        assert!(speech.transcript().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preemption_aborts_previous_task() {
        let speech = Arc::new(SilentSpeechEngine::with_duration(Duration::from_secs(3)));
        let (mut emitter, mut events) = AlertEmitter::new(speech.clone(), None, true);

        emitter.emit(&alert(1, None));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(emitter.in_flight(), Some(1));

        emitter.emit(&alert(2, None));
        assert_eq!(events.recv().await, Some(SpeechEvent::Finished { id: 2 }));
        assert_eq!(speech.transcript(), vec!["alert 1", "alert 2"]);
        // Nothing else ever arrives for the aborted utterance
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let speech = Arc::new(SilentSpeechEngine::with_duration(Duration::from_secs(3)));
        let (mut emitter, mut events) = AlertEmitter::new(speech.clone(), None, true);

        emitter.emit(&alert(1, None));
        tokio::time::sleep(Duration::from_millis(10)).await;
        emitter.stop();
        emitter.stop();
        assert!(emitter.is_stopped());
        assert_eq!(emitter.in_flight(), None);

        emitter.emit(&alert(2, None));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(speech.transcript(), vec!["alert 1"]);
    }
}
