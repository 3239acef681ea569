//! Frame loop
//!
//! A single task drives the pipeline. Each pass runs to completion
//! (capture, detect, enrich, draw, arbitrate) before the next one is
//! scheduled, either on a refresh tick or after a fixed delay. Speech is
//! started from a pass but never awaited by it.

use crate::config::{Cadence, GuideConfig, RetryConfig, SchedulingConfig};
use crate::error::{Disposition, GuideError};
use crate::status::{GuideStatus, StatusChannel};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use wayfinder_eye::camera::FrameSource;
use wayfinder_eye::models::InferenceEngine;
use wayfinder_eye::processing::{build_source, DetectionSource};
use wayfinder_eye::render::{overlay_commands, Renderer};
use wayfinder_eye::{EnrichedDetection, SceneAnalyzer, VisionError};
use wayfinder_spk::engines::haptic::TracingHaptics;
use wayfinder_spk::engines::native::NativeSpeechEngine;
use wayfinder_spk::engines::silent::SilentSpeechEngine;
use wayfinder_spk::{
    Alert, AlertArbiter, AlertEmitter, HapticEngine, SpeechConfig, SpeechEngine, SpeechEvent, TtsEngine,
};

/// External collaborators of a pipeline
pub struct Collaborators {
    pub camera: Box<dyn FrameSource>,
    pub inference: Arc<dyn InferenceEngine>,
    pub renderer: Box<dyn Renderer>,
    pub speech: Arc<dyn SpeechEngine>,
    pub haptics: Option<Arc<dyn HapticEngine>>,
}

/// Result of one successful pass
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub detections: Vec<EnrichedDetection>,
    pub alert: Option<Alert>,
}

/// Everything one pass needs, owned by the loop task
pub struct Pipeline {
    camera: Box<dyn FrameSource>,
    detector: Arc<dyn DetectionSource>,
    analyzer: SceneAnalyzer,
    renderer: Box<dyn Renderer>,
    arbiter: AlertArbiter,
    emitter: AlertEmitter,
    events: mpsc::UnboundedReceiver<SpeechEvent>,
}

impl Pipeline {
    pub fn new(config: &GuideConfig, parts: Collaborators) -> Result<Self, GuideError> {
        let detector = build_source(config.vision.engine_output, parts.inference, &config.vision.detection)?;
        let (emitter, events) = AlertEmitter::new(parts.speech, parts.haptics, config.speech.enabled);

        info!(
            "Pipeline ready: camera '{}', {} detections",
            parts.camera.name(),
            detector.name()
        );

        Ok(Self {
            camera: parts.camera,
            detector,
            analyzer: SceneAnalyzer::new(&config.vision),
            renderer: parts.renderer,
            arbiter: AlertArbiter::new(config.alerts.clone()),
            emitter,
            events,
        })
    }

    pub fn arbiter(&self) -> &AlertArbiter {
        &self.arbiter
    }

    /// Apply speech completions and time-driven alert transitions
    fn settle_alerts(&mut self) {
        let now = Instant::now();
        while let Ok(event) = self.events.try_recv() {
            self.arbiter.handle_event(event, now);
        }
        if let Some(abandoned) = self.arbiter.tick(now) {
            if self.emitter.in_flight() == Some(abandoned) {
                self.emitter.cancel_current();
            }
        }
    }

    /// Run one full pass
    pub async fn run_pass(&mut self) -> Result<PassOutcome, GuideError> {
        self.settle_alerts();

        let frame = self.camera.next_frame().await?;
        let detections = self.detector.detect(&frame).await?;
        let enriched = self.analyzer.analyze(&frame, detections);

        self.renderer.render(frame.dimensions(), &overlay_commands(&enriched));

        let alert = self.arbiter.evaluate(&enriched, Instant::now());
        if let Some(alert) = &alert {
            self.emitter.emit(alert);
        }

        Ok(PassOutcome {
            detections: enriched,
            alert,
        })
    }

    /// Silence output; the pipeline runs no further alerts afterwards.
    pub fn shutdown(&mut self) {
        self.emitter.stop();
    }
}

/// Speech engine for `config`, falling back to silence when native speech
/// cannot be used.
pub fn speech_engine_for(config: &SpeechConfig, status: &StatusChannel) -> Arc<dyn SpeechEngine> {
    if config.engine == TtsEngine::Native {
        let native = NativeSpeechEngine::new(config);
        if native.is_available() {
            return Arc::new(native);
        }
        warn!("Native speech unavailable; alerts will only be logged and drawn");
        status.publish(GuideStatus::SpeechUnavailable("native speech engine not found".to_string()));
    }
    Arc::new(SilentSpeechEngine::new())
}

pub fn haptics_for(config: &SpeechConfig) -> Option<Arc<dyn HapticEngine>> {
    if !config.haptics_enabled {
        return None;
    }
    let haptics: Arc<dyn HapticEngine> = Arc::new(TracingHaptics::new());
    Some(haptics)
}

/// Doubling delay between retries, capped
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(config: &RetryConfig) -> Self {
        let initial = Duration::from_millis(config.initial_delay_millis.max(1));
        Self {
            initial,
            max: Duration::from_millis(config.max_delay_millis).max(initial),
            next: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

/// Why the loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    EndOfStream,
    Fatal(String),
}

/// Counters for a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub passes: u64,
    pub skipped: u64,
    pub retries: u64,
    pub alerts: u64,
    pub reason: StopReason,
}

/// Cloneable stop switch. Stopping twice is harmless.
#[derive(Clone)]
pub struct Stopper {
    shutdown: Arc<watch::Sender<bool>>,
}

impl Stopper {
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Handle to a running frame loop
pub struct LoopHandle {
    stopper: Stopper,
    pipeline: Arc<Mutex<Pipeline>>,
    status: Arc<StatusChannel>,
    task: JoinHandle<LoopSummary>,
}

impl LoopHandle {
    pub fn stopper(&self) -> Stopper {
        self.stopper.clone()
    }

    /// Cancel the pending pass and end the loop
    pub fn stop(&self) {
        self.stopper.stop();
    }

    pub fn status(&self) -> Arc<StatusChannel> {
        self.status.clone()
    }

    /// Run an extra pass right now, outside the schedule. Refused while
    /// another pass is outstanding.
    pub async fn run_pass_now(&self) -> Result<PassOutcome, GuideError> {
        if self.stopper.is_stopped() {
            return Err(GuideError::Task("frame loop is stopped".to_string()));
        }
        let mut pipeline = self.pipeline.try_lock().map_err(|_| GuideError::PassInFlight)?;
        pipeline.run_pass().await
    }

    /// Wait for the loop to end
    pub async fn join(self) -> Result<LoopSummary, GuideError> {
        self.task.await.map_err(|e| GuideError::Task(e.to_string()))
    }
}

pub struct FrameLoop;

impl FrameLoop {
    pub fn spawn(pipeline: Pipeline, scheduling: SchedulingConfig, status: Arc<StatusChannel>) -> LoopHandle {
        let (shutdown, receiver) = watch::channel(false);
        let pipeline = Arc::new(Mutex::new(pipeline));

        let task = tokio::spawn(run_loop(pipeline.clone(), scheduling, status.clone(), receiver));

        LoopHandle {
            stopper: Stopper {
                shutdown: Arc::new(shutdown),
            },
            pipeline,
            status,
            task,
        }
    }
}

async fn run_loop(
    pipeline: Arc<Mutex<Pipeline>>,
    scheduling: SchedulingConfig,
    status: Arc<StatusChannel>,
    mut shutdown: watch::Receiver<bool>,
) -> LoopSummary {
    let mut ticker = match scheduling.cadence {
        Cadence::FrameSynced { .. } => {
            let mut interval = tokio::time::interval(scheduling.cadence.period().max(Duration::from_millis(1)));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            Some(interval)
        }
        Cadence::FixedDelay { .. } => None,
    };
    let delay = scheduling.cadence.period();
    let mut backoff = Backoff::new(&scheduling.retry);

    let mut summary = LoopSummary {
        passes: 0,
        skipped: 0,
        retries: 0,
        alerts: 0,
        reason: StopReason::Requested,
    };
    // First pass runs at once. An interval's first tick completes immediately.
    let mut pause = if ticker.is_some() { None } else { Some(Duration::ZERO) };

    info!("Frame loop started ({:?})", scheduling.cadence);
    loop {
        if *shutdown.borrow() {
            break;
        }

        let wait = async {
            match (pause, ticker.as_mut()) {
                (Some(d), _) => tokio::time::sleep(d).await,
                (None, Some(t)) => {
                    t.tick().await;
                }
                (None, None) => tokio::time::sleep(delay).await,
            }
        };
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = wait => {}
        }

        let result = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            result = async { pipeline.lock().await.run_pass().await } => result,
        };

        pause = None;
        match result {
            Ok(outcome) => {
                summary.passes += 1;
                if outcome.alert.is_some() {
                    summary.alerts += 1;
                }
                backoff.reset();
                status.publish(GuideStatus::Online);
            }
            Err(e) => match e.disposition() {
                Disposition::SkipFrame => {
                    warn!("Skipping frame: {}", e);
                    summary.skipped += 1;
                }
                Disposition::Retry => {
                    let retry_in = backoff.next_delay();
                    warn!("Inference unavailable, retrying in {:?}: {}", retry_in, e);
                    summary.retries += 1;
                    status.publish(GuideStatus::InferenceUnavailable {
                        retry_in_millis: retry_in.as_millis() as u64,
                    });
                    pause = Some(retry_in);
                }
                Disposition::EndOfStream => {
                    info!("Camera stream ended");
                    summary.reason = StopReason::EndOfStream;
                    break;
                }
                Disposition::Fatal => {
                    error!("Frame loop stopping: {}", e);
                    if let GuideError::Vision(VisionError::CameraUnavailable(msg)) = &e {
                        status.publish(GuideStatus::CameraUnavailable(msg.clone()));
                    }
                    summary.reason = StopReason::Fatal(e.to_string());
                    break;
                }
            },
        }
    }

    pipeline.lock().await.shutdown();
    status.publish(GuideStatus::Stopped);
    info!(
        "Frame loop stopped after {} passes ({} skipped, {} retries, {} alerts)",
        summary.passes, summary.skipped, summary.retries, summary.alerts
    );
    debug!("Stop reason: {:?}", summary.reason);
    summary
}
