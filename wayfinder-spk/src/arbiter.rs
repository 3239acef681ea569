//! Alert arbitration
//!
//! Decides, once per frame, whether anything is worth saying. Collision
//! warnings outrank scene descriptions, and a cooldown keeps the guide from
//! talking over itself. Speech runs elsewhere; its completion comes back
//! through [`AlertArbiter::handle_event`].
//!
//! Eligibility:
//! - while speaking, only a strictly more urgent alert is accepted, or a
//!   very-close warning about a different object than the very-close warning
//!   in flight. Accepting while speaking preempts the current utterance.
//! - after a speech failure nothing is accepted until the failure guard
//!   has passed.
//! - idle within the cooldown after an alert, only a strictly more urgent
//!   alert is accepted.
//! - otherwise anything is accepted.

use crate::config::AlertConfig;
use crate::engines::VibrationPattern;
use crate::phrasing;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use wayfinder_eye::processing::Direction;
use wayfinder_eye::scene::{visible_labels, EnrichedDetection, LabelCount};

/// Pulse train for imminent collisions, in milliseconds
pub const VERY_CLOSE_PULSES: [u32; 5] = [200, 100, 200, 100, 200];
pub const CLOSE_PULSE_MILLIS: u32 = 200;

/// Alert tiers, least urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Scene description
    Ambient,
    Close,
    VeryClose,
}

/// What an alert is about
#[derive(Debug, Clone, PartialEq)]
pub enum AlertKind {
    Collision {
        label: String,
        distance_meters: f32,
        direction: Direction,
    },
    SceneSummary {
        labels: Vec<LabelCount>,
    },
}

/// A proposed alert, before arbitration
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub urgency: Urgency,
    pub kind: AlertKind,
    pub utterance: String,
}

impl AlertCandidate {
    /// Collision warning for the nearest detection inside the collision range
    pub fn collision(detection: &EnrichedDetection, config: &AlertConfig) -> Option<Self> {
        let distance = detection.distance_meters;
        if !distance.is_finite() || distance >= config.collision_distance_meters {
            return None;
        }

        let urgency = if distance < config.very_close_distance_meters {
            Urgency::VeryClose
        } else {
            Urgency::Close
        };
        let direction = detection.direction();
        Some(Self {
            urgency,
            utterance: phrasing::collision_phrase(urgency, detection.color, detection.label(), distance, direction),
            kind: AlertKind::Collision {
                label: detection.label().to_string(),
                distance_meters: distance,
                direction,
            },
        })
    }

    pub fn scene_summary(labels: Vec<LabelCount>) -> Self {
        Self {
            urgency: Urgency::Ambient,
            utterance: phrasing::scene_summary(&labels),
            kind: AlertKind::SceneSummary { labels },
        }
    }

    /// The object a collision warning is about
    pub fn subject(&self) -> Option<&str> {
        match &self.kind {
            AlertKind::Collision { label, .. } => Some(label),
            AlertKind::SceneSummary { .. } => None,
        }
    }
}

/// An accepted alert, ready to be spoken
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Utterance id echoed back in [`SpeechEvent`]s
    pub id: u64,
    pub urgency: Urgency,
    pub kind: AlertKind,
    pub utterance: String,
    pub vibration: Option<VibrationPattern>,
    /// Id of the in-flight utterance this alert replaces
    pub preempts: Option<u64>,
}

/// Speech completion reported back to the arbiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Finished { id: u64 },
    Failed { id: u64, error: String },
}

impl SpeechEvent {
    pub fn id(&self) -> u64 {
        match self {
            SpeechEvent::Finished { id } | SpeechEvent::Failed { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterPhase {
    Idle,
    Speaking,
}

/// The utterance currently being spoken
#[derive(Debug, Clone, PartialEq)]
pub struct InFlight {
    pub id: u64,
    pub urgency: Urgency,
    pub subject: Option<String>,
    pub started_at: Instant,
    /// Set after a failure; the arbiter goes idle once it passes
    pub release_at: Option<Instant>,
}

/// Session alert state, owned by the arbiter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    pub is_speaking: bool,
    pub last_alert_at: Option<Instant>,
    pub last_scene_summary_at: Option<Instant>,
    pub last_urgency: Option<Urgency>,
    pub last_subject: Option<String>,
    pub in_flight: Option<InFlight>,
}

impl AlertState {
    pub fn phase(&self) -> ArbiterPhase {
        if self.is_speaking {
            ArbiterPhase::Speaking
        } else {
            ArbiterPhase::Idle
        }
    }

    fn go_idle(&mut self) {
        self.is_speaking = false;
        self.in_flight = None;
    }
}

/// Picks at most one alert per frame
#[derive(Debug)]
pub struct AlertArbiter {
    config: AlertConfig,
    state: AlertState,
    next_id: u64,
}

impl AlertArbiter {
    pub fn new(config: AlertConfig) -> Self {
        Self::with_state(config, AlertState::default())
    }

    /// Resume from an existing state
    pub fn with_state(config: AlertConfig, state: AlertState) -> Self {
        let next_id = state.in_flight.as_ref().map(|f| f.id + 1).unwrap_or(1);
        Self {
            config,
            state,
            next_id,
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn phase(&self) -> ArbiterPhase {
        self.state.phase()
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Apply a completion event. Events for anything but the in-flight
    /// utterance are stale and ignored.
    pub fn handle_event(&mut self, event: SpeechEvent, now: Instant) {
        let current = match self.state.in_flight.as_mut() {
            Some(flight) if flight.id == event.id() => flight,
            _ => {
                debug!("Ignoring stale speech event for utterance {}", event.id());
                return;
            }
        };

        match event {
            SpeechEvent::Finished { id } => {
                debug!("Utterance {} finished", id);
                self.state.go_idle();
            }
            SpeechEvent::Failed { id, error } => {
                warn!("Utterance {} failed: {}", id, error);
                current.release_at = Some(now + self.config.failure_guard());
            }
        }
    }

    /// Time-driven transitions: the failure guard and the utterance watchdog.
    /// Returns the id of an utterance abandoned by the watchdog, which the
    /// caller should cancel.
    pub fn tick(&mut self, now: Instant) -> Option<u64> {
        let flight = self.state.in_flight.as_ref()?;

        if let Some(release_at) = flight.release_at {
            if now >= release_at {
                debug!("Failure guard for utterance {} elapsed", flight.id);
                self.state.go_idle();
            }
            return None;
        }

        if now.duration_since(flight.started_at) >= self.config.max_utterance() {
            let id = flight.id;
            warn!("Utterance {} never completed; abandoning it", id);
            self.state.go_idle();
            return Some(id);
        }

        None
    }

    /// The alert this frame would raise, before eligibility
    pub fn candidate(&self, detections: &[EnrichedDetection], now: Instant) -> Option<AlertCandidate> {
        let nearest = detections
            .iter()
            .filter(|d| d.distance_meters.is_finite())
            .min_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

        if let Some(candidate) = nearest.and_then(|d| AlertCandidate::collision(d, &self.config)) {
            return Some(candidate);
        }

        if detections.is_empty() || !self.summary_due(now) {
            return None;
        }
        Some(AlertCandidate::scene_summary(visible_labels(detections)))
    }

    fn summary_due(&self, now: Instant) -> bool {
        match self.state.last_scene_summary_at {
            Some(last) => now.duration_since(last) >= self.config.scene_summary_interval(),
            None => true,
        }
    }

    /// Whether `candidate` may be spoken at `now`
    pub fn is_eligible(&self, candidate: &AlertCandidate, now: Instant) -> bool {
        if let Some(flight) = &self.state.in_flight {
            // A failed utterance holds everything off until its guard passes
            if flight.release_at.is_some() {
                return false;
            }
            return outranks(candidate, flight.urgency, flight.subject.as_deref());
        }

        match (self.state.last_alert_at, self.state.last_urgency) {
            (Some(last_at), Some(last_urgency)) if now.duration_since(last_at) < self.config.cooldown() => {
                candidate.urgency > last_urgency
            }
            _ => true,
        }
    }

    /// Full per-frame decision
    pub fn evaluate(&mut self, detections: &[EnrichedDetection], now: Instant) -> Option<Alert> {
        let candidate = self.candidate(detections, now)?;
        self.offer(candidate, now)
    }

    /// Arbitrate one candidate; on acceptance the state moves to speaking.
    pub fn offer(&mut self, candidate: AlertCandidate, now: Instant) -> Option<Alert> {
        if !self.is_eligible(&candidate, now) {
            debug!("Suppressed {:?} alert: {}", candidate.urgency, candidate.utterance);
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        let preempts = self.state.in_flight.as_ref().map(|f| f.id);
        let subject = candidate.subject().map(str::to_string);
        let vibration = match candidate.urgency {
            Urgency::VeryClose => Some(VibrationPattern::Pulses(VERY_CLOSE_PULSES.to_vec())),
            Urgency::Close => Some(VibrationPattern::Single(CLOSE_PULSE_MILLIS)),
            Urgency::Ambient => None,
        };

        if let AlertKind::SceneSummary { .. } = candidate.kind {
            self.state.last_scene_summary_at = Some(now);
        }
        self.state.is_speaking = true;
        self.state.last_alert_at = Some(now);
        self.state.last_urgency = Some(candidate.urgency);
        self.state.last_subject = subject.clone();
        self.state.in_flight = Some(InFlight {
            id,
            urgency: candidate.urgency,
            subject,
            started_at: now,
            release_at: None,
        });

        match preempts {
            Some(old) => info!("Alert {} ({:?}) preempts {}: {}", id, candidate.urgency, old, candidate.utterance),
            None => info!("Alert {} ({:?}): {}", id, candidate.urgency, candidate.utterance),
        }

        Some(Alert {
            id,
            urgency: candidate.urgency,
            kind: candidate.kind,
            utterance: candidate.utterance,
            vibration,
            preempts,
        })
    }
}

fn outranks(candidate: &AlertCandidate, urgency: Urgency, subject: Option<&str>) -> bool {
    if candidate.urgency > urgency {
        return true;
    }
    candidate.urgency == Urgency::VeryClose && urgency == Urgency::VeryClose && candidate.subject() != subject
}
