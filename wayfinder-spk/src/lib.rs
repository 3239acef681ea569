//! wayfinder-spk: Spoken guidance for the Wayfinder guide
//!
//! Provides:
//! - Alert arbitration (collision warnings, scene descriptions, cooldown)
//! - Natural phrasing of alerts
//! - Fire-and-forget playback with completion events
//! - Native (espeak-ng / say) and silent speech engines, haptic output

pub mod arbiter;
pub mod config;
pub mod emitter;
pub mod engines;
pub mod error;
pub mod phrasing;

pub use arbiter::{Alert, AlertArbiter, AlertCandidate, AlertKind, AlertState, ArbiterPhase, SpeechEvent, Urgency};
pub use config::{AlertConfig, SpeechConfig, TtsEngine, VoiceConfig};
pub use emitter::AlertEmitter;
pub use engines::{HapticEngine, SpeechEngine, VibrationPattern};
pub use error::SpeechError;
