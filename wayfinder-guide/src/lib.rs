//! wayfinder-guide: runs the Wayfinder pipeline
//!
//! Wires a frame source, an inference engine, the scene analyzer, the
//! overlay renderer and the alert arbiter into one paced frame loop.

pub mod config;
pub mod controller;
pub mod error;
pub mod status;

pub use config::{Cadence, GuideConfig, RetryConfig, SchedulingConfig};
pub use controller::{
    haptics_for, speech_engine_for, Backoff, Collaborators, FrameLoop, LoopHandle, LoopSummary, PassOutcome,
    Pipeline, StopReason, Stopper,
};
pub use error::{Disposition, GuideError};
pub use status::{GuideStatus, StatusChannel, StatusUpdate};
