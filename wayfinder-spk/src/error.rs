//! Error types for wayfinder-spk

use thiserror::Error;

/// Speech and haptic errors
#[derive(Error, Debug)]
pub enum SpeechError {
    /// No usable speech backend; visual output keeps working
    #[error("Speech unavailable: {0}")]
    Unavailable(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Utterance cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
