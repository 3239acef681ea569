//! Error types for wayfinder-eye

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    /// Output buffer length is not a whole number of rows.
    #[error("Malformed output: buffer of {len} values is not a multiple of row width {row_width}")]
    MalformedOutput { len: usize, row_width: usize },

    /// Engine returned a shape the configured detection source cannot consume.
    #[error("Unexpected engine output: {0}")]
    UnexpectedOutput(String),

    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The frame source has no more frames to give.
    #[error("Frame stream ended")]
    StreamEnded,

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VisionError {
    /// True when the error only spoils the current frame and the loop
    /// should move on to the next one.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            VisionError::MalformedOutput { .. }
                | VisionError::UnexpectedOutput(_)
                | VisionError::Processing(_)
                | VisionError::Json(_)
                | VisionError::Image(_)
                | VisionError::Io(_)
        )
    }
}
