//! Error types for wayfinder-guide

use thiserror::Error;
use wayfinder_eye::VisionError;
use wayfinder_spk::SpeechError;

/// Guide errors
#[derive(Error, Debug)]
pub enum GuideError {
    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A pass is already in flight")]
    PassInFlight,

    #[error("Loop task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the frame loop does with a failed pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log it and carry on with the next frame
    SkipFrame,
    /// Pause with backoff, then try again
    Retry,
    /// End the session
    Fatal,
    /// The camera has no more frames
    EndOfStream,
}

impl GuideError {
    pub fn disposition(&self) -> Disposition {
        match self {
            GuideError::Vision(e) if e.is_frame_local() => Disposition::SkipFrame,
            GuideError::Vision(VisionError::StreamEnded) => Disposition::EndOfStream,
            GuideError::Vision(VisionError::InferenceUnavailable(_)) => Disposition::Retry,
            GuideError::Vision(_) => Disposition::Fatal,
            GuideError::Speech(_) => Disposition::SkipFrame,
            GuideError::PassInFlight => Disposition::SkipFrame,
            GuideError::Config(_) | GuideError::Task(_) | GuideError::Io(_) => Disposition::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispositions() {
        let malformed = GuideError::from(VisionError::MalformedOutput { len: 10, row_width: 85 });
        assert_eq!(malformed.disposition(), Disposition::SkipFrame);

        let offline = GuideError::from(VisionError::InferenceUnavailable("model loading".into()));
        assert_eq!(offline.disposition(), Disposition::Retry);

        let camera = GuideError::from(VisionError::CameraUnavailable("permission denied".into()));
        assert_eq!(camera.disposition(), Disposition::Fatal);

        assert_eq!(GuideError::from(VisionError::StreamEnded).disposition(), Disposition::EndOfStream);
        assert_eq!(
            GuideError::from(VisionError::Config("bad size".into())).disposition(),
            Disposition::Fatal
        );
        assert_eq!(
            GuideError::from(SpeechError::Unavailable("no espeak".into())).disposition(),
            Disposition::SkipFrame
        );
    }

    #[test]
    fn test_frame_local_vision_errors_skip_the_frame() {
        let frame_local = [
            VisionError::MalformedOutput { len: 86, row_width: 85 },
            VisionError::UnexpectedOutput("raw tensor".into()),
            VisionError::Processing("empty crop".into()),
            VisionError::from(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read")),
        ];
        for err in frame_local {
            assert!(err.is_frame_local());
            assert_eq!(GuideError::from(err).disposition(), Disposition::SkipFrame);
        }
    }
}
