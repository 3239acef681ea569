//! Replays recorded engine outputs
//!
//! A recording directory holds one file per inference pass, played back in
//! file-name order: `.bin` files are raw little-endian `f32` buffers and
//! `.json` files are lists of [`StructuredDetection`].

use crate::error::VisionError;
use crate::frame::InputTensor;
use crate::models::decoder::RawOutputBuffer;
use crate::models::engine::{EngineOutput, InferenceEngine, StructuredDetection};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inference engine backed by a directory of recorded outputs
pub struct ReplayEngine {
    recordings: Vec<PathBuf>,
    cursor: Mutex<usize>,
}

impl ReplayEngine {
    pub fn open(dir: &Path) -> Result<Self, VisionError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            VisionError::InferenceUnavailable(format!("Cannot open recordings {:?}: {}", dir, e))
        })?;

        let mut recordings: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| matches!(path.extension().and_then(|e| e.to_str()), Some("bin" | "json")))
            .collect();
        recordings.sort();

        if recordings.is_empty() {
            return Err(VisionError::InferenceUnavailable(format!(
                "No recorded outputs in {:?}",
                dir
            )));
        }

        info!("Replay engine loaded {} recordings from {:?}", recordings.len(), dir);
        Ok(Self {
            recordings,
            cursor: Mutex::new(0),
        })
    }

    fn next_path(&self) -> PathBuf {
        let mut cursor = self.cursor.lock();
        let path = self.recordings[*cursor % self.recordings.len()].clone();
        *cursor = (*cursor + 1) % self.recordings.len();
        path
    }
}

#[async_trait]
impl InferenceEngine for ReplayEngine {
    async fn infer(&self, input: InputTensor) -> Result<EngineOutput, VisionError> {
        let path = self.next_path();
        debug!("Replaying {:?} for input {:?}", path, input.shape);

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            VisionError::InferenceUnavailable(format!("Cannot read recording {:?}: {}", path, e))
        })?;

        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            let detections: Vec<StructuredDetection> = serde_json::from_slice(&bytes)?;
            Ok(EngineOutput::Structured(detections))
        } else {
            Ok(EngineOutput::Raw(RawOutputBuffer::from_le_bytes(&bytes)?))
        }
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor() -> InputTensor {
        InputTensor {
            shape: [1, 3, 1, 1],
            data: vec![0.0; 3],
        }
    }

    #[test]
    fn test_open_empty_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReplayEngine::open(dir.path()).err().unwrap();
        assert!(matches!(err, VisionError::InferenceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_replays_in_order_and_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let raw: Vec<u8> = [1.0f32, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(dir.path().join("000.bin"), raw).unwrap();
        std::fs::write(
            dir.path().join("001.json"),
            r#"[{"bbox": [1, 2, 3, 4], "label": "cup", "score": 0.9}]"#,
        )
        .unwrap();

        let engine = ReplayEngine::open(dir.path()).unwrap();

        match engine.infer(tensor()).await.unwrap() {
            EngineOutput::Raw(buffer) => assert_eq!(buffer.as_slice(), &[1.0, 2.0]),
            other => panic!("Expected raw output, got {:?}", other),
        }
        match engine.infer(tensor()).await.unwrap() {
            EngineOutput::Structured(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].label, "cup");
                assert_eq!(list[0].bbox, [1.0, 2.0, 3.0, 4.0]);
            }
            other => panic!("Expected structured output, got {:?}", other),
        }
        assert_eq!(engine.infer(tensor()).await.unwrap().kind_name(), "raw");
    }

    #[tokio::test]
    async fn test_truncated_recording_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("000.bin"), [0u8; 6]).unwrap();
        let engine = ReplayEngine::open(dir.path()).unwrap();
        let err = engine.infer(tensor()).await.unwrap_err();
        assert!(err.is_frame_local());
    }
}
