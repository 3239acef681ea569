//! Inference engine collaborator

use crate::error::VisionError;
use crate::frame::InputTensor;
use crate::models::decoder::RawOutputBuffer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Detection already decoded by the engine, in frame pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDetection {
    /// `[x, y, width, height]`, top-left origin
    pub bbox: [f32; 4],
    pub label: String,
    pub score: f32,
}

/// What an engine hands back for one tensor
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Raw(RawOutputBuffer),
    Structured(Vec<StructuredDetection>),
}

impl EngineOutput {
    pub fn kind_name(&self) -> &'static str {
        match self {
            EngineOutput::Raw(_) => "raw",
            EngineOutput::Structured(_) => "structured",
        }
    }
}

/// Neural network inference engine
///
/// Implementations take a normalized `[1, 3, H, W]` tensor. An engine that
/// is not ready or has crashed reports [`VisionError::InferenceUnavailable`].
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn infer(&self, input: InputTensor) -> Result<EngineOutput, VisionError>;

    /// Engine name
    fn name(&self) -> &str;
}
