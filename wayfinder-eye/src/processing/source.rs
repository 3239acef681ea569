//! Detection sources
//!
//! Engines come in two flavors: ones that hand back the raw output tensor
//! and ones that decode it themselves. Each gets a [`DetectionSource`] so the
//! rest of the pipeline only ever sees filtered, frame-space detections.

use crate::config::{DetectionConfig, EngineOutputKind};
use crate::error::VisionError;
use crate::frame::Frame;
use crate::models::decoder::TensorDecoder;
use crate::models::engine::{EngineOutput, InferenceEngine, StructuredDetection};
use crate::models::labels::index_of;
use crate::processing::detection::{BoundingBox, Detection, DetectionFilter};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Produces the filtered detections for one frame
#[async_trait]
pub trait DetectionSource: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError>;

    fn name(&self) -> &str;
}

/// Source for engines that return raw output rows
pub struct RawTensorSource {
    engine: Arc<dyn InferenceEngine>,
    decoder: TensorDecoder,
    filter: DetectionFilter,
    input_size: (u32, u32),
}

impl RawTensorSource {
    pub fn new(engine: Arc<dyn InferenceEngine>, config: &DetectionConfig) -> Result<Self, VisionError> {
        Ok(Self {
            engine,
            decoder: TensorDecoder::new(config.labels.len())?,
            filter: DetectionFilter::new(config),
            input_size: config.model_input_size,
        })
    }
}

#[async_trait]
impl DetectionSource for RawTensorSource {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        let input = frame.to_chw_tensor(self.input_size.0, self.input_size.1)?;
        let buffer = match self.engine.infer(input).await? {
            EngineOutput::Raw(buffer) => buffer,
            other => {
                return Err(VisionError::UnexpectedOutput(format!(
                    "{} output from engine '{}', expected raw",
                    other.kind_name(),
                    self.engine.name()
                )))
            }
        };

        let candidates = self.decoder.decode(&buffer)?;
        debug!("Decoded {} candidate rows", candidates.len());
        Ok(self.filter.filter(candidates, frame.width(), frame.height()))
    }

    fn name(&self) -> &str {
        "raw-tensor"
    }
}

/// Source for engines that return decoded detections in frame pixels
pub struct StructuredSource {
    engine: Arc<dyn InferenceEngine>,
    filter: DetectionFilter,
    input_size: (u32, u32),
}

impl StructuredSource {
    pub fn new(engine: Arc<dyn InferenceEngine>, config: &DetectionConfig) -> Self {
        Self {
            engine,
            filter: DetectionFilter::new(config),
            input_size: config.model_input_size,
        }
    }

    fn promote(&self, structured: StructuredDetection) -> Detection {
        let [x, y, width, height] = structured.bbox;
        let labels = self.filter.labels();
        Detection {
            class_id: index_of(labels, &structured.label).unwrap_or(labels.len()),
            label: structured.label,
            objectness: structured.score,
            class_score: 1.0,
            bbox: BoundingBox::new(x, y, width, height),
        }
    }
}

#[async_trait]
impl DetectionSource for StructuredSource {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        let input = frame.to_chw_tensor(self.input_size.0, self.input_size.1)?;
        let list = match self.engine.infer(input).await? {
            EngineOutput::Structured(list) => list,
            other => {
                return Err(VisionError::UnexpectedOutput(format!(
                    "{} output from engine '{}', expected structured",
                    other.kind_name(),
                    self.engine.name()
                )))
            }
        };

        debug!("Engine returned {} structured detections", list.len());
        let detections = list.into_iter().map(|s| self.promote(s)).collect();
        Ok(self.filter.refine(detections))
    }

    fn name(&self) -> &str {
        "structured"
    }
}

/// Pick the detection source matching the engine's output shape
pub fn build_source(
    kind: EngineOutputKind,
    engine: Arc<dyn InferenceEngine>,
    config: &DetectionConfig,
) -> Result<Arc<dyn DetectionSource>, VisionError> {
    Ok(match kind {
        EngineOutputKind::Raw => Arc::new(RawTensorSource::new(engine, config)?),
        EngineOutputKind::Structured => Arc::new(StructuredSource::new(engine, config)),
    })
}
