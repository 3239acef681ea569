//! Inference engine boundary and raw output decoding

pub mod decoder;
pub mod engine;
pub mod labels;
pub mod replay;

pub use decoder::{Candidate, Candidates, RawOutputBuffer, TensorDecoder};
pub use engine::{EngineOutput, InferenceEngine, StructuredDetection};
pub use labels::COCO_CLASSES;
pub use replay::ReplayEngine;
