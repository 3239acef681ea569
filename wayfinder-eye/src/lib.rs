//! wayfinder-eye: Vision side of the Wayfinder guide
//!
//! Turns per-frame inference output into enriched detections:
//! tensor decoding, confidence filtering, non-max suppression,
//! distance/bearing estimation and dominant color naming.
//!
//! Capture, inference and drawing are collaborators behind the
//! [`camera::FrameSource`], [`models::InferenceEngine`] and
//! [`render::Renderer`] traits.

pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod models;
pub mod processing;
pub mod render;
pub mod scene;

pub use config::{DetectionConfig, EngineOutputKind, GeometryConfig, VisionConfig};
pub use error::VisionError;
pub use frame::{Frame, InputTensor};
pub use processing::{BoundingBox, Detection};
pub use scene::{EnrichedDetection, SceneAnalyzer};
