//! Vision processing pipelines

pub mod color;
pub mod detection;
pub mod geometry;
pub mod source;

pub use color::{ColorClassifier, ColorName};
pub use detection::{non_max_suppression, BoundingBox, Detection, DetectionFilter};
pub use geometry::{Direction, GeometricEstimator, UNKNOWN_DISTANCE};
pub use source::{build_source, DetectionSource, RawTensorSource, StructuredSource};
