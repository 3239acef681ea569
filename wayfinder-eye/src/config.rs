//! Configuration for wayfinder-eye

use crate::models::labels::COCO_CLASSES;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Shape of the output produced by the inference engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineOutputKind {
    /// Fixed-layout `[cx, cy, w, h, objectness, scores...]` rows
    Raw,
    /// Already decoded boxes with label and score
    Structured,
}

/// Vision pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Which detection source the engine output feeds
    pub engine_output: EngineOutputKind,
    pub detection: DetectionConfig,
    pub geometry: GeometryConfig,
    pub color: ColorConfig,
}

/// Candidate admission and duplicate suppression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum objectness and objectness × class score, in (0, 1)
    pub confidence_threshold: f32,
    /// Same-class boxes overlapping more than this are suppressed
    pub iou_threshold: f32,
    /// Model input resolution (width, height)
    pub model_input_size: (u32, u32),
    /// Class labels, indexed by class score position
    pub labels: Vec<String>,
    /// Upper bound on detections kept per frame
    pub max_detections: usize,
}

/// Monocular distance estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Camera focal length expressed in pixels
    pub focal_length_pixels: f32,
    /// Assumed width for labels missing from `known_widths`
    pub default_width_meters: f32,
    /// Typical real-world width per label, in meters
    pub known_widths: HashMap<String, f32>,
}

/// Dominant color sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Share of each box dimension sampled around the center, in (0, 1]
    pub interior_fraction: f32,
    /// Samples per axis inside the interior region
    pub sample_grid: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            engine_output: EngineOutputKind::Raw,
            detection: DetectionConfig::default(),
            geometry: GeometryConfig::default(),
            color: ColorConfig::default(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.35,
            iou_threshold: 0.45,
            model_input_size: (416, 416),
            labels: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
            max_detections: 100,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        let known_widths = [
            ("person", 0.5),
            ("bicycle", 0.6),
            ("car", 1.8),
            ("motorcycle", 0.8),
            ("bus", 2.5),
            ("truck", 2.5),
            ("traffic light", 0.3),
            ("fire hydrant", 0.3),
            ("stop sign", 0.75),
            ("bench", 1.5),
            ("dog", 0.3),
            ("cat", 0.2),
            ("backpack", 0.3),
            ("umbrella", 1.0),
            ("suitcase", 0.45),
            ("bottle", 0.08),
            ("cup", 0.08),
            ("chair", 0.5),
            ("couch", 2.0),
            ("potted plant", 0.4),
            ("bed", 1.6),
            ("dining table", 1.2),
            ("toilet", 0.4),
            ("tv", 1.0),
            ("laptop", 0.35),
            ("refrigerator", 0.8),
        ]
        .into_iter()
        .map(|(label, width)| (label.to_string(), width))
        .collect();

        Self {
            focal_length_pixels: 550.0,
            default_width_meters: 0.5,
            known_widths,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            interior_fraction: 0.5,
            sample_grid: 5,
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.detection.validate()?;
        self.geometry.validate()?;
        self.color.validate()?;
        Ok(())
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), String> {
        let t = self.confidence_threshold;
        if !t.is_finite() || t <= 0.0 || t >= 1.0 {
            return Err("Confidence threshold must be between 0 and 1 (exclusive)".to_string());
        }

        let iou = self.iou_threshold;
        if !iou.is_finite() || iou <= 0.0 || iou > 1.0 {
            return Err("IoU threshold must be in (0, 1]".to_string());
        }

        let (w, h) = self.model_input_size;
        if w == 0 || h == 0 {
            return Err("Model input size must be non-zero".to_string());
        }
        if w > 4096 || h > 4096 {
            return Err("Model input size too large (max 4096)".to_string());
        }

        if self.labels.is_empty() {
            return Err("At least one class label is required".to_string());
        }
        if self.labels.iter().any(|l| l.trim().is_empty()) {
            return Err("Class labels cannot be empty".to_string());
        }

        if self.max_detections == 0 {
            return Err("max_detections must be at least 1".to_string());
        }

        Ok(())
    }
}

impl GeometryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.focal_length_pixels.is_finite() || self.focal_length_pixels <= 0.0 {
            return Err("Focal length must be a positive number of pixels".to_string());
        }
        if !self.default_width_meters.is_finite() || self.default_width_meters <= 0.0 {
            return Err("Default object width must be positive".to_string());
        }
        if let Some((label, _)) = self
            .known_widths
            .iter()
            .find(|(_, w)| !w.is_finite() || **w <= 0.0)
        {
            return Err(format!("Known width for '{}' must be positive", label));
        }
        Ok(())
    }
}

impl ColorConfig {
    pub fn validate(&self) -> Result<(), String> {
        let f = self.interior_fraction;
        if !f.is_finite() || f <= 0.0 || f > 1.0 {
            return Err("Color interior fraction must be in (0, 1]".to_string());
        }
        if self.sample_grid == 0 || self.sample_grid > 32 {
            return Err("Color sample grid must be between 1 and 32".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = VisionConfig::default();
        assert_eq!(config.engine_output, EngineOutputKind::Raw);
        assert_eq!(config.detection.model_input_size, (416, 416));
        assert_eq!(config.detection.labels.len(), 80);
        assert_eq!(config.detection.labels[0], "person");
        assert_eq!(config.geometry.known_widths.get("person"), Some(&0.5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_confidence_threshold_bounds() {
        let mut config = DetectionConfig::default();
        config.confidence_threshold = 0.0;
        assert!(config.validate().is_err());
        config.confidence_threshold = 1.0;
        assert!(config.validate().is_err());
        config.confidence_threshold = f32::NAN;
        assert!(config.validate().is_err());
        config.confidence_threshold = 0.01;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_iou_threshold_bounds() {
        let mut config = DetectionConfig::default();
        config.iou_threshold = 0.0;
        assert!(config.validate().is_err());
        config.iou_threshold = 1.0;
        assert!(config.validate().is_ok());
        config.iou_threshold = 1.01;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_input_size() {
        let mut config = DetectionConfig::default();
        config.model_input_size = (0, 416);
        assert!(config.validate().is_err());
        config.model_input_size = (4097, 416);
        assert!(config.validate().is_err());
        config.model_input_size = (640, 640);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_labels_rejected() {
        let mut config = DetectionConfig::default();
        config.labels.clear();
        assert!(config.validate().is_err());
        config.labels = vec!["person".to_string(), " ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_geometry_validation() {
        let mut config = GeometryConfig::default();
        config.focal_length_pixels = -1.0;
        assert!(config.validate().is_err());

        let mut config = GeometryConfig::default();
        config.known_widths.insert("ghost".to_string(), 0.0);
        let err = config.validate().unwrap_err();
        assert!(err.contains("ghost"));
    }

    #[test]
    fn test_color_validation() {
        let mut config = ColorConfig::default();
        config.interior_fraction = 0.0;
        assert!(config.validate().is_err());
        config.interior_fraction = 1.0;
        config.sample_grid = 0;
        assert!(config.validate().is_err());
        config.sample_grid = 33;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: VisionConfig =
            serde_json::from_str(r#"{"detection": {"confidence_threshold": 0.5}}"#).unwrap();
        assert_eq!(config.detection.confidence_threshold, 0.5);
        assert_eq!(config.detection.iou_threshold, 0.45);
        assert_eq!(config.geometry.focal_length_pixels, 550.0);
    }

    #[test]
    fn test_engine_output_kind_serde() {
        let kind: EngineOutputKind = serde_json::from_str("\"structured\"").unwrap();
        assert_eq!(kind, EngineOutputKind::Structured);
    }
}
