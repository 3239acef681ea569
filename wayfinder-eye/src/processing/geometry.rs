//! Distance and bearing estimation
//!
//! Distance comes from the pinhole relation between an object's assumed
//! real width and its width on screen. It is a single-measurement monocular
//! estimate: rotated or partially occluded objects appear narrower or wider
//! than their nominal width and are misjudged accordingly.

use crate::config::GeometryConfig;
use crate::processing::detection::Detection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distance reported when the box width gives nothing to measure
pub const UNKNOWN_DISTANCE: f32 = f32::INFINITY;

/// Coarse spoken direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Ahead,
    Right,
}

impl Direction {
    /// Bucket a bearing into thirds of the frame.
    pub fn from_bearing(bearing: f32) -> Self {
        if bearing < -1.0 / 3.0 {
            Direction::Left
        } else if bearing > 1.0 / 3.0 {
            Direction::Right
        } else {
            Direction::Ahead
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            Direction::Left => "on your left",
            Direction::Ahead => "straight ahead",
            Direction::Right => "on your right",
        }
    }
}

/// Pinhole-camera distance estimator
#[derive(Debug, Clone)]
pub struct GeometricEstimator {
    focal_length_pixels: f32,
    default_width_meters: f32,
    known_widths: HashMap<String, f32>,
}

impl GeometricEstimator {
    pub fn new(config: &GeometryConfig) -> Self {
        Self {
            focal_length_pixels: config.focal_length_pixels,
            default_width_meters: config.default_width_meters,
            known_widths: config.known_widths.clone(),
        }
    }

    /// Assumed real-world width for `label`
    pub fn real_width(&self, label: &str) -> f32 {
        self.known_widths
            .get(label)
            .copied()
            .unwrap_or(self.default_width_meters)
    }

    /// `real_width × focal_length / pixel_width`, or [`UNKNOWN_DISTANCE`]
    /// when the pixel width is not a positive number.
    pub fn distance_meters(&self, label: &str, pixel_width: f32) -> f32 {
        if !pixel_width.is_finite() || pixel_width <= 0.0 {
            return UNKNOWN_DISTANCE;
        }
        self.real_width(label) * self.focal_length_pixels / pixel_width
    }

    /// Horizontal position in [-1, 1]; 0 is the frame center.
    pub fn bearing(center_x: f32, frame_width: u32) -> f32 {
        if frame_width == 0 || !center_x.is_finite() {
            return 0.0;
        }
        ((center_x / frame_width as f32) * 2.0 - 1.0).clamp(-1.0, 1.0)
    }

    /// Distance and bearing for a detection
    pub fn estimate(&self, detection: &Detection, frame_width: u32) -> (f32, f32) {
        (
            self.distance_meters(&detection.label, detection.pixel_width()),
            Self::bearing(detection.bbox.center_x(), frame_width),
        )
    }
}
