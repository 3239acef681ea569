//! Dominant color naming

use crate::config::ColorConfig;
use crate::frame::Frame;
use crate::processing::detection::BoundingBox;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-friendly color names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorName {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Gray,
    Black,
    White,
}

impl ColorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorName::Red => "red",
            ColorName::Orange => "orange",
            ColorName::Yellow => "yellow",
            ColorName::Green => "green",
            ColorName::Blue => "blue",
            ColorName::Purple => "purple",
            ColorName::Pink => "pink",
            ColorName::Gray => "gray",
            ColorName::Black => "black",
            ColorName::White => "white",
        }
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hue bands in degrees, `[start, end)`; together they cover [0, 360).
const HUE_BANDS: &[(f32, f32, ColorName)] = &[
    (0.0, 15.0, ColorName::Red),
    (15.0, 45.0, ColorName::Orange),
    (45.0, 70.0, ColorName::Yellow),
    (70.0, 170.0, ColorName::Green),
    (170.0, 260.0, ColorName::Blue),
    (260.0, 290.0, ColorName::Purple),
    (290.0, 345.0, ColorName::Pink),
    (345.0, 360.0, ColorName::Red),
];

const DARK_VALUE: f32 = 0.2;
const GRAY_SATURATION: f32 = 0.15;
const WHITE_VALUE: f32 = 0.85;

/// RGB in [0, 1] to (hue degrees in [0, 360), saturation, value)
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max <= 0.0 { 0.0 } else { delta / max };
    (normalize_hue(hue), saturation, max)
}

fn normalize_hue(hue: f32) -> f32 {
    if !hue.is_finite() {
        return 0.0;
    }
    let h = hue.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negatives
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

/// Name an HSV triple
pub fn name_hsv(hue: f32, saturation: f32, value: f32) -> ColorName {
    if value < DARK_VALUE {
        return ColorName::Black;
    }
    if saturation < GRAY_SATURATION {
        return if value > WHITE_VALUE {
            ColorName::White
        } else {
            ColorName::Gray
        };
    }

    let hue = normalize_hue(hue);
    HUE_BANDS
        .iter()
        .find(|(start, end, _)| hue >= *start && hue < *end)
        .map(|(_, _, name)| *name)
        .unwrap_or(ColorName::Red)
}

/// Samples the interior of a box and names its average color
#[derive(Debug, Clone)]
pub struct ColorClassifier {
    interior_fraction: f32,
    sample_grid: u32,
}

impl ColorClassifier {
    pub fn new(config: &ColorConfig) -> Self {
        Self {
            interior_fraction: config.interior_fraction.clamp(0.01, 1.0),
            sample_grid: config.sample_grid.clamp(1, 32),
        }
    }

    pub fn classify(&self, frame: &Frame, bbox: &BoundingBox) -> ColorName {
        let [r, g, b] = self.sample_rgb(frame, bbox);
        let (h, s, v) = rgb_to_hsv(r, g, b);
        name_hsv(h, s, v)
    }

    /// Average RGB in [0, 1] over a grid inside the central part of the box.
    pub fn sample_rgb(&self, frame: &Frame, bbox: &BoundingBox) -> [f32; 3] {
        let max_x = frame.width().saturating_sub(1) as f32;
        let max_y = frame.height().saturating_sub(1) as f32;

        let half_w = bbox.width.max(0.0) * self.interior_fraction / 2.0;
        let half_h = bbox.height.max(0.0) * self.interior_fraction / 2.0;
        let (cx, cy) = (bbox.center_x(), bbox.center_y());

        let x0 = (cx - half_w).clamp(0.0, max_x);
        let x1 = (cx + half_w).clamp(0.0, max_x);
        let y0 = (cy - half_h).clamp(0.0, max_y);
        let y1 = (cy + half_h).clamp(0.0, max_y);

        let n = self.sample_grid;
        let mut sum = [0.0f32; 3];
        for j in 0..n {
            let y = y0 + (j as f32 + 0.5) * (y1 - y0) / n as f32;
            for i in 0..n {
                let x = x0 + (i as f32 + 0.5) * (x1 - x0) / n as f32;
                let px = frame.pixel(to_coord(x), to_coord(y));
                for c in 0..3 {
                    sum[c] += px[c] as f32 / 255.0;
                }
            }
        }

        let count = (n * n) as f32;
        [sum[0] / count, sum[1] / count, sum[2] / count]
    }
}

fn to_coord(v: f32) -> u32 {
    if v.is_finite() && v > 0.0 {
        v as u32
    } else {
        0
    }
}
