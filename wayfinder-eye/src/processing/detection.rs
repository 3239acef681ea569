//! Candidate admission, rescaling and non-max suppression

use crate::config::DetectionConfig;
use crate::models::decoder::Candidate;
use crate::models::labels::label_for;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Axis-aligned box, top-left origin, frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build from center + size
    pub fn from_center(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self {
            x: center_x - width / 2.0,
            y: center_y - height / 2.0,
            width,
            height,
        }
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Finite coordinates and a positive size
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Intersection over union; 0.0 for disjoint or degenerate boxes.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        if !self.is_valid() || !other.is_valid() {
            return 0.0;
        }

        let inter_x_min = self.x.max(other.x);
        let inter_y_min = self.y.max(other.y);
        let inter_x_max = (self.x + self.width).min(other.x + other.width);
        let inter_y_max = (self.y + self.height).min(other.y + other.height);

        if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
            return 0.0;
        }

        let inter_area = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
        let union_area = self.area() + other.area() - inter_area;
        if union_area <= 0.0 || !union_area.is_finite() {
            return 0.0;
        }

        (inter_area / union_area).clamp(0.0, 1.0)
    }
}

/// A kept detection in frame pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub label: String,
    pub objectness: f32,
    pub class_score: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Combined confidence, always `objectness × class_score`
    pub fn score(&self) -> f32 {
        self.objectness * self.class_score
    }

    pub fn pixel_width(&self) -> f32 {
        self.bbox.width
    }
}

/// Confidence filter, rescaler and per-class NMS
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    confidence_threshold: f32,
    iou_threshold: f32,
    model_input_size: (u32, u32),
    max_detections: usize,
    labels: Arc<[String]>,
}

impl DetectionFilter {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
            model_input_size: config.model_input_size,
            max_detections: config.max_detections.max(1),
            labels: config.labels.clone().into(),
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Admission test: objectness first, then the combined score.
    pub fn admits(&self, objectness: f32, class_score: f32) -> bool {
        objectness.is_finite()
            && class_score.is_finite()
            && objectness >= self.confidence_threshold
            && objectness * class_score >= self.confidence_threshold
    }

    /// Admit, rescale into a `frame_width × frame_height` frame and suppress
    /// duplicates. Output is ordered by score, highest first.
    pub fn filter<I>(&self, candidates: I, frame_width: u32, frame_height: u32) -> Vec<Detection>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let scale_x = frame_width as f32 / self.model_input_size.0 as f32;
        let scale_y = frame_height as f32 / self.model_input_size.1 as f32;

        let admitted: Vec<Detection> = candidates
            .into_iter()
            .filter(|c| self.admits(c.objectness, c.class_score))
            .filter_map(|c| self.promote(&c, scale_x, scale_y))
            .collect();

        debug!("{} candidates admitted before suppression", admitted.len());
        self.suppress(admitted)
    }

    /// Threshold + NMS for detections that are already in frame space.
    /// Running it on its own output returns that output unchanged.
    pub fn refine(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let admitted = detections
            .into_iter()
            .filter(|d| d.bbox.is_valid() && self.admits(d.objectness, d.class_score))
            .collect();
        self.suppress(admitted)
    }

    fn suppress(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let mut kept = non_max_suppression(detections, self.iou_threshold);
        kept.truncate(self.max_detections);
        kept
    }

    fn promote(&self, candidate: &Candidate, scale_x: f32, scale_y: f32) -> Option<Detection> {
        let bbox = BoundingBox::from_center(
            candidate.center_x * scale_x,
            candidate.center_y * scale_y,
            candidate.width * scale_x,
            candidate.height * scale_y,
        );
        if !bbox.is_valid() {
            return None;
        }

        Some(Detection {
            class_id: candidate.class_index,
            label: label_for(&self.labels, candidate.class_index),
            objectness: candidate.objectness,
            class_score: candidate.class_score,
            bbox,
        })
    }
}

/// Greedy per-class non-max suppression.
///
/// Detections are visited in descending score order; one is dropped when it
/// overlaps an already kept detection with the same label by more than
/// `iou_threshold`.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.retain(|d| d.score().is_finite());
    detections.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        let overlaps = kept.iter().any(|k| {
            k.label == detection.label && k.bbox.iou(&detection.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(detection);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(cx: f32, cy: f32, w: f32, h: f32, obj: f32, class_index: usize, score: f32) -> Candidate {
        Candidate {
            center_x: cx,
            center_y: cy,
            width: w,
            height: h,
            objectness: obj,
            class_index,
            class_score: score,
        }
    }

    fn detection(label: &str, bbox: BoundingBox, score: f32) -> Detection {
        Detection {
            class_id: 0,
            label: label.to_string(),
            objectness: score,
            class_score: 1.0,
            bbox,
        }
    }

    fn filter_with(threshold: f32, iou: f32, input: (u32, u32)) -> DetectionFilter {
        DetectionFilter::new(&DetectionConfig {
            confidence_threshold: threshold,
            iou_threshold: iou,
            model_input_size: input,
            ..DetectionConfig::default()
        })
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_degenerate_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 0.0, 10.0);
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let nan = BoundingBox::new(f32::NAN, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(nan.iou(&b), 0.0);
    }

    #[test]
    fn test_admission_requires_both_checks() {
        let filter = filter_with(0.3, 0.45, (416, 416));
        assert!(filter.admits(0.9, 0.8));
        // objectness alone is not enough
        assert!(!filter.admits(0.9, 0.2));
        // neither is the product with low objectness
        assert!(!filter.admits(0.2, 1.0));
        // boundaries are inclusive
        assert!(filter.admits(0.3, 1.0));
        assert!(!filter.admits(f32::NAN, 1.0));
    }

    #[test]
    fn test_rescale_uses_independent_axes() {
        let filter = filter_with(0.3, 0.45, (416, 416));
        let detections = filter.filter(vec![candidate(208.0, 104.0, 52.0, 26.0, 0.9, 0, 0.9)], 832, 208);
        assert_eq!(detections.len(), 1);
        let bbox = detections[0].bbox;
        // x scale 2.0, y scale 0.5
        assert!((bbox.width - 104.0).abs() < 1e-4);
        assert!((bbox.height - 13.0).abs() < 1e-4);
        assert!((bbox.x - (416.0 - 52.0)).abs() < 1e-4);
        assert!((bbox.y - (52.0 - 6.5)).abs() < 1e-4);
    }

    #[test]
    fn test_labels_and_score() {
        let filter = filter_with(0.3, 0.45, (416, 416));
        let detections = filter.filter(vec![candidate(100.0, 100.0, 50.0, 50.0, 0.9, 2, 0.8)], 416, 416);
        assert_eq!(detections[0].label, "car");
        assert_eq!(detections[0].class_id, 2);
        assert!((detections[0].score() - 0.72).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_highest_in_overlapping_group() {
        let a = detection("person", BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.6);
        let b = detection("person", BoundingBox::new(2.0, 2.0, 100.0, 100.0), 0.8);
        let kept = non_max_suppression(vec![a, b], 0.45);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].score() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_nms_is_per_class() {
        let a = detection("person", BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.8);
        let b = detection("dog", BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.7);
        let kept = non_max_suppression(vec![a, b], 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_threshold_is_exclusive() {
        // IoU exactly 1/3
        let a = detection("cup", BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.9);
        let b = detection("cup", BoundingBox::new(5.0, 0.0, 10.0, 10.0), 0.8);
        let iou = a.bbox.iou(&b.bbox);
        assert_eq!(non_max_suppression(vec![a.clone(), b.clone()], iou).len(), 2);
        assert_eq!(non_max_suppression(vec![a, b], iou - 0.01).len(), 1);
    }

    #[test]
    fn test_output_ordered_by_score() {
        let filter = filter_with(0.3, 0.45, (416, 416));
        let detections = filter.filter(
            vec![
                candidate(50.0, 50.0, 20.0, 20.0, 0.5, 0, 0.9),
                candidate(200.0, 200.0, 20.0, 20.0, 0.95, 0, 0.95),
                candidate(350.0, 50.0, 20.0, 20.0, 0.7, 0, 0.9),
            ],
            416,
            416,
        );
        let scores: Vec<f32> = detections.iter().map(|d| d.score()).collect();
        assert_eq!(scores.len(), 3);
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_invalid_boxes_dropped() {
        let filter = filter_with(0.3, 0.45, (416, 416));
        let detections = filter.filter(
            vec![
                candidate(50.0, 50.0, 0.0, 20.0, 0.9, 0, 0.9),
                candidate(f32::INFINITY, 50.0, 10.0, 20.0, 0.9, 0, 0.9),
            ],
            416,
            416,
        );
        assert!(detections.is_empty());
    }

    #[test]
    fn test_refine_is_idempotent() {
        let filter = filter_with(0.3, 0.45, (416, 416));
        let input = vec![
            detection("person", BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.8),
            detection("person", BoundingBox::new(5.0, 5.0, 100.0, 100.0), 0.7),
            detection("person", BoundingBox::new(300.0, 0.0, 100.0, 100.0), 0.6),
            detection("chair", BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.5),
            detection("chair", BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.1),
        ];
        let once = filter.refine(input);
        let twice = filter.refine(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn test_max_detections_cap() {
        let filter = DetectionFilter::new(&DetectionConfig {
            confidence_threshold: 0.3,
            max_detections: 2,
            ..DetectionConfig::default()
        });
        let candidates = (0..5).map(|i| candidate(30.0 + 80.0 * i as f32, 30.0, 20.0, 20.0, 0.9, 0, 0.9));
        assert_eq!(filter.filter(candidates, 416, 416).len(), 2);
    }
}
