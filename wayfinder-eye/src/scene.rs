//! Scene enrichment: distance, bearing and color per detection

use crate::config::VisionConfig;
use crate::frame::Frame;
use crate::processing::color::{ColorClassifier, ColorName};
use crate::processing::detection::Detection;
use crate::processing::geometry::{Direction, GeometricEstimator};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A detection with everything the alert side needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedDetection {
    pub detection: Detection,
    pub distance_meters: f32,
    /// -1.0 far left .. +1.0 far right
    pub bearing: f32,
    pub color: ColorName,
}

impl EnrichedDetection {
    pub fn label(&self) -> &str {
        &self.detection.label
    }

    pub fn direction(&self) -> Direction {
        Direction::from_bearing(self.bearing)
    }
}

/// How many of one label are in view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Enriches a frame's detections
#[derive(Debug, Clone)]
pub struct SceneAnalyzer {
    estimator: GeometricEstimator,
    classifier: ColorClassifier,
}

impl SceneAnalyzer {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            estimator: GeometricEstimator::new(&config.geometry),
            classifier: ColorClassifier::new(&config.color),
        }
    }

    pub fn estimator(&self) -> &GeometricEstimator {
        &self.estimator
    }

    /// Enrich detections in order
    pub fn analyze(&self, frame: &Frame, detections: Vec<Detection>) -> Vec<EnrichedDetection> {
        debug!("Analyzing scene with {} detections", detections.len());
        detections
            .into_iter()
            .map(|detection| {
                let (distance_meters, bearing) = self.estimator.estimate(&detection, frame.width());
                let color = self.classifier.classify(frame, &detection.bbox);
                EnrichedDetection {
                    detection,
                    distance_meters,
                    bearing,
                    color,
                }
            })
            .collect()
    }
}

/// De-duplicated labels in order of first appearance.
pub fn visible_labels(detections: &[EnrichedDetection]) -> Vec<LabelCount> {
    let mut counts: Vec<LabelCount> = Vec::new();
    for d in detections {
        match counts.iter_mut().find(|c| c.label == d.label()) {
            Some(existing) => existing.count += 1,
            None => counts.push(LabelCount {
                label: d.label().to_string(),
                count: 1,
            }),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::detection::BoundingBox;

    fn detection(label: &str, bbox: BoundingBox) -> Detection {
        Detection {
            class_id: 0,
            label: label.to_string(),
            objectness: 0.9,
            class_score: 0.9,
            bbox,
        }
    }

    #[test]
    fn test_analyze_fills_distance_bearing_color() {
        let analyzer = SceneAnalyzer::new(&VisionConfig::default());
        let frame = Frame::filled(640, 480, [250, 250, 250]);
        let enriched = analyzer.analyze(
            &frame,
            vec![detection("person", BoundingBox::new(0.0, 100.0, 100.0, 200.0))],
        );

        assert_eq!(enriched.len(), 1);
        let e = &enriched[0];
        assert!((e.distance_meters - 2.75).abs() < 1e-5);
        // center x = 50 of 640
        assert!((e.bearing - (50.0 / 640.0 * 2.0 - 1.0)).abs() < 1e-6);
        assert_eq!(e.direction(), Direction::Left);
        assert_eq!(e.color, ColorName::White);
    }

    #[test]
    fn test_visible_labels_dedup_in_order() {
        let analyzer = SceneAnalyzer::new(&VisionConfig::default());
        let frame = Frame::filled(100, 100, [0, 0, 0]);
        let b = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        let enriched = analyzer.analyze(
            &frame,
            vec![
                detection("chair", b),
                detection("person", b),
                detection("chair", b),
            ],
        );

        let labels = visible_labels(&enriched);
        assert_eq!(
            labels,
            vec![
                LabelCount { label: "chair".into(), count: 2 },
                LabelCount { label: "person".into(), count: 1 },
            ]
        );
    }
}
