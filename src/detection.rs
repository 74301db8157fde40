//! Detection struct for input to the position tracker.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Axis-aligned box in pixel coordinates, `(x, y)` being the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidDetection(format!(
                "box ({}, {}, {}, {}) has non-finite coordinates",
                x, y, width, height
            )));
        }
        if width < 0.0 || height < 0.0 {
            return Err(Error::InvalidDetection(format!(
                "box size {}x{} is negative",
                width, height
            )));
        }
        Ok(Self { x, y, width, height })
    }

    /// Centre point of the box.
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A detection to be tracked.
///
/// The tracker matches detections by their centre point. The box and raw
/// classifier scores ride along for the classifier and the display layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Centre point used for matching.
    pub center: Point2<f64>,

    /// Optional bounding box the centre was derived from.
    pub bbox: Option<BoundingBox>,

    /// Optional raw classifier scores, one per category.
    pub scores: Option<Vec<f64>>,
}

impl Detection {
    /// Create a detection at a centre point.
    pub fn new(x: f64, y: f64) -> Result<Self> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::InvalidDetection(format!(
                "centre ({}, {}) is not finite",
                x, y
            )));
        }
        Ok(Self {
            center: Point2::new(x, y),
            bbox: None,
            scores: None,
        })
    }

    /// Create a detection from a box; the centre is the box centre.
    pub fn from_bbox(x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        let bbox = BoundingBox::new(x, y, width, height)?;
        Ok(Self {
            center: bbox.center(),
            bbox: Some(bbox),
            scores: None,
        })
    }

    /// Attach raw classifier scores.
    pub fn with_scores(mut self, scores: Vec<f64>) -> Self {
        self.scores = Some(scores);
        self
    }

    /// Euclidean distance from this detection's centre to `point`.
    pub fn distance_to(&self, point: &Point2<f64>) -> f64 {
        nalgebra::distance(&self.center, point)
    }
}
