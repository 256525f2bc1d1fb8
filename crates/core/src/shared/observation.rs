use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in normalized image coordinates (`0.0..=1.0` on both axes).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Face bounding box in normalized image coordinates.
///
/// Components are expected in `[0, 1]` but not validated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Named facial landmark groups a detector may report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LandmarkGroup {
    LeftEye,
    RightEye,
    Nose,
    InnerLips,
    OuterLips,
}

impl fmt::Display for LandmarkGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandmarkGroup::LeftEye => write!(f, "left-eye"),
            LandmarkGroup::RightEye => write!(f, "right-eye"),
            LandmarkGroup::Nose => write!(f, "nose"),
            LandmarkGroup::InnerLips => write!(f, "inner-lips"),
            LandmarkGroup::OuterLips => write!(f, "outer-lips"),
        }
    }
}

/// One detected face: a normalized bounding box plus whatever landmark
/// groups the detector could see.
///
/// Produced fresh per detection call and discarded after evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub bounding_box: NormalizedRect,
    #[serde(default)]
    pub landmarks: BTreeMap<LandmarkGroup, Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl FaceObservation {
    pub fn new(bounding_box: NormalizedRect) -> Self {
        Self {
            bounding_box,
            landmarks: BTreeMap::new(),
            confidence: None,
        }
    }

    pub fn with_landmarks(mut self, group: LandmarkGroup, points: Vec<Point>) -> Self {
        self.landmarks.insert(group, points);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn landmarks(&self, group: LandmarkGroup) -> Option<&[Point]> {
        self.landmarks.get(&group).map(|points| points.as_slice())
    }

    /// First point of a group; `None` when the group is absent or empty.
    pub fn first_landmark(&self, group: LandmarkGroup) -> Option<Point> {
        self.landmarks(group).and_then(|points| points.first().copied())
    }
}
