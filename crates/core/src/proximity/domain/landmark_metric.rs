use crate::shared::constants::LANDMARK_DEFAULT_THRESHOLD;
use crate::shared::observation::{FaceObservation, LandmarkGroup, Point};

use super::metric_strategy::{Distance, MetricError, MetricStrategy};

/// Eye-to-eye distance times eye-to-mouth distance.
///
/// Uses the first point of the left-eye, right-eye and inner-lips groups;
/// the mouth distance is measured from the left eye.
pub struct LandmarkMetric;

impl LandmarkMetric {
    fn first(observation: &FaceObservation, group: LandmarkGroup) -> Result<Point, MetricError> {
        observation
            .first_landmark(group)
            .ok_or(MetricError::MissingLandmarks { group })
    }
}

impl MetricStrategy for LandmarkMetric {
    fn compute(&self, observation: &FaceObservation) -> Result<Distance, MetricError> {
        let left_eye = Self::first(observation, LandmarkGroup::LeftEye)?;
        let right_eye = Self::first(observation, LandmarkGroup::RightEye)?;
        let mouth = Self::first(observation, LandmarkGroup::InnerLips)?;

        let eye_distance = right_eye.distance_to(&left_eye);
        let mouth_to_eye = mouth.distance_to(&left_eye);
        Ok(eye_distance * mouth_to_eye)
    }

    fn name(&self) -> &'static str {
        "landmark distance"
    }

    fn default_threshold(&self) -> f64 {
        LANDMARK_DEFAULT_THRESHOLD
    }
}
