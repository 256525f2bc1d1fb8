use crate::shared::constants::AREA_DEFAULT_THRESHOLD;
use crate::shared::observation::FaceObservation;

use super::metric_strategy::{Distance, MetricError, MetricStrategy};

/// Fraction of the frame covered by the face bounding box.
pub struct AreaMetric;

impl MetricStrategy for AreaMetric {
    fn compute(&self, observation: &FaceObservation) -> Result<Distance, MetricError> {
        Ok(observation.bounding_box.area())
    }

    fn name(&self) -> &'static str {
        "face area"
    }

    fn default_threshold(&self) -> f64 {
        AREA_DEFAULT_THRESHOLD
    }
}
