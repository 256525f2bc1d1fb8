use serde::Serialize;

use crate::shared::observation::FaceObservation;

use super::alert_direction::AlertDirection;
use super::metric_strategy::{Distance, MetricStrategy};
use super::threshold::Threshold;

/// Outcome of evaluating one face.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub is_too_close: bool,
    pub display_label: String,
    /// `None` when the metric could not be computed for this face.
    pub reading: Option<Distance>,
}

impl EvaluationResult {
    /// Fail-open result for a face the metric cannot read.
    pub fn no_reading(reason: impl std::fmt::Display) -> Self {
        Self {
            is_too_close: false,
            display_label: format!("No reading: {reason}"),
            reading: None,
        }
    }
}

/// Compares a face's closeness metric against the shared threshold.
pub struct ProximityEvaluator {
    strategy: Box<dyn MetricStrategy>,
    threshold: Threshold,
    direction: AlertDirection,
}

impl ProximityEvaluator {
    pub fn new(
        strategy: Box<dyn MetricStrategy>,
        threshold: Threshold,
        direction: AlertDirection,
    ) -> Self {
        Self {
            strategy,
            threshold,
            direction,
        }
    }

    pub fn threshold(&self) -> &Threshold {
        &self.threshold
    }

    /// Reads the threshold afresh on every call, so a change made by another
    /// lane applies to the very next evaluation.
    pub fn evaluate(&self, observation: &FaceObservation) -> EvaluationResult {
        match self.strategy.compute(observation) {
            Ok(metric) => EvaluationResult {
                is_too_close: self.direction.is_too_close(metric, self.threshold.get()),
                display_label: format!("Calculated {}: {metric:.4}", self.strategy.name()),
                reading: Some(metric),
            },
            Err(e) => EvaluationResult::no_reading(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proximity::domain::area_metric::AreaMetric;
    use crate::proximity::domain::landmark_metric::LandmarkMetric;
    use crate::shared::observation::NormalizedRect;
    use rstest::rstest;

    fn face_with_area(w: f64, h: f64) -> FaceObservation {
        FaceObservation::new(NormalizedRect::new(0.1, 0.1, w, h))
    }

    fn area_evaluator(threshold: f64) -> ProximityEvaluator {
        ProximityEvaluator::new(
            Box::new(AreaMetric),
            Threshold::new(threshold),
            AlertDirection::BelowThreshold,
        )
    }

    #[test]
    fn test_small_area_below_threshold_is_too_close() {
        // Default direction: a metric under the threshold alerts.
        let result = area_evaluator(0.1).evaluate(&face_with_area(0.25, 0.2));

        assert!(result.is_too_close);
        assert_eq!(result.display_label, "Calculated face area: 0.0500");
        assert!(result.reading.is_some());
    }

    #[rstest]
    #[case::below(0.2, 0.2, true)]
    #[case::equal(0.5, 0.2, false)]
    #[case::above(0.6, 0.5, false)]
    fn test_area_threshold_comparison(#[case] w: f64, #[case] h: f64, #[case] expected: bool) {
        let result = area_evaluator(0.1).evaluate(&face_with_area(w, h));
        assert_eq!(result.is_too_close, expected);
    }

    #[test]
    fn test_label_produced_when_not_too_close() {
        let result = area_evaluator(0.1).evaluate(&face_with_area(0.5, 0.5));

        assert!(!result.is_too_close);
        assert_eq!(result.display_label, "Calculated face area: 0.2500");
    }

    #[test]
    fn test_above_direction_inverts_decision() {
        let evaluator = ProximityEvaluator::new(
            Box::new(AreaMetric),
            Threshold::new(0.1),
            AlertDirection::AboveThreshold,
        );

        assert!(evaluator.evaluate(&face_with_area(0.5, 0.5)).is_too_close);
        assert!(!evaluator.evaluate(&face_with_area(0.25, 0.2)).is_too_close);
    }

    #[test]
    fn test_threshold_change_applies_to_next_evaluation() {
        let threshold = Threshold::new(0.1);
        let evaluator = ProximityEvaluator::new(
            Box::new(AreaMetric),
            threshold.clone(),
            AlertDirection::BelowThreshold,
        );
        let face = face_with_area(0.4, 0.5); // 0.2

        assert!(!evaluator.evaluate(&face).is_too_close);
        threshold.set(0.3);
        assert!(evaluator.evaluate(&face).is_too_close);
        threshold.set(0.15);
        assert!(!evaluator.evaluate(&face).is_too_close);
    }

    #[test]
    fn test_missing_landmarks_fail_open() {
        let evaluator = ProximityEvaluator::new(
            Box::new(LandmarkMetric),
            // Any reading would alert at this threshold.
            Threshold::new(f64::MAX),
            AlertDirection::BelowThreshold,
        );

        let result = evaluator.evaluate(&face_with_area(0.3, 0.3));

        assert!(!result.is_too_close);
        assert!(result.reading.is_none());
        assert_eq!(result.display_label, "No reading: missing landmarks: left-eye");
    }
}
