use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::observation::{FaceObservation, LandmarkGroup};

use super::area_metric::AreaMetric;
use super::landmark_metric::LandmarkMetric;

/// Scalar closeness value derived from one face observation.
pub type Distance = f64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("missing landmarks: {group}")]
    MissingLandmarks { group: LandmarkGroup },
}

/// Domain interface for turning a face observation into a closeness metric.
///
/// Implementations are stateless and interchangeable.
pub trait MetricStrategy: Send + Sync {
    fn compute(&self, observation: &FaceObservation) -> Result<Distance, MetricError>;

    /// Human-readable name used in display labels.
    fn name(&self) -> &'static str;

    fn default_threshold(&self) -> f64;
}

/// Selects a metric strategy from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Area,
    Landmark,
}

impl MetricKind {
    pub fn build(self) -> Box<dyn MetricStrategy> {
        match self {
            MetricKind::Area => Box::new(AreaMetric),
            MetricKind::Landmark => Box::new(LandmarkMetric),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Area => write!(f, "area"),
            MetricKind::Landmark => write!(f, "landmark"),
        }
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "area" => Ok(MetricKind::Area),
            "landmark" => Ok(MetricKind::Landmark),
            other => Err(format!("Metric must be 'area' or 'landmark', got '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::{AREA_DEFAULT_THRESHOLD, LANDMARK_DEFAULT_THRESHOLD};
    use rstest::rstest;

    #[rstest]
    #[case::area("area", MetricKind::Area)]
    #[case::landmark("landmark", MetricKind::Landmark)]
    fn test_parse_round_trips_display(#[case] text: &str, #[case] kind: MetricKind) {
        assert_eq!(text.parse::<MetricKind>().unwrap(), kind);
        assert_eq!(kind.to_string(), text);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "width".parse::<MetricKind>().unwrap_err();
        assert!(err.contains("width"));
    }

    #[test]
    fn test_build_selects_strategy_defaults() {
        assert_eq!(
            MetricKind::Area.build().default_threshold(),
            AREA_DEFAULT_THRESHOLD
        );
        assert_eq!(
            MetricKind::Landmark.build().default_threshold(),
            LANDMARK_DEFAULT_THRESHOLD
        );
    }

    #[test]
    fn test_missing_landmarks_message_names_group() {
        let err = MetricError::MissingLandmarks {
            group: LandmarkGroup::InnerLips,
        };
        assert_eq!(err.to_string(), "missing landmarks: inner-lips");
    }
}
