use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::metric_strategy::Distance;

/// Which side of the threshold counts as "too close".
///
/// `BelowThreshold` alerts when `metric < threshold`. `AboveThreshold`
/// alerts when `metric > threshold`, which is the intuitive reading for the
/// area metric (a bigger face means a closer viewer). Equality never alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertDirection {
    #[default]
    #[serde(rename = "below")]
    BelowThreshold,
    #[serde(rename = "above")]
    AboveThreshold,
}

impl AlertDirection {
    pub fn is_too_close(self, metric: Distance, threshold: f64) -> bool {
        match self {
            AlertDirection::BelowThreshold => metric < threshold,
            AlertDirection::AboveThreshold => metric > threshold,
        }
    }
}

impl fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertDirection::BelowThreshold => write!(f, "below"),
            AlertDirection::AboveThreshold => write!(f, "above"),
        }
    }
}

impl FromStr for AlertDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "below" => Ok(AlertDirection::BelowThreshold),
            "above" => Ok(AlertDirection::AboveThreshold),
            other => Err(format!("Direction must be 'below' or 'above', got '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::below_smaller(AlertDirection::BelowThreshold, 0.05, true)]
    #[case::below_equal(AlertDirection::BelowThreshold, 0.1, false)]
    #[case::below_larger(AlertDirection::BelowThreshold, 0.2, false)]
    #[case::above_smaller(AlertDirection::AboveThreshold, 0.05, false)]
    #[case::above_equal(AlertDirection::AboveThreshold, 0.1, false)]
    #[case::above_larger(AlertDirection::AboveThreshold, 0.2, true)]
    fn test_is_too_close(
        #[case] direction: AlertDirection,
        #[case] metric: f64,
        #[case] expected: bool,
    ) {
        assert_eq!(direction.is_too_close(metric, 0.1), expected);
    }

    #[test]
    fn test_default_alerts_below_threshold() {
        assert_eq!(AlertDirection::default(), AlertDirection::BelowThreshold);
    }

    #[test]
    fn test_serde_and_parse_use_short_names() {
        assert_eq!(
            serde_json::to_string(&AlertDirection::AboveThreshold).unwrap(),
            "\"above\""
        );
        assert_eq!(
            "below".parse::<AlertDirection>().unwrap(),
            AlertDirection::BelowThreshold
        );
        assert!("sideways".parse::<AlertDirection>().is_err());
    }
}
