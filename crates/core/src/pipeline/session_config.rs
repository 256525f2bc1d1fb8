use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::proximity::domain::alert_direction::AlertDirection;
use crate::proximity::domain::metric_strategy::MetricKind;
use crate::shared::constants::{
    AREA_DEFAULT_THRESHOLD, AREA_FRAME_INTERVAL, LANDMARK_DEFAULT_THRESHOLD,
    LANDMARK_FRAME_INTERVAL,
};

use super::face_policy::FacePolicy;

const DEFAULT_CHANNEL_CAPACITY: usize = 2;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Tunables for one proximity session.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frames skipped between two detections.
    pub frame_interval: usize,
    pub metric: MetricKind,
    /// `None` uses the metric's own default.
    pub threshold: Option<f64>,
    pub direction: AlertDirection,
    pub face_policy: FacePolicy,
    /// Frames buffered between capture and worker lanes.
    pub channel_capacity: usize,
    /// Block the capture lane instead of dropping frames when the worker
    /// lane is busy. Useful for file and image-sequence sources.
    pub block_when_busy: bool,
    pub warning_volume: f32,
}

impl SessionConfig {
    pub fn area() -> Self {
        Self {
            frame_interval: AREA_FRAME_INTERVAL,
            metric: MetricKind::Area,
            threshold: Some(AREA_DEFAULT_THRESHOLD),
            ..Self::base()
        }
    }

    pub fn landmark() -> Self {
        Self {
            frame_interval: LANDMARK_FRAME_INTERVAL,
            metric: MetricKind::Landmark,
            threshold: Some(LANDMARK_DEFAULT_THRESHOLD),
            ..Self::base()
        }
    }

    fn base() -> Self {
        Self {
            frame_interval: AREA_FRAME_INTERVAL,
            metric: MetricKind::Area,
            threshold: None,
            direction: AlertDirection::default(),
            face_policy: FacePolicy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            block_when_busy: false,
            warning_volume: 1.0,
        }
    }

    /// The configured threshold, or the metric's default when unset.
    pub fn effective_threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.metric.build().default_threshold())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel_capacity must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.warning_volume) {
            return Err(ConfigError::Invalid(format!(
                "warning_volume must be in [0, 1], got {}",
                self.warning_volume
            )));
        }
        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() {
                return Err(ConfigError::Invalid("threshold must be finite".into()));
            }
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::base()
    }
}
