use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How several faces in one frame combine into one alert decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FacePolicy {
    /// Alert when any readable face is too close.
    #[default]
    AnyTooClose,
    /// Feed every readable face to the controller in order; the last one
    /// decides the state.
    LastWins,
}

impl fmt::Display for FacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacePolicy::AnyTooClose => write!(f, "any-too-close"),
            FacePolicy::LastWins => write!(f, "last-wins"),
        }
    }
}

impl FromStr for FacePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any-too-close" => Ok(FacePolicy::AnyTooClose),
            "last-wins" => Ok(FacePolicy::LastWins),
            other => Err(format!(
                "Face policy must be 'any-too-close' or 'last-wins', got '{other}'"
            )),
        }
    }
}
