use serde::{Deserialize, Serialize};

use crate::shared::constants::INITIAL_LABEL;

/// Alert state as seen by the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertSnapshot {
    pub is_alerting: bool,
    pub display_label: String,
}

impl Default for AlertSnapshot {
    fn default() -> Self {
        Self {
            is_alerting: false,
            display_label: INITIAL_LABEL.to_string(),
        }
    }
}
