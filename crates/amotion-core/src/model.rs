// ── Device identity ──

use amotion_api::models::DiscoveryInfo;
use serde::{Deserialize, Serialize};

/// What the unit says it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: Option<String>,
    pub version: Option<String>,
    pub production_number: Option<String>,
    pub board_number: Option<String>,
}

impl DeviceInfo {
    /// Overlay the fields `update` carries; absent ones keep their value.
    /// Returns whether anything changed.
    pub fn merge(&mut self, update: DeviceInfo) -> bool {
        let before = self.clone();
        let DeviceInfo {
            model,
            version,
            production_number,
            board_number,
        } = update;
        if model.is_some() {
            self.model = model;
        }
        if version.is_some() {
            self.version = version;
        }
        if production_number.is_some() {
            self.production_number = production_number;
        }
        if board_number.is_some() {
            self.board_number = board_number;
        }
        *self != before
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or("aMotion")
    }
}

impl From<DiscoveryInfo> for DeviceInfo {
    fn from(info: DiscoveryInfo) -> Self {
        Self {
            model: info.model,
            version: info.version,
            production_number: info.production_number,
            board_number: info.board_number,
        }
    }
}
