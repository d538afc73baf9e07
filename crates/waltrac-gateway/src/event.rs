//! Event record republished for every accepted position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use waltrac_codec::Position;

/// Compact JSON event, e.g.
/// `{"vl":true,"dv":"a1b2c3d4e5f6","ts":1700000000,"lt":52.52,"lg":13.405,"nm":"Alpha"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEvent {
    /// Fix-valid flag from the header.
    #[serde(rename = "vl")]
    pub valid: bool,
    /// Device identifier, lower-case hex.
    #[serde(rename = "dv")]
    pub device: String,
    /// Gateway receipt time, Unix seconds.
    #[serde(rename = "ts")]
    pub received_at: i64,
    #[serde(rename = "lt")]
    pub latitude: f64,
    #[serde(rename = "lg")]
    pub longitude: f64,
    #[serde(rename = "nm")]
    pub name: String,
}

impl PositionEvent {
    pub fn from_position(position: &Position, received_at: DateTime<Utc>) -> Self {
        Self {
            valid: position.is_valid(),
            device: position.device.to_hex(),
            received_at: received_at.timestamp(),
            latitude: position.latitude,
            longitude: position.longitude,
            name: position.name.clone(),
        }
    }

    /// Subtopic the event is published under.
    pub fn subtopic(&self) -> String {
        format!("position/{}", self.device)
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
