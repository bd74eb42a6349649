use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::course::{RoundId, UserId};
use crate::geo::Coordinate;
use crate::movement::WindowEntry;
use crate::position::PositionReading;
use crate::shot::ShotEvent;

/// One GPS fix as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub coordinate: Coordinate,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
    /// Instantaneous speed in m/s, when the device reports one.
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn window_entry(&self) -> WindowEntry {
        WindowEntry {
            coordinate: self.coordinate,
            speed: self.speed,
            timestamp: self.timestamp,
        }
    }
}

/// A sample tagged with the round it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub user_id: UserId,
    pub round_id: RoundId,
    pub sample: LocationSample,
}

/// A sample enriched with position and movement analysis, as persisted by
/// the location store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedLocation {
    /// Assigned by the store on creation.
    pub id: Option<u64>,
    pub user_id: UserId,
    pub round_id: RoundId,
    pub sample: LocationSample,
    pub reading: PositionReading,
    pub shot: Option<ShotEvent>,
}
