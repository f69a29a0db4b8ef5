use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl RideStatus {
    /// Completed and cancelled rides never change status again.
    pub fn is_final(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

/// A candidate ride published by a driver. The booking system owns it; the
/// matching engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideOffer {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub origin: Coordinate,
    pub origin_label: String,
    pub destination: Coordinate,
    pub destination_label: String,
    pub departure_time: DateTime<Utc>,
    pub seats_available: u32,
    pub status: RideStatus,
    pub price_per_seat: f64,
}

impl RideOffer {
    pub fn is_matchable(&self) -> bool {
        self.status == RideStatus::Pending && self.seats_available > 0
    }
}

/// A rider's search query. Built per search and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    pub origin: Coordinate,
    #[serde(default)]
    pub origin_label: String,
    pub destination: Coordinate,
    #[serde(default)]
    pub destination_label: String,
    pub departure_time: DateTime<Utc>,
}
