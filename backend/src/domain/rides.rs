//! Ride domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic coordinate of a pickup or drop-off point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub long: f64,
}

impl Coordinate {
    /// Whether the coordinate lies within valid geographic bounds.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.long)
    }
}

/// A reserved ride.
#[derive(Debug, Clone, PartialEq)]
pub struct Ride {
    /// Surrogate row identifier.
    pub id: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Back-reference to the idempotency key that created this ride.
    /// Nullable: keys are reaped independently of ride history.
    pub idempotency_key_id: Option<i64>,
    /// Pickup point.
    pub origin: Coordinate,
    /// Drop-off point.
    pub target: Coordinate,
    /// Payment provider charge id, e.g. `ch_123`; null until charged.
    pub stripe_charge_id: Option<String>,
    /// Riding user.
    pub user_id: i64,
}

/// Fields required to insert a new ride.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRide {
    pub idempotency_key_id: Option<i64>,
    pub origin: Coordinate,
    pub target: Coordinate,
    pub user_id: i64,
}
