//! Ride repository.
//!
//! Operations take the transaction connection so ride writes land in the
//! same atomic phase as the recovery-point advance that records them.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::{Coordinate, NewRide, Ride};

use super::models::{NewRideRow, RideChangeset, RideRow};
use super::schema::rides;
use super::store_error::StoreError;

/// Insert a new ride.
pub async fn insert(conn: &mut AsyncPgConnection, ride: &NewRide) -> Result<Ride, StoreError> {
    let row = NewRideRow {
        idempotency_key_id: ride.idempotency_key_id,
        origin_lat: ride.origin.lat,
        origin_lon: ride.origin.long,
        target_lat: ride.target.lat,
        target_lon: ride.target.long,
        user_id: ride.user_id,
    };

    let inserted = diesel::insert_into(rides::table)
        .values(&row)
        .returning(RideRow::as_returning())
        .get_result::<RideRow>(conn)
        .await?;

    Ok(row_to_ride(inserted))
}

/// Write every mutable field of the ride and return the row as persisted.
pub async fn update(conn: &mut AsyncPgConnection, ride: &Ride) -> Result<Ride, StoreError> {
    let changes = RideChangeset {
        idempotency_key_id: ride.idempotency_key_id,
        origin_lat: ride.origin.lat,
        origin_lon: ride.origin.long,
        target_lat: ride.target.lat,
        target_lon: ride.target.long,
        stripe_charge_id: ride.stripe_charge_id.as_deref(),
    };

    let updated = diesel::update(rides::table.filter(rides::id.eq(ride.id)))
        .set(&changes)
        .returning(RideRow::as_returning())
        .get_result::<RideRow>(conn)
        .await?;

    Ok(row_to_ride(updated))
}

/// Fetch the ride created under the given idempotency key.
///
/// This is how a resumed request recovers the ride a crashed predecessor
/// already inserted.
pub async fn find_by_key(conn: &mut AsyncPgConnection, key_id: i64) -> Result<Ride, StoreError> {
    let row = rides::table
        .filter(rides::idempotency_key_id.eq(key_id))
        .select(RideRow::as_select())
        .first::<RideRow>(conn)
        .await?;

    Ok(row_to_ride(row))
}

fn row_to_ride(row: RideRow) -> Ride {
    Ride {
        id: row.id,
        created_at: row.created_at,
        idempotency_key_id: row.idempotency_key_id,
        origin: Coordinate {
            lat: row.origin_lat,
            long: row.origin_lon,
        },
        target: Coordinate {
            lat: row.target_lat,
            long: row.target_lon,
        },
        stripe_charge_id: row.stripe_charge_id,
        user_id: row.user_id,
    }
}
