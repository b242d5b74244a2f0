//! Durable store for idempotency key records.
//!
//! Every operation takes the transaction connection as its first argument;
//! the atomic-phase executor owns transaction boundaries, never this
//! module. A missing row surfaces as the typed [`StoreError::NotFound`] so
//! the driver can tell first receipt from replay.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::{IdempotencyKey, IdempotencyRecord, NewIdempotencyKey, RecoveryPoint};

use super::models::{IdempotencyKeyChangeset, IdempotencyKeyRow, NewIdempotencyKeyRow};
use super::schema::idempotency_keys;
use super::store_error::StoreError;

/// Look up a key by its unique `(user_id, key_string)` pair.
pub async fn find(
    conn: &mut AsyncPgConnection,
    user_id: i64,
    key: &str,
) -> Result<IdempotencyRecord, StoreError> {
    let row = idempotency_keys::table
        .filter(
            idempotency_keys::user_id
                .eq(user_id)
                .and(idempotency_keys::idempotency_key.eq(key)),
        )
        .select(IdempotencyKeyRow::as_select())
        .first::<IdempotencyKeyRow>(conn)
        .await?;

    row_to_record(row)
}

/// Insert a key at first receipt.
///
/// The new row starts at `started` with null response fields and a null
/// lock; `created_at` and `last_run_at` come from column defaults.
pub async fn insert(
    conn: &mut AsyncPgConnection,
    new_key: &NewIdempotencyKey,
) -> Result<IdempotencyRecord, StoreError> {
    let row = NewIdempotencyKeyRow {
        idempotency_key: new_key.key.as_str(),
        request_method: &new_key.request_method,
        request_params: &new_key.request_params,
        request_path: &new_key.request_path,
        recovery_point: RecoveryPoint::Started.as_str(),
        user_id: new_key.user_id,
    };

    let inserted = diesel::insert_into(idempotency_keys::table)
        .values(&row)
        .returning(IdempotencyKeyRow::as_returning())
        .get_result::<IdempotencyKeyRow>(conn)
        .await?;

    row_to_record(inserted)
}

/// Write every mutable field of the record and return the row as
/// persisted.
pub async fn update(
    conn: &mut AsyncPgConnection,
    record: &IdempotencyRecord,
) -> Result<IdempotencyRecord, StoreError> {
    let changes = IdempotencyKeyChangeset {
        last_run_at: record.last_run_at,
        locked_at: record.locked_at,
        response_code: record.response_code,
        response_body: record.response_body.as_deref(),
        recovery_point: record.recovery_point.as_str(),
    };

    let updated = diesel::update(idempotency_keys::table.filter(idempotency_keys::id.eq(record.id)))
        .set(&changes)
        .returning(IdempotencyKeyRow::as_returning())
        .get_result::<IdempotencyKeyRow>(conn)
        .await?;

    row_to_record(updated)
}

/// Convert a database row into a validated domain record.
fn row_to_record(row: IdempotencyKeyRow) -> Result<IdempotencyRecord, StoreError> {
    let key = IdempotencyKey::new(row.idempotency_key)
        .map_err(|err| StoreError::query(format!("corrupted idempotency key in database: {err}")))?;
    let recovery_point = row
        .recovery_point
        .parse::<RecoveryPoint>()
        .map_err(|err| StoreError::query(format!("invalid recovery point in database: {err}")))?;

    Ok(IdempotencyRecord {
        id: row.id,
        created_at: row.created_at,
        key,
        last_run_at: row.last_run_at,
        locked_at: row.locked_at,
        request_method: row.request_method,
        request_params: row.request_params,
        request_path: row.request_path,
        response_code: row.response_code,
        response_body: row.response_body,
        recovery_point,
        user_id: row.user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::{fixture, rstest};

    #[fixture]
    fn valid_row() -> IdempotencyKeyRow {
        let now = Utc::now();
        IdempotencyKeyRow {
            id: 11,
            created_at: now,
            idempotency_key: "testKey".to_owned(),
            last_run_at: now,
            locked_at: None,
            request_method: "POST".to_owned(),
            request_params: b"{}".to_vec(),
            request_path: "/rides".to_owned(),
            response_code: None,
            response_body: None,
            recovery_point: "ride_created".to_owned(),
            user_id: 1337,
        }
    }

    #[rstest]
    fn row_conversion_produces_a_domain_record(valid_row: IdempotencyKeyRow) {
        let record = row_to_record(valid_row).expect("valid row converts");

        assert_eq!(record.id, 11);
        assert_eq!(record.key.as_str(), "testKey");
        assert_eq!(record.recovery_point, RecoveryPoint::RideCreated);
        assert_eq!(record.cached_response(), None);
    }

    #[rstest]
    fn row_conversion_rejects_unknown_recovery_points(mut valid_row: IdempotencyKeyRow) {
        valid_row.recovery_point = "charging".to_owned();

        let err = row_to_record(valid_row).expect_err("unknown point rejected");
        assert!(matches!(err, StoreError::Query { .. }));
        assert!(err.to_string().contains("recovery point"));
    }

    #[rstest]
    fn row_conversion_rejects_corrupted_keys(mut valid_row: IdempotencyKeyRow) {
        valid_row.idempotency_key = "x".to_owned();

        let err = row_to_record(valid_row).expect_err("short key rejected");
        assert!(matches!(err, StoreError::Query { .. }));
    }
}
