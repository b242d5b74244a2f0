//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and
//! must never be exposed to the domain. Repository modules convert between
//! them and domain types, which keeps Diesel confined to this adapter.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{audit_records, idempotency_keys, rides, users};

/// Row struct for reading idempotency keys.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = idempotency_keys)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IdempotencyKeyRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: String,
    pub last_run_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub request_method: String,
    pub request_params: Vec<u8>,
    pub request_path: String,
    pub response_code: Option<i32>,
    pub response_body: Option<Vec<u8>>,
    pub recovery_point: String,
    pub user_id: i64,
}

/// Insertable struct for first receipt of a key.
///
/// `created_at`, `last_run_at` and the null lock come from column
/// defaults; the response fields start null by omission.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = idempotency_keys)]
pub(crate) struct NewIdempotencyKeyRow<'a> {
    pub idempotency_key: &'a str,
    pub request_method: &'a str,
    pub request_params: &'a [u8],
    pub request_path: &'a str,
    pub recovery_point: &'a str,
    pub user_id: i64,
}

/// Changeset writing every mutable key field.
///
/// `treat_none_as_null` matters here: releasing the lock and the not-yet-
/// finished response fields must be written as SQL NULL, not skipped.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = idempotency_keys)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct IdempotencyKeyChangeset<'a> {
    pub last_run_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub response_code: Option<i32>,
    pub response_body: Option<&'a [u8]>,
    pub recovery_point: &'a str,
}

/// Row struct for reading rides.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rides)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RideRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub idempotency_key_id: Option<i64>,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub target_lat: f64,
    pub target_lon: f64,
    pub stripe_charge_id: Option<String>,
    pub user_id: i64,
}

/// Insertable struct for creating rides.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rides)]
pub(crate) struct NewRideRow {
    pub idempotency_key_id: Option<i64>,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub target_lat: f64,
    pub target_lon: f64,
    pub user_id: i64,
}

/// Changeset writing every mutable ride field.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = rides)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct RideChangeset<'a> {
    pub idempotency_key_id: Option<i64>,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub target_lat: f64,
    pub target_lon: f64,
    pub stripe_charge_id: Option<&'a str>,
}

/// Insertable struct for audit records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_records)]
pub(crate) struct NewAuditRecordRow<'a> {
    pub action: &'a str,
    pub data: &'a serde_json::Value,
    pub origin_ip: &'a str,
    pub resource_id: i64,
    pub resource_type: &'a str,
    pub user_id: i64,
}

/// Row struct for reading users.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub email: String,
    pub stripe_customer_id: String,
    pub created_at: DateTime<Utc>,
}
