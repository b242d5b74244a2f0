//! Idempotency primitives for exactly-once request execution.
//!
//! This module provides the domain types of the idempotency engine:
//!
//! - [`IdempotencyKey`]: validated client-supplied key sent via the
//!   `Idempotency-Key` HTTP header.
//! - [`RecoveryPoint`]: ordered checkpoints of the reservation workflow.
//! - [`IdempotencyRecord`]: durable state of one logical request, including
//!   the request fingerprint and, once finished, the cached response.
//! - [`PhaseOutcome`]: the closed set of results an atomic phase may
//!   produce, with the pure record transition each one performs.
//!
//! # Parameter canonicalization
//!
//! Request parameters are stored as canonical JSON bytes so a future
//! revision can compare replayed parameters byte-for-byte:
//!
//! 1. JSON objects have their keys sorted recursively.
//! 2. The result is serialized to compact JSON (no whitespace).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{Error, ErrorCode};

/// Minimum accepted length of a client-supplied idempotency key.
pub const MIN_IDEMPOTENCY_KEY_LENGTH: usize = 2;

// ---------------------------------------------------------------------------
// IdempotencyKey
// ---------------------------------------------------------------------------

/// Validation errors for [`IdempotencyKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyKeyValidationError {
    /// The key string was shorter than [`MIN_IDEMPOTENCY_KEY_LENGTH`].
    TooShort,
}

impl fmt::Display for IdempotencyKeyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(
                f,
                "idempotency key must be at least {MIN_IDEMPOTENCY_KEY_LENGTH} characters"
            ),
        }
    }
}

impl std::error::Error for IdempotencyKeyValidationError {}

/// Client-provided idempotency key.
///
/// Scoped by user: two different users may legitimately reuse the same
/// string. The same value is forwarded to the payment provider as its
/// idempotency key so provider-side retries deduplicate too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validate and construct an [`IdempotencyKey`] from a string.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyKeyValidationError::TooShort`] when the input
    /// has fewer than [`MIN_IDEMPOTENCY_KEY_LENGTH`] characters.
    pub fn new(key: impl Into<String>) -> Result<Self, IdempotencyKeyValidationError> {
        let key = key.into();
        if key.chars().count() < MIN_IDEMPOTENCY_KEY_LENGTH {
            return Err(IdempotencyKeyValidationError::TooShort);
        }
        Ok(Self(key))
    }

    /// Borrow the raw key string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.0
    }
}

// ---------------------------------------------------------------------------
// RecoveryPoint
// ---------------------------------------------------------------------------

/// Named checkpoint durably reached by the reservation workflow.
///
/// The derived `Ord` is the workflow order; phases may only move a key
/// forward through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecoveryPoint {
    /// Key inserted; no workflow side effects yet.
    Started,
    /// Ride row and its audit record exist.
    RideCreated,
    /// Payment provider charge created and written onto the ride.
    ChargeCreated,
    /// Terminal: the cached response is ready to serve.
    Finished,
}

/// Parse failure for a stored recovery point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown recovery point: {value}")]
pub struct RecoveryPointParseError {
    value: String,
}

impl RecoveryPoint {
    /// Number of non-terminal points, i.e. the maximum number of phases a
    /// single request can still have ahead of it.
    pub const NON_TERMINAL: usize = 3;

    /// Stable string stored in the `recovery_point` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::RideCreated => "ride_created",
            Self::ChargeCreated => "charge_created",
            Self::Finished => "finished",
        }
    }

    /// Whether this point terminates the advance loop.
    pub fn is_terminal(self) -> bool {
        self == Self::Finished
    }
}

impl FromStr for RecoveryPoint {
    type Err = RecoveryPointParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "started" => Ok(Self::Started),
            "ride_created" => Ok(Self::RideCreated),
            "charge_created" => Ok(Self::ChargeCreated),
            "finished" => Ok(Self::Finished),
            other => Err(RecoveryPointParseError {
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for RecoveryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IdempotencyRecord
// ---------------------------------------------------------------------------

/// Durable state of one logical request, unique per `(user_id, key)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    /// Surrogate row identifier.
    pub id: i64,
    /// Immutable creation timestamp.
    pub created_at: DateTime<Utc>,
    /// The client-supplied key.
    pub key: IdempotencyKey,
    /// Touched whenever a phase applies an outcome to this record.
    pub last_run_at: DateTime<Utc>,
    /// Logical lock; non-null means a worker is advancing this key. The
    /// real serialization guarantee comes from the database; this field
    /// lets an external sweeper tell stale attempts from live ones.
    pub locked_at: Option<DateTime<Utc>>,
    /// Request fingerprint: HTTP method at first receipt.
    pub request_method: String,
    /// Request fingerprint: canonical parameter bytes at first receipt.
    pub request_params: Vec<u8>,
    /// Request fingerprint: request path at first receipt.
    pub request_path: String,
    /// Cached response status; set only when finished.
    pub response_code: Option<i32>,
    /// Cached response body; set only when finished.
    pub response_body: Option<Vec<u8>>,
    /// Latest checkpoint durably reached.
    pub recovery_point: RecoveryPoint,
    /// Owning user.
    pub user_id: i64,
}

/// Fields captured when a key is first inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIdempotencyKey {
    pub key: IdempotencyKey,
    pub request_method: String,
    pub request_params: Vec<u8>,
    pub request_path: String,
    pub user_id: i64,
}

/// Response replayed verbatim for a finished key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// HTTP status recorded by the finalizing phase.
    pub status: u16,
    /// Exact body bytes recorded by the finalizing phase.
    pub body: Vec<u8>,
}

impl IdempotencyRecord {
    /// The stored response, present exactly when the key is finished.
    pub fn cached_response(&self) -> Option<CachedResponse> {
        let code = self.response_code?;
        let body = self.response_body.clone()?;
        let status = u16::try_from(code).ok()?;
        Some(CachedResponse { status, body })
    }

    /// Copy of this record with the logical lock released.
    #[must_use]
    pub fn with_lock_cleared(mut self) -> Self {
        self.locked_at = None;
        self
    }

    fn touched(mut self, now: DateTime<Utc>) -> Self {
        self.last_run_at = now;
        self
    }

    fn advanced(mut self, next: RecoveryPoint, now: DateTime<Utc>) -> Self {
        self.recovery_point = next;
        self.locked_at = Some(now);
        self.last_run_at = now;
        self
    }

    fn finalized(mut self, status: u16, body: Vec<u8>, now: DateTime<Utc>) -> Self {
        self.recovery_point = RecoveryPoint::Finished;
        self.locked_at = None;
        self.response_code = Some(i32::from(status));
        self.response_body = Some(body);
        self.last_run_at = now;
        self
    }
}

// ---------------------------------------------------------------------------
// PhaseOutcome
// ---------------------------------------------------------------------------

/// Result of one atomic phase, applied to the key in the same transaction
/// as the phase's side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutcome {
    /// Leave the key's state alone (the phase only resolved it).
    Noop,
    /// Record that the workflow durably reached the given checkpoint.
    Advance(RecoveryPoint),
    /// Terminal: store the response to replay and release the lock.
    Finalize {
        /// HTTP status to cache.
        status: u16,
        /// Response payload; canonical bytes of this value are cached.
        body: serde_json::Value,
    },
}

impl PhaseOutcome {
    /// Compute the record this outcome persists.
    ///
    /// Every variant touches `last_run_at` so lock staleness can be
    /// reasoned about from the row alone.
    ///
    /// # Errors
    ///
    /// Returns an internal error when an `Advance` would move the key
    /// backward, stay in place, or reach the terminal point (only
    /// `Finalize` may finish a key).
    pub fn applied_to(
        &self,
        record: &IdempotencyRecord,
        now: DateTime<Utc>,
    ) -> Result<IdempotencyRecord, Error> {
        match self {
            Self::Noop => Ok(record.clone().touched(now)),
            Self::Advance(next) => {
                if next.is_terminal() {
                    return Err(Error::new(
                        ErrorCode::Internal,
                        "only a finalizing phase may reach the terminal recovery point",
                    ));
                }
                if *next <= record.recovery_point {
                    return Err(Error::new(
                        ErrorCode::Internal,
                        format!(
                            "recovery point may not move from {} to {}",
                            record.recovery_point, next
                        ),
                    ));
                }
                Ok(record.clone().advanced(*next, now))
            }
            Self::Finalize { status, body } => Ok(record.clone().finalized(
                *status,
                canonical_bytes(body),
                now,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical JSON bytes
// ---------------------------------------------------------------------------

/// Serialize a JSON value to canonical bytes: object keys sorted
/// recursively, arrays in order, compact encoding.
pub fn canonical_bytes(value: &serde_json::Value) -> Vec<u8> {
    let canonical = canonicalize(value);
    #[expect(
        clippy::unwrap_used,
        reason = "serde_json::Value serialization to JSON bytes is infallible"
    )]
    let bytes = serde_json::to_vec(&canonical).unwrap();
    bytes
}

/// Recursively sort object keys for a canonical representation.
fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by_key(|(key, _)| *key);
            let canonical_map: serde_json::Map<String, serde_json::Value> = sorted
                .into_iter()
                .map(|(key, nested)| (key.clone(), canonicalize(nested)))
                .collect();
            serde_json::Value::Object(canonical_map)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize).collect())
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn record() -> IdempotencyRecord {
        let now = Utc::now();
        IdempotencyRecord {
            id: 7,
            created_at: now,
            key: IdempotencyKey::new("ride-key-1").expect("valid key"),
            last_run_at: now,
            locked_at: None,
            request_method: "POST".to_owned(),
            request_params: canonical_bytes(&json!({"user_id": 1337})),
            request_path: "/rides".to_owned(),
            response_code: None,
            response_body: None,
            recovery_point: RecoveryPoint::Started,
            user_id: 1337,
        }
    }

    // IdempotencyKey

    #[rstest]
    #[case("")]
    #[case("x")]
    fn key_rejects_short_input(#[case] input: &str) {
        assert_eq!(
            IdempotencyKey::new(input),
            Err(IdempotencyKeyValidationError::TooShort)
        );
    }

    #[rstest]
    #[case("ok")]
    #[case("a-much-longer-client-key")]
    fn key_accepts_two_or_more_characters(#[case] input: &str) {
        let key = IdempotencyKey::new(input).expect("valid key");
        assert_eq!(key.as_str(), input);
    }

    // RecoveryPoint

    #[rstest]
    fn recovery_points_are_totally_ordered() {
        assert!(RecoveryPoint::Started < RecoveryPoint::RideCreated);
        assert!(RecoveryPoint::RideCreated < RecoveryPoint::ChargeCreated);
        assert!(RecoveryPoint::ChargeCreated < RecoveryPoint::Finished);
    }

    #[rstest]
    #[case(RecoveryPoint::Started, "started")]
    #[case(RecoveryPoint::RideCreated, "ride_created")]
    #[case(RecoveryPoint::ChargeCreated, "charge_created")]
    #[case(RecoveryPoint::Finished, "finished")]
    fn recovery_point_round_trips_through_strings(
        #[case] point: RecoveryPoint,
        #[case] stored: &str,
    ) {
        assert_eq!(point.as_str(), stored);
        assert_eq!(stored.parse::<RecoveryPoint>(), Ok(point));
    }

    #[rstest]
    fn unknown_recovery_point_fails_to_parse() {
        let err = "charging".parse::<RecoveryPoint>().expect_err("unknown");
        assert!(err.to_string().contains("charging"));
    }

    // PhaseOutcome

    #[rstest]
    fn noop_touches_last_run_at_only(record: IdempotencyRecord) {
        let later = record.last_run_at + chrono::Duration::seconds(30);

        let updated = PhaseOutcome::Noop
            .applied_to(&record, later)
            .expect("noop applies");

        assert_eq!(updated.last_run_at, later);
        assert_eq!(updated.recovery_point, record.recovery_point);
        assert_eq!(updated.locked_at, record.locked_at);
        assert_eq!(updated.response_code, None);
    }

    #[rstest]
    fn advance_moves_forward_and_takes_the_lock(record: IdempotencyRecord) {
        let now = Utc::now();

        let updated = PhaseOutcome::Advance(RecoveryPoint::RideCreated)
            .applied_to(&record, now)
            .expect("forward advance applies");

        assert_eq!(updated.recovery_point, RecoveryPoint::RideCreated);
        assert_eq!(updated.locked_at, Some(now));
        assert_eq!(updated.last_run_at, now);
    }

    #[rstest]
    #[case(RecoveryPoint::RideCreated, RecoveryPoint::Started)]
    #[case(RecoveryPoint::RideCreated, RecoveryPoint::RideCreated)]
    #[case(RecoveryPoint::ChargeCreated, RecoveryPoint::RideCreated)]
    fn advance_rejects_backward_or_stationary_moves(
        mut record: IdempotencyRecord,
        #[case] current: RecoveryPoint,
        #[case] next: RecoveryPoint,
    ) {
        record.recovery_point = current;

        let err = PhaseOutcome::Advance(next)
            .applied_to(&record, Utc::now())
            .expect_err("non-monotonic advance rejected");
        assert_eq!(err.code(), ErrorCode::Internal);
    }

    #[rstest]
    fn advance_may_not_reach_the_terminal_point(record: IdempotencyRecord) {
        let err = PhaseOutcome::Advance(RecoveryPoint::Finished)
            .applied_to(&record, Utc::now())
            .expect_err("terminal advance rejected");
        assert_eq!(err.code(), ErrorCode::Internal);
    }

    #[rstest]
    fn finalize_stores_the_cached_response_and_releases_the_lock(mut record: IdempotencyRecord) {
        record.recovery_point = RecoveryPoint::ChargeCreated;
        record.locked_at = Some(Utc::now());

        let updated = PhaseOutcome::Finalize {
            status: 201,
            body: json!({"ride_id": 99}),
        }
        .applied_to(&record, Utc::now())
        .expect("finalize applies");

        assert_eq!(updated.recovery_point, RecoveryPoint::Finished);
        assert_eq!(updated.locked_at, None);
        let cached = updated.cached_response().expect("response cached");
        assert_eq!(cached.status, 201);
        assert_eq!(cached.body, br#"{"ride_id":99}"#.to_vec());
    }

    #[rstest]
    fn unfinished_record_has_no_cached_response(record: IdempotencyRecord) {
        assert_eq!(record.cached_response(), None);
    }

    // Canonical bytes

    #[rstest]
    fn canonical_bytes_ignore_key_order() {
        let a = json!({"z": 1, "a": 2, "m": {"y": 3, "b": 4}});
        let b = json!({"a": 2, "m": {"b": 4, "y": 3}, "z": 1});
        assert_eq!(canonical_bytes(&a), canonical_bytes(&b));
    }

    #[rstest]
    fn canonical_bytes_preserve_array_order() {
        let a = json!({"arr": [1, 2, 3]});
        let b = json!({"arr": [3, 2, 1]});
        assert_ne!(canonical_bytes(&a), canonical_bytes(&b));
    }

    #[rstest]
    fn canonical_bytes_are_compact() {
        let value = json!({"origin": {"lat": 0.0, "long": 0.0}});
        let bytes = canonical_bytes(&value);
        assert!(!bytes.contains(&b' '));
    }
}
