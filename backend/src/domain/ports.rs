//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driving and
//! driven adapters. Each trait exposes strongly typed errors so adapters
//! map their failures into predictable variants instead of returning
//! `anyhow::Result`. Fixture implementations let HTTP handlers be tested
//! without a database or a payment provider.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::idempotency::{canonical_bytes, CachedResponse, IdempotencyKey};
use super::rides::Coordinate;
use super::Error;

/// Flat fare charged per ride, in the smallest currency unit.
pub const RIDE_FARE_CENTS: i64 = 2000;
/// Currency of [`RIDE_FARE_CENTS`].
pub const RIDE_FARE_CURRENCY: &str = "usd";

// ---------------------------------------------------------------------------
// Reservation service (driving port)
// ---------------------------------------------------------------------------

/// Validated input to the reservation workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationRequest {
    /// Riding user.
    pub user_id: i64,
    /// Client-supplied idempotency key.
    pub key: IdempotencyKey,
    /// HTTP method captured for the request fingerprint.
    pub method: String,
    /// Request path captured for the request fingerprint.
    pub path: String,
    /// Pickup point.
    pub origin: Coordinate,
    /// Drop-off point.
    pub target: Coordinate,
    /// Remote address, recorded on audit entries.
    pub origin_ip: String,
}

impl ReservationRequest {
    /// The decoded parameters as a JSON value, used for both the stored
    /// request fingerprint and audit payloads.
    pub fn params_value(&self) -> serde_json::Value {
        json!({
            "user_id": self.user_id,
            "origin": self.origin,
            "target": self.target,
        })
    }

    /// Canonical byte representation of the decoded parameters.
    pub fn canonical_params(&self) -> Vec<u8> {
        canonical_bytes(&self.params_value())
    }
}

/// Driving port executed by the `POST /rides` handler.
///
/// Implementations must converge any number of retries of the same
/// `(user, key)` pair to a single workflow execution and identical
/// responses.
#[async_trait]
pub trait ReservationService: Send + Sync {
    /// Run the reservation workflow to completion and return the cached
    /// response to serve.
    async fn reserve(&self, request: ReservationRequest) -> Result<CachedResponse, Error>;
}

/// Fixture reservation service for handler tests and database-less runs.
///
/// Always "reserves" the same ride, which also makes it a convenient
/// stand-in for replay behavior: every call returns identical bytes.
pub struct FixtureReservationService;

#[async_trait]
impl ReservationService for FixtureReservationService {
    async fn reserve(&self, request: ReservationRequest) -> Result<CachedResponse, Error> {
        debug!(user_id = request.user_id, key = %request.key, "fixture reservation");
        Ok(CachedResponse {
            status: 201,
            body: canonical_bytes(&json!({"ride_id": 1})),
        })
    }
}

// ---------------------------------------------------------------------------
// Payment provider (driven port)
// ---------------------------------------------------------------------------

/// Charge creation request forwarded to the payment provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    /// Provider-side customer identifier.
    pub customer_id: String,
    /// Amount in the smallest currency unit.
    pub amount_cents: i64,
    /// ISO currency code.
    pub currency: String,
    /// Email the provider sends the receipt to.
    pub receipt_email: String,
    /// Forwarded as the provider's idempotency key so provider-side
    /// retries deduplicate alongside ours.
    pub idempotency_key: IdempotencyKey,
}

/// Errors surfaced by payment provider adapters.
#[derive(Debug, Error)]
pub enum PaymentProviderError {
    /// The provider answered with a non-success status.
    #[error("payment provider rejected the charge ({status}): {message}")]
    Rejected {
        /// Provider HTTP status.
        status: u16,
        /// Provider error message.
        message: String,
    },
    /// The provider could not be reached.
    #[error("payment provider unreachable: {message}")]
    Transport { message: String },
    /// The provider's response could not be decoded.
    #[error("payment provider response unreadable: {message}")]
    Decode { message: String },
}

impl PaymentProviderError {
    /// Helper for non-success provider responses.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Helper for transport-level failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Helper for undecodable responses.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

impl From<PaymentProviderError> for Error {
    fn from(err: PaymentProviderError) -> Self {
        Error::external_failure("payment provider call failed").with_cause(err)
    }
}

/// Driven port for the external payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a charge and return the provider's charge id.
    ///
    /// A provider-side replay of a previously created charge (same
    /// idempotency key) is a plain success carrying the original id.
    async fn create_charge(&self, charge: &ChargeRequest) -> Result<String, PaymentProviderError>;
}

/// Fixture payment provider that accepts every charge.
///
/// The returned charge id is derived from the idempotency key, so a
/// replayed charge yields the same id the way a real provider would.
pub struct FixturePaymentProvider;

#[async_trait]
impl PaymentProvider for FixturePaymentProvider {
    async fn create_charge(&self, charge: &ChargeRequest) -> Result<String, PaymentProviderError> {
        debug!(customer_id = %charge.customer_id, "fixture charge created");
        Ok(format!("ch_test_{}", charge.idempotency_key))
    }
}

// ---------------------------------------------------------------------------
// Receipt queue (driven port)
// ---------------------------------------------------------------------------

/// Receipt send staged for out-of-process delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptJob {
    /// User to mail the receipt to.
    pub user_id: i64,
    /// Ride the receipt covers.
    pub ride_id: i64,
    /// Charged amount in the smallest currency unit.
    pub amount_cents: i64,
    /// ISO currency code.
    pub currency: String,
}

/// Errors surfaced by receipt queue adapters.
#[derive(Debug, Error)]
pub enum JobDispatchError {
    /// Queue infrastructure is unavailable.
    #[error("receipt queue unavailable: {message}")]
    Unavailable { message: String },
}

impl JobDispatchError {
    /// Helper for queue outages.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

impl From<JobDispatchError> for Error {
    fn from(err: JobDispatchError) -> Self {
        Error::external_failure("staging the receipt job failed").with_cause(err)
    }
}

/// Driven port for staging receipt sends.
#[async_trait]
pub trait ReceiptQueue: Send + Sync {
    /// Stage a receipt job for later delivery.
    async fn stage(&self, job: ReceiptJob) -> Result<(), JobDispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::{fixture, rstest};

    #[fixture]
    fn request() -> ReservationRequest {
        ReservationRequest {
            user_id: 1337,
            key: IdempotencyKey::new("testKey").expect("valid key"),
            method: "POST".to_owned(),
            path: "/rides".to_owned(),
            origin: Coordinate { lat: 0.0, long: 0.0 },
            target: Coordinate {
                lat: 37.33,
                long: -122.03,
            },
            origin_ip: "203.0.113.7".to_owned(),
        }
    }

    #[rstest]
    fn canonical_params_sort_object_keys(request: ReservationRequest) {
        let bytes = request.canonical_params();
        let text = String::from_utf8(bytes).expect("utf8 json");

        let origin = text.find("\"origin\"").expect("origin present");
        let target = text.find("\"target\"").expect("target present");
        let user = text.find("\"user_id\"").expect("user_id present");
        assert!(origin < target && target < user);
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_reservation_replays_identical_bytes(request: ReservationRequest) {
        let service = FixtureReservationService;

        let first = service.reserve(request.clone()).await.expect("reserve");
        let second = service.reserve(request).await.expect("reserve again");

        assert_eq!(first, second);
        assert_eq!(first.status, 201);
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_provider_returns_stable_charge_ids(request: ReservationRequest) {
        let provider = FixturePaymentProvider;
        let charge = ChargeRequest {
            customer_id: "cus_123".to_owned(),
            amount_cents: RIDE_FARE_CENTS,
            currency: RIDE_FARE_CURRENCY.to_owned(),
            receipt_email: "rider@example.com".to_owned(),
            idempotency_key: request.key,
        };

        let first = provider.create_charge(&charge).await.expect("charge");
        let second = provider.create_charge(&charge).await.expect("charge again");
        assert_eq!(first, second);
        assert!(first.starts_with("ch_test_"));
    }

    #[rstest]
    fn provider_errors_map_to_external_failure() {
        let err = Error::from(PaymentProviderError::rejected(402, "card declined"));
        assert_eq!(err.code(), ErrorCode::ExternalFailure);
        let source = std::error::Error::source(&err).expect("cause kept");
        assert!(source.to_string().contains("card declined"));
    }
}
