//! Diesel-backed reservation workflow driver.
//!
//! Implements the [`ReservationService`] port: resolve or insert the
//! idempotency key, then dispatch on its recovery point until the key is
//! finished, one atomic phase per checkpoint. A retry of a request that
//! died mid-workflow finds the persisted key and executes only the
//! remaining phases; completed phases are never re-run.

use std::sync::Arc;

use async_trait::async_trait;
use diesel_async::scoped_futures::ScopedFutureExt;
use tracing::{debug, info};

use crate::domain::audit::{
    AuditResource, NewAuditRecord, CHARGE_CREATED_ACTION, CREATE_RIDE_ACTION,
};
use crate::domain::ports::{
    ChargeRequest, PaymentProvider, ReceiptJob, ReceiptQueue, ReservationRequest,
    ReservationService, RIDE_FARE_CENTS, RIDE_FARE_CURRENCY,
};
use crate::domain::{
    CachedResponse, Error, IdempotencyRecord, NewIdempotencyKey, NewRide, PhaseOutcome,
    RecoveryPoint,
};

use super::atomic::atomic_phase;
use super::pool::DbPool;
use super::store_error::StoreError;
use super::{audit, keys, rides, users};

/// Resource discriminator recorded on ride audit entries.
const RIDE_RESOURCE: &str = "ride";

/// Diesel-backed implementation of the [`ReservationService`] port.
pub struct DieselReservationService {
    pool: DbPool,
    payment: Arc<dyn PaymentProvider>,
    receipts: Arc<dyn ReceiptQueue>,
}

impl DieselReservationService {
    /// Create a new driver over the given pool and effect adapters.
    pub fn new(
        pool: DbPool,
        payment: Arc<dyn PaymentProvider>,
        receipts: Arc<dyn ReceiptQueue>,
    ) -> Self {
        Self {
            pool,
            payment,
            receipts,
        }
    }

    /// First phase: bind the request to its durable key.
    ///
    /// Find by the unique `(user, key)` pair; on the typed not-found,
    /// insert (the insert itself starts the key at `started`). Any other
    /// error propagates.
    async fn resolve_key(
        &self,
        request: &ReservationRequest,
    ) -> Result<IdempotencyRecord, Error> {
        let user_id = request.user_id;
        let key = request.key.clone();
        let new_key = NewIdempotencyKey {
            key: request.key.clone(),
            request_method: request.method.clone(),
            request_params: request.canonical_params(),
            request_path: request.path.clone(),
            user_id,
        };

        atomic_phase(&self.pool, None, move |tx| {
            async move {
                match keys::find(tx, user_id, key.as_str()).await {
                    Ok(existing) => {
                        debug!(
                            key_id = existing.id,
                            recovery_point = %existing.recovery_point,
                            "replayed idempotency key"
                        );
                        Ok((existing, PhaseOutcome::Noop))
                    }
                    Err(StoreError::NotFound) => {
                        let inserted = keys::insert(tx, &new_key).await?;
                        debug!(key_id = inserted.id, "inserted idempotency key");
                        Ok((inserted, PhaseOutcome::Noop))
                    }
                    Err(other) => Err(other.into()),
                }
            }
            .scope_boxed()
        })
        .await
    }

    /// `started -> ride_created`: insert the ride and its audit record.
    async fn create_ride_phase(
        &self,
        key: &IdempotencyRecord,
        request: &ReservationRequest,
    ) -> Result<IdempotencyRecord, Error> {
        let phase_key = key.clone();
        let draft = NewRide {
            idempotency_key_id: Some(key.id),
            origin: request.origin,
            target: request.target,
            user_id: request.user_id,
        };
        let data = request.params_value();
        let origin_ip = request.origin_ip.clone();
        let user_id = request.user_id;

        atomic_phase(&self.pool, Some(key), move |tx| {
            async move {
                let ride = rides::insert(tx, &draft).await?;
                audit::insert(
                    tx,
                    &NewAuditRecord {
                        action: CREATE_RIDE_ACTION.to_owned(),
                        data,
                        origin_ip,
                        resource: AuditResource {
                            id: ride.id,
                            kind: RIDE_RESOURCE.to_owned(),
                        },
                        user_id,
                    },
                )
                .await?;

                Ok((phase_key, PhaseOutcome::Advance(RecoveryPoint::RideCreated)))
            }
            .scope_boxed()
        })
        .await
    }

    /// `ride_created -> charge_created`: charge the rider and write the
    /// charge id onto the ride.
    ///
    /// The key string doubles as the provider's idempotency key, so a
    /// crash between the provider call and our commit cannot double-charge:
    /// the provider replays the original charge on retry.
    async fn create_charge_phase(
        &self,
        key: &IdempotencyRecord,
        request: &ReservationRequest,
    ) -> Result<IdempotencyRecord, Error> {
        let phase_key = key.clone();
        let payment = Arc::clone(&self.payment);
        let data = request.params_value();
        let origin_ip = request.origin_ip.clone();
        let user_id = request.user_id;

        atomic_phase(&self.pool, Some(key), move |tx| {
            async move {
                let ride = rides::find_by_key(tx, phase_key.id).await?;
                let user = users::get(tx, user_id).await?;

                let charge_id = payment
                    .create_charge(&ChargeRequest {
                        customer_id: user.stripe_customer_id,
                        amount_cents: RIDE_FARE_CENTS,
                        currency: RIDE_FARE_CURRENCY.to_owned(),
                        receipt_email: user.email,
                        idempotency_key: phase_key.key.clone(),
                    })
                    .await?;

                let mut charged = ride;
                charged.stripe_charge_id = Some(charge_id);
                let charged = rides::update(tx, &charged).await?;

                audit::insert(
                    tx,
                    &NewAuditRecord {
                        action: CHARGE_CREATED_ACTION.to_owned(),
                        data,
                        origin_ip,
                        resource: AuditResource {
                            id: charged.id,
                            kind: RIDE_RESOURCE.to_owned(),
                        },
                        user_id,
                    },
                )
                .await?;

                Ok((
                    phase_key,
                    PhaseOutcome::Advance(RecoveryPoint::ChargeCreated),
                ))
            }
            .scope_boxed()
        })
        .await
    }

    /// `charge_created -> finished`: stage the receipt send and cache the
    /// response.
    async fn finalize_phase(&self, key: &IdempotencyRecord) -> Result<IdempotencyRecord, Error> {
        let phase_key = key.clone();
        let receipts = Arc::clone(&self.receipts);

        atomic_phase(&self.pool, Some(key), move |tx| {
            async move {
                let ride = rides::find_by_key(tx, phase_key.id).await?;

                receipts
                    .stage(ReceiptJob {
                        user_id: ride.user_id,
                        ride_id: ride.id,
                        amount_cents: RIDE_FARE_CENTS,
                        currency: RIDE_FARE_CURRENCY.to_owned(),
                    })
                    .await?;

                let body = serde_json::json!({ "ride_id": ride.id });
                Ok((phase_key, PhaseOutcome::Finalize { status: 201, body }))
            }
            .scope_boxed()
        })
        .await
    }
}

#[async_trait]
impl ReservationService for DieselReservationService {
    async fn reserve(&self, request: ReservationRequest) -> Result<CachedResponse, Error> {
        let mut key = self.resolve_key(&request).await?;

        // Ceiling on loop iterations: each phase must advance the key, so
        // more iterations than non-terminal states is a state-machine bug.
        let mut remaining_phases = RecoveryPoint::NON_TERMINAL;
        while !key.recovery_point.is_terminal() {
            if remaining_phases == 0 {
                return Err(Error::internal(
                    "recovery point did not reach the terminal state within the phase budget",
                ));
            }
            remaining_phases -= 1;

            key = match key.recovery_point {
                RecoveryPoint::Started => self.create_ride_phase(&key, &request).await?,
                RecoveryPoint::RideCreated => self.create_charge_phase(&key, &request).await?,
                RecoveryPoint::ChargeCreated => self.finalize_phase(&key).await?,
                RecoveryPoint::Finished => break,
            };
        }

        info!(
            key_id = key.id,
            user_id = key.user_id,
            "reservation converged"
        );

        key.cached_response()
            .ok_or_else(|| Error::internal("finished key is missing its cached response"))
    }
}
