//! Atomic-phase executor.
//!
//! One phase is the unit of atomicity for the whole workflow: the phase's
//! local side effects and the recovery-point change it reports land in one
//! serializable transaction, or none of them land. Serializable isolation
//! is what makes find-or-insert race-free without explicit row locks; two
//! concurrent retries serialize either on the unique key insert or on the
//! recovery-point update, and the loser surfaces as a retriable conflict.

use chrono::Utc;
use diesel_async::scoped_futures::{ScopedBoxFuture, ScopedFutureExt};
use diesel_async::AsyncPgConnection;
use tracing::warn;

use crate::domain::{Error, IdempotencyRecord, PhaseOutcome};

use super::keys;
use super::pool::DbPool;

/// Run one workflow phase inside a serializable transaction.
///
/// The phase closure resolves the key record it operates on and reports a
/// [`PhaseOutcome`]; the executor applies the outcome to that record via
/// the key store and commits. On failure the transaction is rolled back
/// and, when a `prior_key` was passed in and still appears locked, its
/// logical lock is cleared with a best-effort follow-up write so another
/// retry is not stranded behind a stale lock.
///
/// # Errors
///
/// Propagates the phase's error, an invalid outcome transition, or the
/// commit failure (a lost serializable conflict maps to
/// [`crate::domain::ErrorCode::ConflictRetry`]).
pub async fn atomic_phase<'a, F>(
    pool: &DbPool,
    prior_key: Option<&IdempotencyRecord>,
    phase: F,
) -> Result<IdempotencyRecord, Error>
where
    F: for<'r> FnOnce(
            &'r mut AsyncPgConnection,
        )
            -> ScopedBoxFuture<'a, 'r, Result<(IdempotencyRecord, PhaseOutcome), Error>>
        + Send
        + 'a,
{
    let mut conn = pool.get().await?;

    let committed = conn
        .build_transaction()
        .serializable()
        .run(|tx| {
            async move {
                let (record, outcome) = phase(tx).await?;
                let updated = outcome.applied_to(&record, Utc::now())?;
                Ok(keys::update(tx, &updated).await?)
            }
            .scope_boxed()
        })
        .await;

    match committed {
        Ok(updated) => Ok(updated),
        Err(err) => {
            release_lock_best_effort(&mut conn, prior_key).await;
            Err(err)
        }
    }
}

/// Clear the logical lock left on a key whose phase just failed.
///
/// Runs as its own short write after the rollback. Its failure is logged
/// and swallowed: the external sweeper reaps stale locks by age, so a
/// missed release only delays the next retry, it cannot corrupt state.
async fn release_lock_best_effort(
    conn: &mut AsyncPgConnection,
    prior_key: Option<&IdempotencyRecord>,
) {
    let Some(prior) = prior_key else {
        return;
    };
    if prior.locked_at.is_none() {
        return;
    }

    let unlocked = prior.clone().with_lock_cleared();
    if let Err(unlock_err) = keys::update(conn, &unlocked).await {
        warn!(
            key_id = prior.id,
            error = %unlock_err,
            "failed to release idempotency key lock"
        );
    }
}
