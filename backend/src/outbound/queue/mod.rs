//! Stub receipt queue adapter.
//!
//! Receipt delivery is out-of-process work; this service only stages it.
//! Until a broker-backed adapter exists, staging logs the job and
//! discards it, which keeps the finalize phase's contract intact without
//! pretending delivery happened silently.

use std::sync::Once;

use async_trait::async_trait;

use crate::domain::ports::{JobDispatchError, ReceiptJob, ReceiptQueue};

/// Guard so the stub warning is logged once per process.
static STUB_WARNING_LOGGED: Once = Once::new();

/// Receipt queue that accepts every job and discards it.
#[derive(Debug, Clone, Default)]
pub struct StubReceiptQueue;

impl StubReceiptQueue {
    /// Create a new stub queue instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReceiptQueue for StubReceiptQueue {
    async fn stage(&self, job: ReceiptJob) -> Result<(), JobDispatchError> {
        STUB_WARNING_LOGGED.call_once(|| {
            tracing::warn!("StubReceiptQueue: receipt jobs are discarded (no broker configured)");
        });
        tracing::debug!(
            ride_id = job.ride_id,
            user_id = job.user_id,
            "receipt job staged"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn stub_queue_accepts_jobs() {
        let queue = StubReceiptQueue::new();
        let job = ReceiptJob {
            user_id: 1337,
            ride_id: 1,
            amount_cents: 2000,
            currency: "usd".to_owned(),
        };

        assert!(queue.stage(job).await.is_ok());
    }
}
