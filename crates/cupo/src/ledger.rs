//! Capacity ledger protocol.
//!
//! All capacity movement goes through the capacity store's conditional
//! adjust primitive, the single serialization point per experience. A
//! plain read-compute-write sequence is never used: it races between
//! concurrent callers across two round trips.
//!
//! Transient store failures are retried with exponential backoff under a
//! single per-request token, so a retry after a lost response cannot apply
//! the same adjustment twice. Precondition failures (insufficient seats)
//! are a business outcome and are returned without retrying.

use std::sync::Arc;
use std::time::Duration;

use crate::stores::{CapacityAdjust, CapacityStore, StoreError};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(50),
        }
    }
}

/// Outcome of a reservation attempt against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Seats granted; `remaining` is the post-decrement value.
    Granted { remaining: u32 },
    /// Not enough seats; `remaining` is the store's reported value.
    Rejected { remaining: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("experience not found")]
    UnknownExperience,
    #[error("capacity store unavailable: {0}")]
    Unavailable(String),
    #[error("capacity store rejected adjustment: {0}")]
    Protocol(String),
}

/// Reserves and releases seats against the capacity store.
pub struct CapacityLedger {
    store: Arc<dyn CapacityStore>,
    retry: RetryPolicy,
}

impl CapacityLedger {
    pub fn new(store: Arc<dyn CapacityStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Try to reserve `seats` for an experience, all-or-nothing.
    pub async fn try_reserve(
        &self,
        experience_id: &str,
        seats: u32,
    ) -> Result<ReserveOutcome, LedgerError> {
        let adjust = CapacityAdjust::reserve(seats);
        match self.adjust_with_retry(experience_id, &adjust).await {
            Ok(remaining) => Ok(ReserveOutcome::Granted { remaining }),
            Err(StoreError::PreconditionFailed { remaining }) => {
                Ok(ReserveOutcome::Rejected { remaining })
            }
            Err(StoreError::NotFound) => Err(LedgerError::UnknownExperience),
            Err(StoreError::Unavailable(msg)) => Err(LedgerError::Unavailable(msg)),
            Err(StoreError::Rejected(msg)) => Err(LedgerError::Protocol(msg)),
        }
    }

    /// Release `seats` back to an experience (compensation and cancellation).
    ///
    /// The store caps the result at `capacity_total`. Releasing against a
    /// deleted experience is tolerated: the seats have nowhere to go.
    pub async fn release(&self, experience_id: &str, seats: u32) -> Result<(), LedgerError> {
        let adjust = CapacityAdjust::release(seats);
        match self.adjust_with_retry(experience_id, &adjust).await {
            Ok(remaining) => {
                tracing::debug!(%experience_id, seats, remaining, "capacity released");
                Ok(())
            }
            Err(StoreError::NotFound) => {
                tracing::warn!(%experience_id, seats, "released capacity for a missing experience");
                Ok(())
            }
            Err(StoreError::PreconditionFailed { .. }) => Err(LedgerError::Protocol(
                "store rejected an unconditional release".to_string(),
            )),
            Err(StoreError::Unavailable(msg)) => Err(LedgerError::Unavailable(msg)),
            Err(StoreError::Rejected(msg)) => Err(LedgerError::Protocol(msg)),
        }
    }

    async fn adjust_with_retry(
        &self,
        experience_id: &str,
        adjust: &CapacityAdjust,
    ) -> Result<u32, StoreError> {
        let mut attempt = 0;
        loop {
            match self.store.adjust_capacity(experience_id, adjust).await {
                Err(StoreError::Unavailable(msg)) => {
                    attempt += 1;
                    if attempt > self.retry.max_retries {
                        tracing::error!(
                            %experience_id,
                            attempts = attempt,
                            error = %msg,
                            "capacity adjustment failed after max retries"
                        );
                        return Err(StoreError::Unavailable(msg));
                    }
                    let backoff = self.retry.backoff_base * (1 << attempt.min(10));
                    tracing::warn!(
                        %experience_id,
                        attempt,
                        backoff_ms = backoff.as_millis(),
                        error = %msg,
                        "capacity store unavailable, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }
}
