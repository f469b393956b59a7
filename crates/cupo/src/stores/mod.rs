//! Store abstractions for the two external collaborators.
//!
//! The capacity store owns the authoritative per-experience seat counters
//! and must expose an atomic conditional-adjust primitive; the reservation
//! store is a plain record collection. Both are trait seams so the ledger
//! and the admission controller can be exercised against in-memory doubles.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::experience::Experience;
use crate::reservation::{NewReservation, Reservation};

pub use http::{HttpCapacityStore, HttpReservationStore, build_client};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("precondition failed ({remaining} seats remaining)")]
    PreconditionFailed { remaining: u32 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected request: {0}")]
    Rejected(String),
}

/// A conditional capacity adjustment.
///
/// The store applies `delta` to `capacity_remaining` as a single indivisible
/// operation, only if `capacity_remaining >= min_remaining` beforehand, and
/// caps the result to `[0, capacity_total]`. A given `token` is applied at
/// most once: retrying the same adjustment after a lost response returns the
/// remaining value recorded for the token instead of applying it again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityAdjust {
    pub min_remaining: u32,
    pub delta: i64,
    pub token: Uuid,
}

impl CapacityAdjust {
    /// Reserve `seats`: decrement, rejected unless `seats` are still free.
    pub fn reserve(seats: u32) -> Self {
        Self {
            min_remaining: seats,
            delta: -i64::from(seats),
            token: Uuid::new_v4(),
        }
    }

    /// Release `seats` back: increment, never rejected on remaining.
    pub fn release(seats: u32) -> Self {
        Self {
            min_remaining: 0,
            delta: i64::from(seats),
            token: Uuid::new_v4(),
        }
    }
}

#[async_trait]
pub trait CapacityStore: Send + Sync {
    /// Fetch the experience document, including its capacity counters.
    async fn experience(&self, experience_id: &str) -> Result<Experience, StoreError>;

    /// Apply a conditional adjustment, returning the new remaining value.
    async fn adjust_capacity(
        &self,
        experience_id: &str,
        adjust: &CapacityAdjust,
    ) -> Result<u32, StoreError>;
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Persist a new reservation; the store assigns the identifier.
    async fn create(&self, reservation: &NewReservation) -> Result<Reservation, StoreError>;

    async fn get(&self, reservation_id: &str) -> Result<Reservation, StoreError>;

    /// One-way `attended` transition; returns the updated record.
    async fn set_attended(&self, reservation_id: &str) -> Result<Reservation, StoreError>;

    async fn delete(&self, reservation_id: &str) -> Result<(), StoreError>;

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Reservation>, StoreError>;

    /// Look up a prior reservation by requester and idempotency key.
    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Reservation>, StoreError>;
}
