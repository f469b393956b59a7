//! In-memory store doubles for exercising the admission pipeline without a
//! network.
//!
//! The capacity double serializes conditional adjusts behind one mutex and
//! deduplicates tokens, exactly the contract the real store must provide.
//! Failure injection is per call index so tests can break specific steps of
//! a request (the reserve, the release, the persist).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::admission::AdmissionController;
use crate::experience::Experience;
use crate::ledger::{CapacityLedger, RetryPolicy};
use crate::reservation::{NewReservation, Reservation};
use crate::stores::{CapacityAdjust, CapacityStore, ReservationStore, StoreError};

pub fn test_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        backoff_base: Duration::from_millis(1),
    }
}

/// Build a controller over the in-memory doubles with a fast retry policy.
pub fn controller(
    capacity: &Arc<InMemoryCapacityStore>,
    reservations: &Arc<InMemoryReservationStore>,
) -> AdmissionController {
    let ledger = CapacityLedger::new(Arc::clone(capacity) as Arc<dyn CapacityStore>, test_retry());
    AdmissionController::new(ledger, Arc::clone(reservations) as Arc<dyn ReservationStore>)
}

/// Tomorrow in ISO format: always a valid reservation date.
pub fn tomorrow() -> String {
    (chrono::Utc::now().date_naive() + chrono::Days::new(1))
        .format("%Y-%m-%d")
        .to_string()
}

struct ExperienceRecord {
    experience: Experience,
    /// Token -> remaining value returned when it was applied.
    applied: HashMap<Uuid, u32>,
}

#[derive(Default)]
pub struct InMemoryCapacityStore {
    experiences: Mutex<HashMap<String, ExperienceRecord>>,
    adjust_counter: AtomicUsize,
    fail_calls: Mutex<HashSet<usize>>,
    lose_response_calls: Mutex<HashSet<usize>>,
}

impl InMemoryCapacityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_experience(self, experience_id: &str, capacity: u32) -> Self {
        self.insert_experience(experience_id, capacity);
        self
    }

    pub fn insert_experience(&self, experience_id: &str, capacity: u32) {
        let experience = Experience {
            id: experience_id.to_string(),
            title: format!("experience {experience_id}"),
            description: String::new(),
            price: 10.0,
            guide: "guide".to_string(),
            capacity_total: capacity,
            capacity_remaining: capacity,
        };
        self.experiences.lock().unwrap().insert(
            experience_id.to_string(),
            ExperienceRecord {
                experience,
                applied: HashMap::new(),
            },
        );
    }

    pub fn remove_experience(&self, experience_id: &str) {
        self.experiences.lock().unwrap().remove(experience_id);
    }

    pub fn remaining(&self, experience_id: &str) -> u32 {
        self.experiences.lock().unwrap()[experience_id]
            .experience
            .capacity_remaining
    }

    pub fn set_remaining(&self, experience_id: &str, remaining: u32) {
        self.experiences
            .lock()
            .unwrap()
            .get_mut(experience_id)
            .unwrap()
            .experience
            .capacity_remaining = remaining;
    }

    /// Total conditional adjusts attempted so far.
    pub fn adjust_calls(&self) -> usize {
        self.adjust_counter.load(Ordering::SeqCst)
    }

    /// Fail the given (1-based) adjust calls before applying anything.
    pub fn fail_on_calls(&self, calls: &[usize]) {
        self.fail_calls.lock().unwrap().extend(calls.iter().copied());
    }

    /// Apply the given (1-based) adjust calls but report a transport
    /// failure, as if the response was lost on the wire.
    pub fn lose_response_on_calls(&self, calls: &[usize]) {
        self.lose_response_calls
            .lock()
            .unwrap()
            .extend(calls.iter().copied());
    }
}

#[async_trait]
impl CapacityStore for InMemoryCapacityStore {
    async fn experience(&self, experience_id: &str) -> Result<Experience, StoreError> {
        self.experiences
            .lock()
            .unwrap()
            .get(experience_id)
            .map(|record| record.experience.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn adjust_capacity(
        &self,
        experience_id: &str,
        adjust: &CapacityAdjust,
    ) -> Result<u32, StoreError> {
        let call = self.adjust_counter.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_calls.lock().unwrap().contains(&call) {
            return Err(StoreError::Unavailable(
                "injected capacity store outage".to_string(),
            ));
        }
        let lose_response = self.lose_response_calls.lock().unwrap().contains(&call);

        let mut experiences = self.experiences.lock().unwrap();
        let record = experiences
            .get_mut(experience_id)
            .ok_or(StoreError::NotFound)?;

        if let Some(remaining) = record.applied.get(&adjust.token) {
            return Ok(*remaining);
        }

        let current = record.experience.capacity_remaining;
        if current < adjust.min_remaining {
            return Err(StoreError::PreconditionFailed { remaining: current });
        }
        let total = i64::from(record.experience.capacity_total);
        let next = (i64::from(current) + adjust.delta).clamp(0, total) as u32;
        record.experience.capacity_remaining = next;
        record.applied.insert(adjust.token, next);

        if lose_response {
            return Err(StoreError::Unavailable(
                "injected response loss after apply".to_string(),
            ));
        }
        Ok(next)
    }
}

#[derive(Default)]
pub struct InMemoryReservationStore {
    reservations: Mutex<HashMap<String, Reservation>>,
    fail_creates: AtomicUsize,
    next_id: AtomicUsize,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` create calls with a transient error.
    pub fn fail_next_creates(&self, n: usize) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<Reservation> {
        self.reservations.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn create(&self, reservation: &NewReservation) -> Result<Reservation, StoreError> {
        if self
            .fail_creates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable(
                "injected reservation store outage".to_string(),
            ));
        }
        let id = format!("res-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let stored = Reservation {
            id: id.clone(),
            experience_id: reservation.experience_id.clone(),
            user_id: reservation.user_id.clone(),
            date: reservation.date,
            party_size: reservation.party_size,
            notes: reservation.notes.clone(),
            attended: false,
            idempotency_key: reservation.idempotency_key.clone(),
        };
        self.reservations
            .lock()
            .unwrap()
            .insert(id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, reservation_id: &str) -> Result<Reservation, StoreError> {
        self.reservations
            .lock()
            .unwrap()
            .get(reservation_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn set_attended(&self, reservation_id: &str) -> Result<Reservation, StoreError> {
        let mut reservations = self.reservations.lock().unwrap();
        let reservation = reservations
            .get_mut(reservation_id)
            .ok_or(StoreError::NotFound)?;
        reservation.attended = true;
        Ok(reservation.clone())
    }

    async fn delete(&self, reservation_id: &str) -> Result<(), StoreError> {
        self.reservations
            .lock()
            .unwrap()
            .remove(reservation_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Reservation>, StoreError> {
        Ok(self
            .reservations
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .reservations
            .lock()
            .unwrap()
            .values()
            .find(|r| r.user_id == user_id && r.idempotency_key.as_deref() == Some(key))
            .cloned())
    }
}
