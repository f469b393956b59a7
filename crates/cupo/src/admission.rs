//! Admission controller: the reservation request lifecycle.
//!
//! Each create request walks `Validating -> ReservingCapacity ->
//! Persisting` and ends `Confirmed`, `Rejected` or `Failed`. The scarce
//! resource is always taken first (the capacity decrement), then the
//! durable record is written; a failed write releases the seats again.
//! That ordering guarantees capacity is never held by a reservation that
//! does not durably exist, at the cost of a brief window where reserved
//! seats are not yet visible as a reservation.
//!
//! The controller is stateless between requests and safe to replicate:
//! cross-process correctness rests entirely on the capacity store's
//! conditional-adjust primitive, not on any in-process lock.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::dates;
use crate::error::AdmissionError;
use crate::health::HealthSnapshot;
use crate::ledger::{CapacityLedger, LedgerError, ReserveOutcome};
use crate::reconcile::ReconciliationLog;
use crate::reservation::{AdmissionState, NewReservation, Reservation};
use crate::stores::{ReservationStore, StoreError};
use crate::version::VersionInfo;

/// A booking request as received from the client.
#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub experience_id: String,
    pub user_id: String,
    pub date: String,
    pub party_size: u32,
    pub notes: String,
    pub idempotency_key: Option<String>,
}

pub struct AdmissionController {
    ledger: CapacityLedger,
    reservations: Arc<dyn ReservationStore>,
    reconciliation: Arc<ReconciliationLog>,
    /// In-process fence for concurrent submissions of the same
    /// (requester, idempotency key) pair. Cross-replica duplicates are
    /// handled by the store lookup; this only closes the local race
    /// between lookup and persist.
    in_flight: DashMap<(String, String), ()>,
    version: VersionInfo,
}

/// Removes the in-flight claim when the request finishes, however it ends.
struct InFlightGuard<'a> {
    map: &'a DashMap<(String, String), ()>,
    key: Option<(String, String)>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.map.remove(&key);
        }
    }
}

impl AdmissionController {
    pub fn new(ledger: CapacityLedger, reservations: Arc<dyn ReservationStore>) -> Self {
        Self {
            ledger,
            reservations,
            reconciliation: Arc::new(ReconciliationLog::new()),
            in_flight: DashMap::new(),
            version: VersionInfo::new(),
        }
    }

    pub fn reconciliation(&self) -> &ReconciliationLog {
        &self.reconciliation
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot::new(self.reconciliation.pending(), self.version.clone())
    }

    /// Admit a booking request: validate, reserve capacity, persist.
    pub async fn create_reservation(
        &self,
        request: CreateReservation,
    ) -> Result<Reservation, AdmissionError> {
        let date = Self::validate(&request)?;

        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(existing) = self.find_existing(&request.user_id, key).await? {
                tracing::info!(
                    target: "cupo::admission",
                    reservation_id = %existing.id,
                    idempotency_key = %key,
                    "returning existing reservation for idempotent retry"
                );
                return Ok(existing);
            }
        }

        let Some(_guard) = self.claim_in_flight(&request) else {
            // The twin request will persist (or fail) shortly; resubmitting
            // with the same key then finds its record.
            return Err(AdmissionError::Unavailable(
                "an identical request is already in flight".to_string(),
            ));
        };

        tracing::debug!(
            target: "cupo::admission",
            experience_id = %request.experience_id,
            party_size = request.party_size,
            phase = AdmissionState::ReservingCapacity.as_str(),
            "reserving capacity"
        );
        let remaining = match self
            .ledger
            .try_reserve(&request.experience_id, request.party_size)
            .await
            .map_err(ledger_error)?
        {
            ReserveOutcome::Granted { remaining } => remaining,
            ReserveOutcome::Rejected { remaining } => {
                tracing::info!(
                    target: "cupo::admission",
                    experience_id = %request.experience_id,
                    party_size = request.party_size,
                    remaining,
                    phase = AdmissionState::Rejected.as_str(),
                    "admission rejected: insufficient capacity"
                );
                return Err(AdmissionError::CapacityRejected { remaining });
            }
        };

        tracing::debug!(
            target: "cupo::admission",
            experience_id = %request.experience_id,
            phase = AdmissionState::Persisting.as_str(),
            "persisting reservation"
        );
        let record = NewReservation {
            experience_id: request.experience_id.clone(),
            user_id: request.user_id.clone(),
            date,
            party_size: request.party_size,
            notes: request.notes.clone(),
            idempotency_key: request.idempotency_key.clone(),
        };
        match self.reservations.create(&record).await {
            Ok(stored) => {
                tracing::info!(
                    target: "cupo::admission",
                    reservation_id = %stored.id,
                    experience_id = %stored.experience_id,
                    party_size = stored.party_size,
                    remaining,
                    phase = AdmissionState::Confirmed.as_str(),
                    "reservation confirmed"
                );
                Ok(stored)
            }
            Err(err) => self.compensate(&request, err).await,
        }
    }

    /// One-way attended transition. Does not touch capacity.
    pub async fn mark_attended(&self, reservation_id: &str) -> Result<Reservation, AdmissionError> {
        match self.reservations.set_attended(reservation_id).await {
            Ok(updated) => {
                tracing::info!(target: "cupo::admission", reservation_id, "reservation marked attended");
                Ok(updated)
            }
            Err(StoreError::NotFound) => Err(AdmissionError::NotFound("reservation")),
            Err(err) => Err(store_unavailable(err)),
        }
    }

    /// Remove a reservation and release its seats back to the experience.
    pub async fn cancel_reservation(
        &self,
        reservation_id: &str,
    ) -> Result<Reservation, AdmissionError> {
        let reservation = match self.reservations.get(reservation_id).await {
            Ok(reservation) => reservation,
            Err(StoreError::NotFound) => return Err(AdmissionError::NotFound("reservation")),
            Err(err) => return Err(store_unavailable(err)),
        };
        match self.reservations.delete(reservation_id).await {
            Ok(()) => {}
            // Lost the race against another cancel.
            Err(StoreError::NotFound) => return Err(AdmissionError::NotFound("reservation")),
            Err(err) => return Err(store_unavailable(err)),
        }
        match self
            .ledger
            .release(&reservation.experience_id, reservation.party_size)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    target: "cupo::admission",
                    reservation_id,
                    experience_id = %reservation.experience_id,
                    party_size = reservation.party_size,
                    "reservation canceled, capacity released"
                );
            }
            Err(err) => {
                // The record is already gone; failing the request would not
                // bring it back. Queue the stuck seats for the operator.
                self.reconciliation.record(
                    &reservation.experience_id,
                    reservation.party_size,
                    format!("release after cancellation failed: {err}"),
                );
            }
        }
        Ok(reservation)
    }

    pub async fn get_reservation(&self, reservation_id: &str) -> Result<Reservation, AdmissionError> {
        match self.reservations.get(reservation_id).await {
            Ok(reservation) => Ok(reservation),
            Err(StoreError::NotFound) => Err(AdmissionError::NotFound("reservation")),
            Err(err) => Err(store_unavailable(err)),
        }
    }

    pub async fn list_reservations(&self, user_id: &str) -> Result<Vec<Reservation>, AdmissionError> {
        self.reservations
            .list_by_user(user_id)
            .await
            .map_err(store_unavailable)
    }

    fn validate(request: &CreateReservation) -> Result<chrono::NaiveDate, AdmissionError> {
        if request.experience_id.is_empty() {
            return Err(AdmissionError::Validation(
                "experience_id is required".to_string(),
            ));
        }
        if request.user_id.is_empty() {
            return Err(AdmissionError::Validation("user_id is required".to_string()));
        }
        if request.party_size == 0 {
            return Err(AdmissionError::Validation(
                "party_size must be at least 1".to_string(),
            ));
        }
        Ok(dates::validate_request_date(&request.date)?)
    }

    async fn find_existing(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Reservation>, AdmissionError> {
        self.reservations
            .find_by_idempotency_key(user_id, key)
            .await
            .map_err(store_unavailable)
    }

    fn claim_in_flight(&self, request: &CreateReservation) -> Option<InFlightGuard<'_>> {
        let Some(key) = request.idempotency_key.clone() else {
            return Some(InFlightGuard {
                map: &self.in_flight,
                key: None,
            });
        };
        let claim = (request.user_id.clone(), key);
        match self.in_flight.entry(claim.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Some(InFlightGuard {
                    map: &self.in_flight,
                    key: Some(claim),
                })
            }
        }
    }

    async fn compensate(
        &self,
        request: &CreateReservation,
        persist_err: StoreError,
    ) -> Result<Reservation, AdmissionError> {
        tracing::warn!(
            target: "cupo::admission",
            experience_id = %request.experience_id,
            party_size = request.party_size,
            error = %persist_err,
            phase = AdmissionState::Failed.as_str(),
            "reservation persist failed, releasing reserved capacity"
        );
        if let Err(release_err) = self
            .ledger
            .release(&request.experience_id, request.party_size)
            .await
        {
            self.reconciliation.record(
                &request.experience_id,
                request.party_size,
                format!("release after failed persist: {release_err}"),
            );
            return Err(AdmissionError::Inconsistency(format!(
                "reservation not persisted and capacity not released: {release_err}"
            )));
        }
        Err(AdmissionError::Unavailable(format!(
            "reservation store: {persist_err}"
        )))
    }
}

fn ledger_error(err: LedgerError) -> AdmissionError {
    match err {
        LedgerError::UnknownExperience => AdmissionError::NotFound("experience"),
        LedgerError::Unavailable(msg) | LedgerError::Protocol(msg) => {
            AdmissionError::Unavailable(msg)
        }
    }
}

fn store_unavailable(err: StoreError) -> AdmissionError {
    AdmissionError::Unavailable(format!("reservation store: {err}"))
}
