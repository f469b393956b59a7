//! cupo: capacity-safe reservation admission for experience bookings.
//!
//! The admission controller guarantees that the seats granted across all
//! confirmed reservations for an experience never exceed its capacity
//! (`cupo`), even under concurrent callers and independently failing
//! stores. Capacity only ever moves through the capacity store's atomic
//! conditional-adjust primitive; a reservation persist failure is
//! compensated by releasing the reserved seats, and a failed compensation
//! lands on an operator-visible reconciliation queue.

pub mod admission;
pub mod config;
pub mod dates;
mod error;
pub mod experience;
mod health;
pub mod ledger;
pub mod reconcile;
pub mod reservation;
pub mod stores;
pub mod transport;
mod version;

#[cfg(test)]
pub mod testing;

pub use admission::{AdmissionController, CreateReservation};
pub use error::AdmissionError;
pub use health::{Health, HealthSnapshot};
pub use ledger::{CapacityLedger, LedgerError, ReserveOutcome, RetryPolicy};
pub use version::{CUPO_VERSION, VersionInfo};
