//! Request-level error taxonomy for the admission controller.

use crate::dates::DateError;

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    /// Client fault (bad or past date, missing field). Never retried.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Business outcome, not a fault: not enough seats left.
    #[error("insufficient capacity ({remaining} seats remaining)")]
    CapacityRejected { remaining: u32 },
    /// Referenced reservation or experience does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Transient infrastructure fault, surfaced retryable after bounded
    /// retries inside the ledger.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Compensation itself failed: seats are withheld with no matching
    /// reservation until an operator reconciles.
    #[error("capacity inconsistency: {0}")]
    Inconsistency(String),
}

impl AdmissionError {
    /// Whether the caller may safely resubmit (with the same idempotency key).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Inconsistency(_))
    }
}

impl From<DateError> for AdmissionError {
    fn from(err: DateError) -> Self {
        Self::Validation(err.to_string())
    }
}
