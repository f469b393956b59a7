//! Reconciliation queue for failed capacity compensations.
//!
//! A failed compensation is the one failure mode that can leave seats
//! withheld with no matching reservation. It is never swallowed: every
//! occurrence is logged at error level under `cupo::reconcile` and queued
//! here for an operator to settle against the capacity store.

use std::sync::Mutex;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationRecord {
    pub experience_id: String,
    pub seats: u32,
    pub reason: String,
    pub recorded_at: String,
}

#[derive(Debug, Default)]
pub struct ReconciliationLog {
    records: Mutex<Vec<ReconciliationRecord>>,
}

impl ReconciliationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, experience_id: &str, seats: u32, reason: impl Into<String>) {
        let record = ReconciliationRecord {
            experience_id: experience_id.to_string(),
            seats,
            reason: reason.into(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
        };
        tracing::error!(
            target: "cupo::reconcile",
            experience_id = %record.experience_id,
            seats = record.seats,
            reason = %record.reason,
            "capacity compensation failed; operator reconciliation required"
        );
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }

    /// Number of unresolved records.
    pub fn pending(&self) -> usize {
        match self.records.lock() {
            Ok(records) => records.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Take all pending records, leaving the queue empty.
    pub fn drain(&self) -> Vec<ReconciliationRecord> {
        match self.records.lock() {
            Ok(mut records) => std::mem::take(&mut *records),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_and_drain() {
        let log = ReconciliationLog::new();
        assert_eq!(log.pending(), 0);

        log.record("exp-1", 2, "release after failed persist");
        log.record("exp-2", 1, "release after cancellation");
        assert_eq!(log.pending(), 2);

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].experience_id, "exp-1");
        assert_eq!(drained[0].seats, 2);
        assert!(!drained[0].recorded_at.is_empty());
        assert_eq!(log.pending(), 0);
    }
}
