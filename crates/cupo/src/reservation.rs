//! Reservation records and the per-request admission state machine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A reservation as stored by the reservation store.
///
/// The identifier is assigned by the store on creation. `attended` only
/// ever transitions false to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub experience_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub party_size: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub attended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// A validated reservation about to be persisted (no identifier yet).
#[derive(Debug, Clone, Serialize)]
pub struct NewReservation {
    pub experience_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub party_size: u32,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Phase of a single admission request.
///
/// `Confirmed`, `Rejected` and `Failed` are terminal: a rejected request
/// made no writes, a failed one had its capacity reservation compensated
/// (or recorded for reconciliation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionState {
    Validating,
    ReservingCapacity,
    Persisting,
    Confirmed,
    Rejected,
    Failed,
}

impl AdmissionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::ReservingCapacity => "reserving_capacity",
            Self::Persisting => "persisting",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!AdmissionState::Validating.is_terminal());
        assert!(!AdmissionState::ReservingCapacity.is_terminal());
        assert!(!AdmissionState::Persisting.is_terminal());
        assert!(AdmissionState::Confirmed.is_terminal());
        assert!(AdmissionState::Rejected.is_terminal());
        assert!(AdmissionState::Failed.is_terminal());
    }

    #[test]
    fn state_serializes_snake_case() {
        insta::assert_json_snapshot!(AdmissionState::ReservingCapacity, @r#""reserving_capacity""#);
        assert_eq!(AdmissionState::Confirmed.as_str(), "confirmed");
    }

    #[test]
    fn reservation_date_uses_iso_wire_format() {
        let reservation = Reservation {
            id: "res-1".to_string(),
            experience_id: "exp-1".to_string(),
            user_id: "ana".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            party_size: 2,
            notes: String::new(),
            attended: false,
            idempotency_key: None,
        };
        let json = serde_json::to_value(&reservation).unwrap();
        assert_eq!(json["date"], "2026-09-01");
        assert!(json.get("idempotency_key").is_none());
    }
}
