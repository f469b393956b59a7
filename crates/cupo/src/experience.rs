//! Experience documents as served by the capacity store.

use serde::{Deserialize, Serialize};

/// An experience with its capacity counters.
///
/// Owned by the capacity store; the admission controller only ever reads
/// it and adjusts `capacity_remaining` through the store's conditional
/// primitive. Invariant held by the store:
/// `0 <= capacity_remaining <= capacity_total`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub guide: String,
    pub capacity_total: u32,
    pub capacity_remaining: u32,
}

impl Experience {
    /// Seats currently granted to confirmed reservations.
    pub fn seats_booked(&self) -> u32 {
        self.capacity_total.saturating_sub(self.capacity_remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_store_document() {
        let doc: Experience = serde_json::from_value(serde_json::json!({
            "id": "exp-1",
            "title": "Kayak at dawn",
            "price": 45.0,
            "guide": "maria",
            "capacity_total": 8,
            "capacity_remaining": 5
        }))
        .unwrap();

        assert_eq!(doc.description, "");
        assert_eq!(doc.seats_booked(), 3);
    }
}
