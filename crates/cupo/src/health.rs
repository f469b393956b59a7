//! Health status for the admission service.

use serde::{Deserialize, Serialize};

use crate::version::VersionInfo;

/// Health of the admission service.
///
/// The controller is stateless between requests, so the only degraded
/// condition it can report about itself is unreconciled compensation
/// failures: capacity withheld with no matching reservation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
    #[default]
    Ready,
    /// Compensation failures are pending operator reconciliation.
    Degraded,
}

/// Snapshot of service health for the probe endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: Health,
    pub pending_reconciliations: usize,
    pub version: VersionInfo,
}

impl HealthSnapshot {
    pub fn new(pending_reconciliations: usize, version: VersionInfo) -> Self {
        let status = if pending_reconciliations > 0 {
            Health::Degraded
        } else {
            Health::Ready
        };
        Self {
            status,
            pending_reconciliations,
            version,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == Health::Ready
    }
}
