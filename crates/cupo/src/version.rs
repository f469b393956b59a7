//! Version information for the admission service.

/// Service version from Cargo.toml.
pub const CUPO_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version document included in health responses.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionInfo {
    /// Admission service version.
    pub cupo: &'static str,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self { cupo: CUPO_VERSION }
    }
}

impl VersionInfo {
    pub fn new() -> Self {
        Self::default()
    }
}
