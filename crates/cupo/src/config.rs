//! Environment-driven service configuration.

use std::time::Duration;

use crate::ledger::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of the experiences service (the capacity store).
    pub capacity_store_url: String,
    /// Base URL of the reservations service (the reservation store).
    pub reservation_store_url: String,
    /// Per-request timeout for outbound store calls.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8006,
            capacity_store_url: "http://experiences-service:8002".to_string(),
            reservation_store_url: "http://reservations-service:8004".to_string(),
            request_timeout: Duration::from_secs(3),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to the
    /// defaults above for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_string("CUPO_HOST", defaults.host),
            port: env_parsed("CUPO_PORT", defaults.port),
            capacity_store_url: env_string("CAPACITY_STORE_URL", defaults.capacity_store_url),
            reservation_store_url: env_string(
                "RESERVATION_STORE_URL",
                defaults.reservation_store_url,
            ),
            request_timeout: Duration::from_secs_f64(
                env_parsed("REQUEST_TIMEOUT", defaults.request_timeout.as_secs_f64())
                    .clamp(0.1, 600.0),
            ),
            retry: RetryPolicy {
                max_retries: env_parsed("CUPO_MAX_RETRIES", defaults.retry.max_retries),
                backoff_base: Duration::from_millis(env_parsed(
                    "CUPO_BACKOFF_MS",
                    defaults.retry.backoff_base.as_millis() as u64,
                )),
            },
        }
    }
}

fn env_string(name: &str, default: String) -> String {
    std::env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
