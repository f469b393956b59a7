//! Server binary for the admission controller.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cupo::config::Config;
use cupo::stores::{HttpCapacityStore, HttpReservationStore, build_client};
use cupo::transport;
use cupo::{AdmissionController, CapacityLedger};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env();
    tracing::info!(?config, "starting cupo admission controller");

    let client = build_client(config.request_timeout)?;
    let capacity = Arc::new(HttpCapacityStore::new(
        config.capacity_store_url.clone(),
        client.clone(),
    ));
    let reservations = Arc::new(HttpReservationStore::new(
        config.reservation_store_url.clone(),
        client,
    ));

    let ledger = CapacityLedger::new(capacity, config.retry.clone());
    let controller = Arc::new(AdmissionController::new(ledger, reservations));

    transport::serve(&config, controller).await
}
