mod cli;

use crate::cli::{StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use pinhole_reservation::http::router;
use pinhole_reservation::ReservationService;
use pinhole_storage::{InMemoryReservationStore, MySqlReservationStore, ReservationStore};
use pinhole_telemetry::TelemetryConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};

const SERVICE_NAME: &str = "pinhole-reservation";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    let telemetry = TelemetryConfig::builder()
        .service_name(SERVICE_NAME)
        .format(config.log_format)
        .otlp_endpoint(config.otlp_endpoint.clone())
        .otlp_protocol(config.otlp_protocol)
        .build();
    let _guard = pinhole_telemetry::init(&telemetry)?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        "starting reservation http server"
    );

    match config.storage {
        StorageBackendArg::InMemory => {
            let service = ReservationService::new(InMemoryReservationStore::new());
            if let Some((min, max)) = config.pool_range() {
                service
                    .initialize(min, max)
                    .await
                    .context("failed to populate the reservation pool")?;
            }
            run_server(config.listen_addr, service).await?;
        }
        StorageBackendArg::Mysql => {
            if config.pool_range().is_some() {
                warn!("startup pool range is ignored for the mysql backend; use POST /initialize");
            }
            let mysql_dsn = config
                .mysql_dsn
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlReservationStore::connect(&mysql_dsn)
                .await
                .context("failed to connect to mysql")?;
            run_server(config.listen_addr, ReservationService::new(store)).await?;
        }
    }

    Ok(())
}

async fn run_server<S: ReservationStore>(
    listen_addr: std::net::SocketAddr,
    service: ReservationService<S>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    pinhole_http::serve(listener, router(service)).await?;
    Ok(())
}
