mod cli;

use crate::cli::{StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use pinhole_cache::{MokaCacheConfig, MokaMappingCache};
use pinhole_core::RetryPolicy;
use pinhole_mapping::http::router;
use pinhole_mapping::{
    HttpReservationClient, HttpReservationClientConfig, MappingService, MappingServiceConfig,
    RedirectorService,
};
use pinhole_storage::{InMemoryMappingStore, MappingStore, MySqlMappingStore};
use pinhole_telemetry::TelemetryConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

const SERVICE_NAME: &str = "pinhole-mapping";

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
        reservation_url = %config.reservation_url,
        "starting mapping http server"
    );

    let reservations = HttpReservationClient::new(
        HttpReservationClientConfig::builder()
            .base_url(config.reservation_url.clone())
            .local_base_url(config.local_reservation_url.clone())
            .timeout(config.reservation_timeout())
            .build(),
    )
    .context("failed to build the reservation client")?;

    match config.storage {
        StorageBackendArg::InMemory => {
            run_server(&config, InMemoryMappingStore::new(), reservations).await?;
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlMappingStore::connect(mysql_dsn)
                .await
                .context("failed to connect to mysql")?;
            run_server(&config, store, reservations).await?;
        }
    }

    Ok(())
}

async fn run_server<M: MappingStore>(
    config: &CLI,
    store: M,
    reservations: HttpReservationClient,
) -> anyhow::Result<()> {
    let store = Arc::new(store);
    let service = MappingService::from_shared(
        Arc::clone(&store),
        Arc::new(reservations),
        MappingServiceConfig::builder()
            .store_timeout(config.store_timeout())
            .update_retry(RetryPolicy::capped(config.update_retry_attempts))
            .build(),
    );
    let cache = MokaMappingCache::new(
        MokaCacheConfig::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl())
            .build(),
    );
    let redirector = RedirectorService::new(store, cache);

    let listen_addr: SocketAddr = config.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    pinhole_http::serve(listener, router(service, redirector)).await?;
    Ok(())
}
