use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Serves `router` on `listener` until Ctrl-C.
///
/// Connections carry their peer address so handlers can use
/// [`PeerOrigin`](crate::PeerOrigin).
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    let app = router.layer(TraceLayer::new_for_http());

    info!(listen_addr = %listener.local_addr()?, "serving http");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
