use axum::routing::patch;
use axum::Router;
use pinhole_core::{CallerOrigin, ShortUrl};
use pinhole_mapping::{
    HttpReservationClient, HttpReservationClientConfig, ReservationClient, ReservationClientError,
};
use pinhole_reservation::http::router;
use pinhole_reservation::ReservationService;
use pinhole_storage::InMemoryReservationStore;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

const REMOTE: CallerOrigin = CallerOrigin::Remote;

async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{addr}")
}

async fn reservation_server(min: u64, max: u64) -> String {
    let service = ReservationService::new(InMemoryReservationStore::new());
    service.initialize(min, max).await.unwrap();
    spawn_server(router(service)).await
}

/// A base URL nothing listens on.
async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn client(base_url: String) -> HttpReservationClient {
    HttpReservationClient::new(
        HttpReservationClientConfig::builder()
            .base_url(base_url)
            .timeout(Duration::from_secs(5))
            .build(),
    )
    .unwrap()
}

#[tokio::test]
async fn outcomes_follow_the_status_field() {
    let client = client(reservation_server(0, 1).await);
    let zero = ShortUrl::encode(0);

    client.reserve_specific(&zero, REMOTE).await.unwrap();
    assert_eq!(
        client.reserve_specific(&zero, REMOTE).await,
        Err(ReservationClientError::Conflict)
    );
    assert_eq!(
        client.reserve_specific(&ShortUrl::encode(9), REMOTE).await,
        Err(ReservationClientError::NotFound)
    );

    assert_eq!(client.reserve_any(REMOTE).await, Ok(ShortUrl::encode(1)));
    assert_eq!(
        client.reserve_any(REMOTE).await,
        Err(ReservationClientError::PoolExhausted)
    );

    client.cancel_specific(&zero, REMOTE).await.unwrap();
    assert_eq!(
        client.cancel_specific(&zero, REMOTE).await,
        Err(ReservationClientError::Conflict)
    );
    assert_eq!(client.reserve_any(REMOTE).await, Ok(zero));
}

#[tokio::test]
async fn unreachable_service_is_unknown() {
    let client = client(closed_port().await);

    let err = client.reserve_any(REMOTE).await.unwrap_err();
    assert!(matches!(err, ReservationClientError::Unknown(_)), "{err:?}");
}

#[tokio::test]
async fn slow_service_times_out() {
    let app = Router::new().route(
        "/reserve/any",
        patch(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            "too late"
        }),
    );
    let client = HttpReservationClient::new(
        HttpReservationClientConfig::builder()
            .base_url(spawn_server(app).await)
            .timeout(Duration::from_millis(100))
            .build(),
    )
    .unwrap();

    let err = client.reserve_any(REMOTE).await.unwrap_err();
    assert!(matches!(err, ReservationClientError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn untyped_bodies_are_unknown() {
    let app = Router::new().route("/reserve/any", patch(|| async { "<html>bad gateway</html>" }));
    let client = client(spawn_server(app).await);

    let err = client.reserve_any(REMOTE).await.unwrap_err();
    assert!(matches!(err, ReservationClientError::Unknown(_)), "{err:?}");
}

#[tokio::test]
async fn local_callers_use_the_local_endpoint() {
    let client = HttpReservationClient::new(
        HttpReservationClientConfig::builder()
            .base_url(closed_port().await)
            .local_base_url(Some(reservation_server(0, 3).await))
            .build(),
    )
    .unwrap();

    assert!(client.reserve_any(CallerOrigin::Local).await.is_ok());
    assert!(matches!(
        client.reserve_any(REMOTE).await,
        Err(ReservationClientError::Unknown(_))
    ));
}
