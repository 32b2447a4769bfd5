use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use pinhole_core::CallerOrigin;
use std::convert::Infallible;
use std::net::SocketAddr;

/// Extracts the [`CallerOrigin`] of a request from the peer address of its
/// connection.
///
/// The address comes from [`ConnectInfo`], which is only present when the
/// router is served with `into_make_service_with_connect_info`. Without it
/// the caller is treated as remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerOrigin(pub CallerOrigin);

impl<S> FromRequestParts<S> for PeerOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let origin = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(peer)| CallerOrigin::from_peer(*peer))
            .unwrap_or(CallerOrigin::Remote);
        Ok(PeerOrigin(origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::Extension;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn whoami(PeerOrigin(origin): PeerOrigin) -> &'static str {
        if origin.is_local() {
            "local"
        } else {
            "remote"
        }
    }

    async fn call(router: Router) -> String {
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn loopback_peer_is_local() {
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        let router = Router::new()
            .route("/", get(whoami))
            .layer(Extension(ConnectInfo(peer)));
        assert_eq!(call(router).await, "local");
    }

    #[tokio::test]
    async fn other_peer_is_remote() {
        let peer: SocketAddr = "192.0.2.10:50000".parse().unwrap();
        let router = Router::new()
            .route("/", get(whoami))
            .layer(Extension(ConnectInfo(peer)));
        assert_eq!(call(router).await, "remote");
    }

    #[tokio::test]
    async fn missing_connect_info_is_remote() {
        let router = Router::new().route("/", get(whoami));
        assert_eq!(call(router).await, "remote");
    }
}
