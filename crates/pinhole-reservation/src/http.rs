use crate::api::{InitializeRequest, ReservationResponse, ReservationStatus};
use crate::error::ReservationError;
use crate::service::ReservationService;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use pinhole_core::{ReservationStore, ShortUrl};
use pinhole_http::{health_handler, PeerOrigin};
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    /// A path segment that cannot be a short URL, so it cannot exist either.
    #[error("short url '{0}' does not exist")]
    InvalidShortUrl(String),
    #[error("operation is only allowed from the local machine")]
    NotOnLocalMachine,
}

impl ApiError {
    fn status(&self) -> (StatusCode, ReservationStatus) {
        use ReservationError as E;

        match self {
            ApiError::InvalidShortUrl(_) | ApiError::Reservation(E::NotFound(_)) => {
                (StatusCode::NOT_FOUND, ReservationStatus::ShortUrlNotFound)
            }
            ApiError::Reservation(E::AlreadyReserved(_)) => (
                StatusCode::CONFLICT,
                ReservationStatus::ShortUrlFoundButNotAvailable,
            ),
            ApiError::Reservation(E::NotReserved(_)) => (
                StatusCode::CONFLICT,
                ReservationStatus::ShortUrlFoundButNotReserved,
            ),
            ApiError::Reservation(E::PoolExhausted) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ReservationStatus::NoShortUrlIsAvailable,
            ),
            ApiError::Reservation(E::InvalidRange { .. }) => {
                (StatusCode::BAD_REQUEST, ReservationStatus::InvalidRange)
            }
            ApiError::Reservation(E::BulkConflict(_)) => {
                (StatusCode::CONFLICT, ReservationStatus::BulkUpdateConflict)
            }
            ApiError::NotOnLocalMachine => {
                (StatusCode::FORBIDDEN, ReservationStatus::NotOnLocalMachine)
            }
            ApiError::Reservation(E::Contention(_) | E::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ReservationStatus::Unknown)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, status) = self.status();
        if code.is_server_error() && code != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "reservation request failed");
        } else {
            warn!(error = %self, status = ?status, "reservation request rejected");
        }
        (code, Json(ReservationResponse::new(status, self.to_string()))).into_response()
    }
}

fn parse_short_url(raw: String) -> Result<ShortUrl> {
    ShortUrl::new(raw.as_str()).map_err(|_| ApiError::InvalidShortUrl(raw))
}

fn require_local(PeerOrigin(origin): PeerOrigin) -> Result<()> {
    if origin.is_local() {
        Ok(())
    } else {
        Err(ApiError::NotOnLocalMachine)
    }
}

/// Routes of the reservation service.
pub fn router<S: ReservationStore>(service: ReservationService<S>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/initialize", post(initialize::<S>))
        .route("/all", get(get_all::<S>))
        .route("/specific/{short_url}", get(get_one::<S>))
        .route("/reserve/any", patch(reserve_any::<S>))
        .route("/reserve/specific/{short_url}", patch(reserve_specific::<S>))
        .route("/cancel/specific/{short_url}", patch(cancel_specific::<S>))
        .route("/reserve/all", patch(reserve_all::<S>))
        .route("/cancel/all", patch(cancel_all::<S>))
        .with_state(service)
}

async fn initialize<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    origin: PeerOrigin,
    Json(request): Json<InitializeRequest>,
) -> Result<Json<ReservationResponse>> {
    require_local(origin)?;
    service.initialize(request.min, request.max).await?;
    Ok(Json(ReservationResponse::success(format!(
        "initialized pool [{}, {}]",
        request.min, request.max
    ))))
}

async fn get_all<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
) -> Result<Json<ReservationResponse>> {
    let rows = service.get_all().await?;
    Ok(Json(
        ReservationResponse::success(format!("{} reservations", rows.len())).with_reservations(rows),
    ))
}

async fn get_one<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    Path(short_url): Path<String>,
) -> Result<Json<ReservationResponse>> {
    let short_url = parse_short_url(short_url)?;
    let row = service.get_one(&short_url).await?;
    Ok(Json(
        ReservationResponse::success(format!("found {short_url}"))
            .with_short_url(short_url)
            .with_reservations(vec![row]),
    ))
}

async fn reserve_any<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
) -> Result<Json<ReservationResponse>> {
    let short_url = service.reserve_any().await?;
    Ok(Json(
        ReservationResponse::success(format!("reserved {short_url}")).with_short_url(short_url),
    ))
}

async fn reserve_specific<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    Path(short_url): Path<String>,
) -> Result<Json<ReservationResponse>> {
    let short_url = parse_short_url(short_url)?;
    service.reserve_specific(&short_url).await?;
    Ok(Json(
        ReservationResponse::success(format!("reserved {short_url}")).with_short_url(short_url),
    ))
}

async fn cancel_specific<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    Path(short_url): Path<String>,
) -> Result<Json<ReservationResponse>> {
    let short_url = parse_short_url(short_url)?;
    service.cancel_specific(&short_url).await?;
    Ok(Json(
        ReservationResponse::success(format!("cancelled {short_url}")).with_short_url(short_url),
    ))
}

async fn reserve_all<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    origin: PeerOrigin,
) -> Result<Json<ReservationResponse>> {
    require_local(origin)?;
    let updated = service.reserve_all().await?;
    Ok(Json(
        ReservationResponse::success(format!("reserved {updated} short urls")).with_updated(updated),
    ))
}

async fn cancel_all<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    origin: PeerOrigin,
) -> Result<Json<ReservationResponse>> {
    require_local(origin)?;
    let updated = service.cancel_all().await?;
    Ok(Json(
        ReservationResponse::success(format!("cancelled {updated} reservations"))
            .with_updated(updated),
    ))
}
