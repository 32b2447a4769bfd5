use crate::api::{
    ChangeLongUrlRequest, CreateMappingRequest, GetMappingsQuery, MappingResponse,
};
use crate::error::{MappingError, Result};
use crate::redirector::RedirectorService;
use crate::reservation_client::ReservationClient;
use crate::service::MappingService;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use pinhole_cache::MappingCache;
use pinhole_core::{MappingFilter, MappingStore, ShortUrl};
use pinhole_http::{health_handler, PeerOrigin};
use tracing::{error, warn};

impl MappingError {
    fn http_status(&self) -> StatusCode {
        match self {
            MappingError::NoLongUrlSpecified
            | MappingError::ShortUrlNotValid(_)
            | MappingError::BadLongUrlSyntax(_) => StatusCode::BAD_REQUEST,
            MappingError::ShortUrlNotFound(_)
            | MappingError::NoSuchShortUrl(_)
            | MappingError::NoSuchLongUrl(_)
            | MappingError::NoSuchMapping { .. } => StatusCode::NOT_FOUND,
            MappingError::ShortUrlAlreadyTaken(_)
            | MappingError::ShortUrlNotInUse(_)
            | MappingError::Contention(_) => StatusCode::CONFLICT,
            MappingError::NoShortUrlAvailable => StatusCode::SERVICE_UNAVAILABLE,
            MappingError::NotOnLocalMachine => StatusCode::FORBIDDEN,
            MappingError::UnknownReservationError(_) => StatusCode::BAD_GATEWAY,
            MappingError::InconsistentState { .. }
            | MappingError::Storage(_)
            | MappingError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MappingError {
    fn into_response(self) -> Response {
        let code = self.http_status();
        let status = self.status();
        if code.is_server_error() && code != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "mapping request failed");
        } else {
            warn!(error = %self, status = ?status, "mapping request rejected");
        }
        (code, Json(MappingResponse::new(status, self.to_string()))).into_response()
    }
}

/// Shared state of the mapping routes.
pub struct AppState<M, R, C> {
    service: MappingService<M, R>,
    redirector: RedirectorService<M, C>,
}

impl<M, R, C> Clone for AppState<M, R, C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            redirector: self.redirector.clone(),
        }
    }
}

impl<M, R, C> AppState<M, R, C>
where
    M: MappingStore,
    R: ReservationClient,
    C: MappingCache,
{
    async fn forget(&self, short_url: &ShortUrl) {
        if let Err(err) = self.redirector.invalidate(short_url).await {
            warn!(short_url = %short_url, error = %err, "failed to invalidate redirect cache");
        }
    }
}

/// A short URL that fails validation cannot exist.
fn parse_short_url(raw: &str) -> Result<ShortUrl> {
    ShortUrl::new(raw).map_err(|_| MappingError::ShortUrlNotFound(raw.to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Prefix of every API route. It contains '/', which no short URL does, so
/// `GET /{short_url}` owns every single-segment path.
pub const API_PREFIX: &str = "/short-url/mappings";

/// Routes of the mapping service: the API under [`API_PREFIX`] and the
/// redirect at the root.
pub fn router<M, R, C>(service: MappingService<M, R>, redirector: RedirectorService<M, C>) -> Router
where
    M: MappingStore,
    R: ReservationClient,
    C: MappingCache,
{
    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/initialize", post(initialize::<M, R, C>))
        .route("/create-mapping", post(create_mapping::<M, R, C>))
        .route("/get-mappings", get(get_mappings::<M, R, C>))
        .route("/change-long-url", patch(change_long_url::<M, R, C>))
        .route("/delete-mapping/{short_url}", delete(delete_mapping::<M, R, C>))
        .route("/delete-all", delete(delete_all::<M, R, C>));

    Router::new()
        .nest(API_PREFIX, api)
        .route("/{short_url}", get(redirect::<M, R, C>))
        .with_state(AppState {
            service,
            redirector,
        })
}

async fn initialize<M: MappingStore, R: ReservationClient, C: MappingCache>(
    State(state): State<AppState<M, R, C>>,
    PeerOrigin(origin): PeerOrigin,
) -> Result<Json<MappingResponse>> {
    state.service.initialize(origin).await?;
    Ok(Json(MappingResponse::success("mapping table initialized")))
}

async fn create_mapping<M: MappingStore, R: ReservationClient, C: MappingCache>(
    State(state): State<AppState<M, R, C>>,
    PeerOrigin(origin): PeerOrigin,
    Json(request): Json<CreateMappingRequest>,
) -> Result<Json<MappingResponse>> {
    let long_url = request.long_url.unwrap_or_default();
    let short_url = non_blank(request.short_url);
    let mapping = state
        .service
        .create_mapping(short_url.as_deref(), &long_url, origin)
        .await?;
    Ok(Json(
        MappingResponse::success(format!("created {}", mapping.short_url))
            .with_mappings(vec![mapping]),
    ))
}

async fn get_mappings<M: MappingStore, R: ReservationClient, C: MappingCache>(
    State(state): State<AppState<M, R, C>>,
    Query(query): Query<GetMappingsQuery>,
) -> Result<Json<MappingResponse>> {
    let filter = MappingFilter {
        short_url: non_blank(query.short_url)
            .map(|raw| parse_short_url(&raw))
            .transpose()?,
        long_url: non_blank(query.long_url),
    };
    let mappings = state.service.get_mappings(&filter).await?;
    Ok(Json(
        MappingResponse::success(format!("{} mappings", mappings.len())).with_mappings(mappings),
    ))
}

async fn change_long_url<M: MappingStore, R: ReservationClient, C: MappingCache>(
    State(state): State<AppState<M, R, C>>,
    Json(request): Json<ChangeLongUrlRequest>,
) -> Result<Json<MappingResponse>> {
    let short_url = parse_short_url(&request.short_url)?;
    let new_long_url = request.new_long_url.unwrap_or_default();
    let updated = state
        .service
        .update_long_url(&short_url, &new_long_url)
        .await?;
    state.forget(&short_url).await;
    Ok(Json(
        MappingResponse::success(format!("changed long url of {short_url}"))
            .with_mappings(vec![updated]),
    ))
}

async fn delete_mapping<M: MappingStore, R: ReservationClient, C: MappingCache>(
    State(state): State<AppState<M, R, C>>,
    PeerOrigin(origin): PeerOrigin,
    Path(short_url): Path<String>,
) -> Result<Json<MappingResponse>> {
    let short_url = parse_short_url(&short_url)?;
    let deleted = state.service.delete_mapping(&short_url, origin).await?;
    state.forget(&short_url).await;
    Ok(Json(
        MappingResponse::success(format!("deleted {short_url}")).with_mappings(vec![deleted]),
    ))
}

async fn delete_all<M: MappingStore, R: ReservationClient, C: MappingCache>(
    State(state): State<AppState<M, R, C>>,
    PeerOrigin(origin): PeerOrigin,
) -> Result<Json<MappingResponse>> {
    let deleted = state.service.delete_all(origin).await?;
    for mapping in &deleted {
        state.forget(&mapping.short_url).await;
    }
    Ok(Json(
        MappingResponse::success(format!("deleted {} mappings", deleted.len()))
            .with_deleted(deleted.len()),
    ))
}

async fn redirect<M: MappingStore, R: ReservationClient, C: MappingCache>(
    State(state): State<AppState<M, R, C>>,
    Path(short_url): Path<String>,
) -> Result<Response> {
    let short_url = parse_short_url(&short_url)?;
    let target = state.redirector.resolve(&short_url).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, target.to_string())]).into_response())
}
