use crate::reservation_client::{ClientResult, ReservationClient, ReservationClientError};
use async_trait::async_trait;
use pinhole_core::{CallerOrigin, ShortUrl};
use pinhole_reservation::{ReservationResponse, ReservationStatus};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;
use url::Url;

#[derive(Debug, Error)]
pub enum HttpClientBuildError {
    #[error("invalid reservation service url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct HttpReservationClientConfig {
    /// Base URL of the reservation service.
    #[builder(setter(into))]
    base_url: String,
    /// Used instead of `base_url` for requests from a local caller.
    #[builder(default)]
    local_base_url: Option<String>,
    /// Per-request timeout, covering connect, send and body read.
    #[builder(default = Duration::from_secs(5))]
    timeout: Duration,
}

/// [`ReservationClient`] that talks to the reservation service over HTTP.
///
/// Outcomes are classified from the `status` field of the JSON body. A
/// transport failure or an undecodable body is reported as
/// [`ReservationClientError::Unknown`], a timeout as
/// [`ReservationClientError::Timeout`].
#[derive(Debug, Clone)]
pub struct HttpReservationClient {
    client: Client,
    base_url: Url,
    local_base_url: Option<Url>,
}

fn parse_base_url(raw: &str) -> Result<Url, HttpClientBuildError> {
    // `Url::join` replaces the last path segment unless the base ends in '/'.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };

    let url = Url::parse(&normalized).map_err(|e| HttpClientBuildError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(HttpClientBuildError::InvalidUrl {
            url: raw.to_string(),
            reason: "not a base url".to_string(),
        });
    }
    Ok(url)
}

fn transport_error(err: reqwest::Error) -> ReservationClientError {
    if err.is_timeout() {
        ReservationClientError::Timeout(err.to_string())
    } else {
        ReservationClientError::Unknown(err.to_string())
    }
}

fn classify(body: ReservationResponse) -> ClientResult<ReservationResponse> {
    match body.status {
        ReservationStatus::Success => Ok(body),
        ReservationStatus::ShortUrlNotFound => Err(ReservationClientError::NotFound),
        ReservationStatus::ShortUrlFoundButNotAvailable
        | ReservationStatus::ShortUrlFoundButNotReserved => Err(ReservationClientError::Conflict),
        ReservationStatus::NoShortUrlIsAvailable => Err(ReservationClientError::PoolExhausted),
        ReservationStatus::NotOnLocalMachine => Err(ReservationClientError::NotOnLocalMachine),
        ReservationStatus::InvalidRange
        | ReservationStatus::BulkUpdateConflict
        | ReservationStatus::Unknown => Err(ReservationClientError::Unknown(body.message)),
    }
}

impl HttpReservationClient {
    pub fn new(config: HttpReservationClientConfig) -> Result<Self, HttpClientBuildError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let base_url = parse_base_url(&config.base_url)?;
        let local_base_url = config
            .local_base_url
            .as_deref()
            .map(parse_base_url)
            .transpose()?;

        Ok(Self {
            client,
            base_url,
            local_base_url,
        })
    }

    fn base_for(&self, origin: CallerOrigin) -> &Url {
        match (&self.local_base_url, origin) {
            (Some(local), CallerOrigin::Local) => local,
            _ => &self.base_url,
        }
    }

    async fn patch(&self, origin: CallerOrigin, path: &str) -> ClientResult<ReservationResponse> {
        let url = self
            .base_for(origin)
            .join(path)
            .map_err(|e| ReservationClientError::Unknown(e.to_string()))?;

        debug!(url = %url, "calling reservation service");
        let response = self
            .client
            .patch(url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let http_status = response.status();
        let body = response.json::<ReservationResponse>().await.map_err(|e| {
            if e.is_timeout() {
                ReservationClientError::Timeout(e.to_string())
            } else {
                warn!(url = %url, http_status = %http_status, error = %e, "undecodable reservation response");
                ReservationClientError::Unknown(format!(
                    "undecodable response with http status {http_status}: {e}"
                ))
            }
        })?;

        classify(body)
    }
}

#[async_trait]
impl ReservationClient for HttpReservationClient {
    async fn reserve_any(&self, origin: CallerOrigin) -> ClientResult<ShortUrl> {
        let body = self.patch(origin, "reserve/any").await?;
        body.short_url.ok_or_else(|| {
            ReservationClientError::Unknown("reservation response carried no short url".to_string())
        })
    }

    async fn reserve_specific(
        &self,
        short_url: &ShortUrl,
        origin: CallerOrigin,
    ) -> ClientResult<()> {
        self.patch(origin, &format!("reserve/specific/{short_url}"))
            .await
            .map(|_| ())
    }

    async fn cancel_specific(&self, short_url: &ShortUrl, origin: CallerOrigin) -> ClientResult<()> {
        self.patch(origin, &format!("cancel/specific/{short_url}"))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str, local: Option<&str>) -> HttpReservationClient {
        HttpReservationClient::new(
            HttpReservationClientConfig::builder()
                .base_url(base)
                .local_base_url(local.map(str::to_string))
                .build(),
        )
        .unwrap()
    }

    #[test]
    fn base_urls_keep_their_path_prefix() {
        let client = client("http://reservations.internal/api", None);
        let url = client
            .base_for(CallerOrigin::Remote)
            .join("reserve/any")
            .unwrap();
        assert_eq!(url.as_str(), "http://reservations.internal/api/reserve/any");
    }

    #[test]
    fn local_callers_use_the_local_base_url() {
        let client = client("http://reservations.internal/", Some("http://127.0.0.1:8081"));
        assert_eq!(
            client.base_for(CallerOrigin::Local).as_str(),
            "http://127.0.0.1:8081/"
        );
        assert_eq!(
            client.base_for(CallerOrigin::Remote).as_str(),
            "http://reservations.internal/"
        );
    }

    #[test]
    fn without_a_local_base_url_everyone_uses_the_main_one() {
        let client = client("http://reservations.internal", None);
        assert_eq!(
            client.base_for(CallerOrigin::Local).as_str(),
            "http://reservations.internal/"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        for bad in ["not a url", "mailto:ops@example.com"] {
            let result = HttpReservationClient::new(
                HttpReservationClientConfig::builder().base_url(bad).build(),
            );
            assert!(
                matches!(result, Err(HttpClientBuildError::InvalidUrl { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn statuses_are_classified_from_the_body() {
        let failure = |status| classify(ReservationResponse::new(status, "nope")).unwrap_err();

        assert_eq!(
            failure(ReservationStatus::ShortUrlNotFound),
            ReservationClientError::NotFound
        );
        assert_eq!(
            failure(ReservationStatus::ShortUrlFoundButNotReserved),
            ReservationClientError::Conflict
        );
        assert_eq!(
            failure(ReservationStatus::NoShortUrlIsAvailable),
            ReservationClientError::PoolExhausted
        );
        assert_eq!(
            failure(ReservationStatus::NotOnLocalMachine),
            ReservationClientError::NotOnLocalMachine
        );
        assert_eq!(
            failure(ReservationStatus::Unknown),
            ReservationClientError::Unknown("nope".to_string())
        );
    }
}
