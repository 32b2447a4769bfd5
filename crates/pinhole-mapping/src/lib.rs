//! The mapping service: durable `short URL -> long URL` associations.
//!
//! [`MappingService`] runs the reserve-then-map saga against a
//! [`ReservationClient`]; [`RedirectorService`] resolves short URLs for
//! redirects through a read-through cache.

pub mod api;
pub mod error;
pub mod http;
pub mod http_client;
pub mod redirector;
pub mod reservation_client;
pub mod service;

pub use api::MappingStatus;
pub use error::{MappingError, Result, SagaStep};
pub use http_client::{HttpClientBuildError, HttpReservationClient, HttpReservationClientConfig};
pub use redirector::RedirectorService;
pub use reservation_client::{LocalReservationClient, ReservationClient, ReservationClientError};
pub use service::{MappingService, MappingServiceConfig};
