//! The reservation service: owner of the short URL pool.
//!
//! [`ReservationService`] implements allocation on top of any
//! [`ReservationStore`](pinhole_core::ReservationStore); [`http`] exposes it
//! over HTTP with the wire types in [`api`].

pub mod api;
pub mod error;
pub mod http;
pub mod service;

pub use api::{InitializeRequest, ReservationResponse, ReservationStatus};
pub use error::{ReservationError, Result};
pub use service::ReservationService;
