//! Transport pieces shared by the Pinhole HTTP services.

pub mod health;
pub mod origin;
pub mod server;

pub use health::{health_handler, HealthResponse};
pub use origin::PeerOrigin;
pub use server::serve;
