//! Storage backends for the reservation and mapping tables.

pub mod memory;
pub mod mysql;

pub use memory::{InMemoryMappingStore, InMemoryReservationStore};
pub use mysql::{MySqlMappingStore, MySqlReservationStore};
pub use pinhole_core::store::{MappingReader, MappingStore, ReservationStore, Result};
pub use pinhole_core::StorageError;
