use std::result::Result as StdResult;
use thiserror::Error;

/// Errors that can occur while starting or querying a test container.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("Container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
    #[error("Database error after {attempts} connect attempts: {source}")]
    Database {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

pub type Result<T> = StdResult<T, TestInfraError>;
