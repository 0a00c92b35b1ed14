use thiserror::Error;

use baja_core::ports::PortError;

pub mod memory;
pub mod request;

pub use memory::{InMemoryDocumentStore, InMemoryEquipmentCatalog, InMemoryRequestRepository};
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("record was not found")]
    NotFound,
    #[error("stored version does not match the expected version")]
    Conflict,
}

impl From<RepositoryError> for PortError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict => Self::VersionConflict,
            RepositoryError::Database(sqlx::Error::Database(database))
                if database.is_unique_violation() =>
            {
                Self::Duplicate(database.message().to_string())
            }
            RepositoryError::Database(
                error @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => Self::Unavailable(error.to_string()),
            other => Self::Backend(other.to_string()),
        }
    }
}
