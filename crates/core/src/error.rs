//! Error types shared across crates

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data source error: {0}")]
    DataSource(#[from] crate::traits::DataSourceError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] crate::traits::EnrichmentError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] crate::traits::PersistenceError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;
