use async_trait::async_trait;
use thiserror::Error;

use recommender_core::domain::order::OrderRecord;
use recommender_core::domain::product::ProductRecord;
use recommender_core::store::StoreError;

pub mod memory;
pub mod sql;

pub use memory::InMemoryRecommendationStore;
pub use sql::SqlRecommendationStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Unavailable(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
            RepositoryError::Store(error) => error,
        }
    }
}

/// Write side used by seeding and operator tooling. The engine itself only reads.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn save_product(&self, product: &ProductRecord, active: bool)
        -> Result<(), RepositoryError>;

    async fn save_order(&self, order: &OrderRecord) -> Result<(), RepositoryError>;
}
