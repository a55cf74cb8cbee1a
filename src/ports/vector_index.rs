use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    domain::entities::vector_point::{SearchHit, SearchQuery, VectorPoint},
    helper::error_chain_fmt,
};

/// External similarity-search index holding named collections of vectors.
///
/// Every collection uses the cosine distance.
/// Write operations only return once the index acknowledged them.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// # Errors
    /// `VectorIndexError::AlreadyExists` if a collection with this name exists.
    async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), VectorIndexError>;

    /// Inserts the points, replacing the ones sharing an id
    async fn upsert(
        &self,
        collection_name: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorIndexError>;

    async fn search(
        &self,
        collection_name: &str,
        query: SearchQuery,
    ) -> Result<Vec<SearchHit>, VectorIndexError>;

    /// Unknown ids are ignored
    async fn delete(&self, collection_name: &str, ids: &[Uuid]) -> Result<(), VectorIndexError>;
}

#[derive(thiserror::Error)]
pub enum VectorIndexError {
    #[error("Collection {0} already exists")]
    AlreadyExists(String),
    #[error("Collection {0} does not exist")]
    NotFound(String),
    #[error("Vector of dimension {actual} does not fit a collection of dimension {expected}")]
    DimensionMismatch { expected: u64, actual: u64 },
    #[error("The vector index could not be reached: {0}")]
    Unavailable(String),
    #[error("Error from the vector index: {0}")]
    Service(String),
}

impl std::fmt::Debug for VectorIndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
