use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    domain::entities::vector_point::{
        Embeddings, Payload, PayloadFilter, SearchHit, SearchQuery, VectorPoint,
    },
    helper::error_chain_fmt,
    ports::vector_index::{VectorIndex, VectorIndexError},
};

pub const DEFAULT_SEARCH_LIMIT: u64 = 5;

/// Stores and queries vectors of one collection of the vector index
///
/// The collection is created (if needed) when the client is built.
/// Every vector must have the dimensionality of the collection.
pub struct VectorStoreClient {
    index: Arc<dyn VectorIndex>,
    collection_name: String,
    vector_size: u64,
}

impl VectorStoreClient {
    #[tracing::instrument(
        name = "Initializing the vector store and the associated collection",
        skip(index)
    )]
    pub async fn try_new(
        index: Arc<dyn VectorIndex>,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<Self, VectorStoreError> {
        init_collection(index.as_ref(), collection_name, vector_size).await?;

        Ok(Self {
            index,
            collection_name: collection_name.to_string(),
            vector_size,
        })
    }

    /// Stores one vector and returns its generated id
    #[tracing::instrument(name = "Storing a vector", skip(self, vector))]
    pub async fn store(
        &self,
        vector: Embeddings,
        metadata: Payload,
    ) -> Result<Uuid, VectorStoreError> {
        self.check_dimension(&vector)?;

        let point = VectorPoint::new(vector, metadata);
        let id = point.id;
        self.index.upsert(&self.collection_name, vec![point]).await?;

        info!(%id, "Stored vector in collection {}", self.collection_name);
        Ok(id)
    }

    /// Stores every item in one request, returning the generated ids in the items order
    ///
    /// Atomicity is the one of the index for a multi-point upsert.
    #[tracing::instrument(name = "Storing vectors", skip(self, items), fields(nb_items = items.len()))]
    pub async fn batch_store(
        &self,
        items: Vec<(Embeddings, Payload)>,
    ) -> Result<Vec<Uuid>, VectorStoreError> {
        for (vector, _) in &items {
            self.check_dimension(vector)?;
        }

        let points: Vec<VectorPoint> = items
            .into_iter()
            .map(|(vector, payload)| VectorPoint::new(vector, payload))
            .collect();
        let ids = points.iter().map(|point| point.id).collect();

        self.index.upsert(&self.collection_name, points).await?;

        info!("Stored vectors in collection {}", self.collection_name);
        Ok(ids)
    }

    /// Returns the `limit` nearest points, most similar first
    #[tracing::instrument(name = "Searching similar vectors", skip(self, vector))]
    pub async fn search(
        &self,
        vector: Embeddings,
        limit: u64,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        self.query(vector, None, limit).await
    }

    /// Like `search`, restricted to points whose payload contains every field of `filter`
    #[tracing::instrument(name = "Searching similar vectors with a filter", skip(self, vector))]
    pub async fn search_filtered(
        &self,
        vector: Embeddings,
        filter: PayloadFilter,
        limit: u64,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        self.query(vector, Some(filter), limit).await
    }

    /// Deleting an unknown id succeeds
    #[tracing::instrument(name = "Deleting a vector", skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), VectorStoreError> {
        self.index.delete(&self.collection_name, &[id]).await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: Embeddings,
        filter: Option<PayloadFilter>,
        limit: u64,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        self.check_dimension(&vector)?;

        let hits = self
            .index
            .search(
                &self.collection_name,
                SearchQuery {
                    vector,
                    filter,
                    limit,
                },
            )
            .await?;

        info!("Found {} similar vector(s)", hits.len());
        Ok(hits)
    }

    fn check_dimension(&self, vector: &Embeddings) -> Result<(), VectorStoreError> {
        if vector.len() as u64 != self.vector_size {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.vector_size,
                actual: vector.len() as u64,
            }
            .into());
        }
        Ok(())
    }
}

/// Makes sure a cosine collection named `collection_name` exists.
///
/// An existing collection is kept as is.
pub async fn init_collection(
    index: &dyn VectorIndex,
    collection_name: &str,
    vector_size: u64,
) -> Result<(), VectorStoreError> {
    match index.create_collection(collection_name, vector_size).await {
        Ok(()) => {
            info!("Created collection {}", collection_name);
            Ok(())
        }
        Err(VectorIndexError::AlreadyExists(_)) => {
            info!("Collection {} already exists", collection_name);
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}

#[derive(thiserror::Error)]
pub enum VectorStoreError {
    #[error(transparent)]
    Index(#[from] VectorIndexError),
}

impl std::fmt::Debug for VectorStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
