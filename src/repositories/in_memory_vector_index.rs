use std::collections::HashMap;

use async_trait::async_trait;
use futures::lock::Mutex;
use uuid::Uuid;

use crate::{
    domain::entities::vector_point::{SearchHit, SearchQuery, VectorPoint},
    ports::vector_index::{VectorIndex, VectorIndexError},
};

struct Collection {
    vector_size: u64,
    points: HashMap<Uuid, VectorPoint>,
}

/// `VectorIndex` kept in memory, searched by brute-force cosine similarity
///
/// Not meant for large collections: used by tests and dry runs without a Qdrant server.
pub struct InMemoryVectorIndex {
    collections: Mutex<HashMap<String, Collection>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Number of points of a collection, `None` if it does not exist
    pub async fn count(&self, collection_name: &str) -> Option<usize> {
        self.collections
            .lock()
            .await
            .get(collection_name)
            .map(|collection| collection.points.len())
    }

    pub async fn get(&self, collection_name: &str, id: &Uuid) -> Option<VectorPoint> {
        self.collections
            .lock()
            .await
            .get(collection_name)
            .and_then(|collection| collection.points.get(id).cloned())
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

fn check_dimension(collection: &Collection, vector: &[f32]) -> Result<(), VectorIndexError> {
    if vector.len() as u64 != collection.vector_size {
        return Err(VectorIndexError::DimensionMismatch {
            expected: collection.vector_size,
            actual: vector.len() as u64,
        });
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), VectorIndexError> {
        let mut collections = self.collections.lock().await;
        if collections.contains_key(collection_name) {
            return Err(VectorIndexError::AlreadyExists(collection_name.to_string()));
        }

        collections.insert(
            collection_name.to_string(),
            Collection {
                vector_size,
                points: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert(
        &self,
        collection_name: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorIndexError> {
        let mut collections = self.collections.lock().await;
        let collection = collections
            .get_mut(collection_name)
            .ok_or_else(|| VectorIndexError::NotFound(collection_name.to_string()))?;

        // Nothing is written if one of the points is invalid
        for point in &points {
            check_dimension(collection, &point.vector)?;
        }
        for point in points {
            collection.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection_name: &str,
        query: SearchQuery,
    ) -> Result<Vec<SearchHit>, VectorIndexError> {
        let collections = self.collections.lock().await;
        let collection = collections
            .get(collection_name)
            .ok_or_else(|| VectorIndexError::NotFound(collection_name.to_string()))?;
        check_dimension(collection, &query.vector)?;

        let mut hits: Vec<SearchHit> = collection
            .points
            .values()
            .filter(|point| {
                query
                    .filter
                    .as_ref()
                    .map_or(true, |filter| point.matches(filter))
            })
            .map(|point| SearchHit {
                id: point.id,
                score: cosine_similarity(&query.vector, &point.vector),
                metadata: point.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.limit as usize);
        Ok(hits)
    }

    async fn delete(&self, collection_name: &str, ids: &[Uuid]) -> Result<(), VectorIndexError> {
        let mut collections = self.collections.lock().await;
        let collection = collections
            .get_mut(collection_name)
            .ok_or_else(|| VectorIndexError::NotFound(collection_name.to_string()))?;

        for id in ids {
            collection.points.remove(id);
        }
        Ok(())
    }
}
