use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Embeddings = Vec<f32>;

/// Metadata stored alongside a vector, ex: `{ "source": "paper.pdf", "summary": "..." }`
pub type Payload = HashMap<String, String>;

/// Exact-match, conjunctive filter on payload fields
pub type PayloadFilter = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Embeddings,
    pub payload: Payload,
}

impl VectorPoint {
    /// A point with a freshly generated id
    pub fn new(vector: Embeddings, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            payload,
        }
    }

    /// True if every field of `filter` is present in the payload with the same value
    pub fn matches(&self, filter: &PayloadFilter) -> bool {
        filter
            .iter()
            .all(|(field, value)| self.payload.get(field) == Some(value))
    }
}

/// Similarity query sent to the vector index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub vector: Embeddings,
    pub filter: Option<PayloadFilter>,
    pub limit: u64,
}

/// One result of a similarity search, ordered by decreasing `score`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub score: f32,
    pub metadata: Payload,
}
