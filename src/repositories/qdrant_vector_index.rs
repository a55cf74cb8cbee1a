use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::{
    prelude::QdrantClient,
    qdrant::{
        self, condition::ConditionOneOf, point_id::PointIdOptions,
        points_selector::PointsSelectorOneOf, r#match::MatchValue, value::Kind,
        vectors_config::Config, Condition, CreateCollection, Distance, FieldCondition, Filter,
        Match, PointStruct, PointsIdsList, PointsSelector, ScoredPoint, SearchPoints,
        VectorParams, VectorsConfig,
    },
};
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::entities::vector_point::{Payload, PayloadFilter, SearchHit, SearchQuery, VectorPoint},
    ports::vector_index::{VectorIndex, VectorIndexError},
};

/// Repository for vectors persisted in Qdrant
pub struct QdrantVectorIndex {
    client: QdrantClient,
}

impl QdrantVectorIndex {
    pub fn new(client: QdrantClient) -> Self {
        Self { client }
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, VectorIndexError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| classify_error(e, collection_name))?;

        Ok(response
            .collections
            .iter()
            .any(|collection| collection.name == collection_name))
    }
}

/// Maps the errors of the Qdrant client to the error kinds of `VectorIndex`.
///
/// The client only returns `anyhow` errors for now, the message is the only thing to go on.
fn classify_error(error: anyhow::Error, collection_name: &str) -> VectorIndexError {
    let message = format!("{:#}", error);
    let lowercase = message.to_lowercase();

    if lowercase.contains("already exists") {
        VectorIndexError::AlreadyExists(collection_name.to_string())
    } else if lowercase.contains("not found") || lowercase.contains("doesn't exist") {
        VectorIndexError::NotFound(collection_name.to_string())
    } else if lowercase.contains("transport error") || lowercase.contains("unavailable") {
        VectorIndexError::Unavailable(message)
    } else {
        VectorIndexError::Service(message)
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    #[tracing::instrument(name = "Creating a Qdrant collection", skip(self))]
    async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), VectorIndexError> {
        if self.collection_exists(collection_name).await? {
            return Err(VectorIndexError::AlreadyExists(collection_name.to_string()));
        }

        self.client
            .create_collection(&CreateCollection {
                collection_name: collection_name.to_string(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: vector_size,
                        distance: Distance::Cosine as i32,
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| classify_error(e, collection_name))?;

        info!("Created Qdrant collection {}", collection_name);
        Ok(())
    }

    #[tracing::instrument(name = "Saving points to Qdrant", skip(self, points), fields(nb_points = points.len()))]
    async fn upsert(
        &self,
        collection_name: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorIndexError> {
        // Blocking: returns once Qdrant applied the operation
        self.client
            .upsert_points_blocking(
                collection_name,
                points.into_iter().map(PointStruct::from).collect(),
                None,
            )
            .await
            .map_err(|e| classify_error(e, collection_name))?;

        Ok(())
    }

    #[tracing::instrument(name = "Searching points in Qdrant", skip(self, query), fields(limit = query.limit))]
    async fn search(
        &self,
        collection_name: &str,
        query: SearchQuery,
    ) -> Result<Vec<SearchHit>, VectorIndexError> {
        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: collection_name.to_string(),
                vector: query.vector,
                filter: query.filter.as_ref().map(payload_filter_to_qdrant),
                limit: query.limit,
                with_payload: Some(true.into()),
                ..Default::default()
            })
            .await
            .map_err(|e| classify_error(e, collection_name))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|scored_point| match SearchHit::try_from(scored_point) {
                Ok(hit) => Some(hit),
                Err(id) => {
                    warn!(?id, "Skipping a Qdrant point without a UUID id");
                    None
                }
            })
            .collect())
    }

    #[tracing::instrument(name = "Deleting points from Qdrant", skip(self))]
    async fn delete(&self, collection_name: &str, ids: &[Uuid]) -> Result<(), VectorIndexError> {
        let selector = PointsSelector {
            points_selector_one_of: Some(PointsSelectorOneOf::Points(PointsIdsList {
                ids: ids.iter().map(|id| id.to_string().into()).collect(),
            })),
        };

        self.client
            .delete_points_blocking(collection_name, &selector, None)
            .await
            .map_err(|e| classify_error(e, collection_name))?;

        Ok(())
    }
}

/// One `must` keyword match per filtered field
fn payload_filter_to_qdrant(filter: &PayloadFilter) -> Filter {
    Filter {
        must: filter
            .iter()
            .map(|(field, value)| Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: field.clone(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(value.clone())),
                    }),
                    ..Default::default()
                })),
            })
            .collect(),
        ..Default::default()
    }
}

impl From<VectorPoint> for PointStruct {
    fn from(point: VectorPoint) -> Self {
        Self {
            id: Some(point.id.to_string().into()),
            vectors: Some(point.vector.into()),
            payload: point
                .payload
                .into_iter()
                .map(|(field, value)| (field, qdrant::Value::from(value)))
                .collect(),
        }
    }
}

impl TryFrom<ScoredPoint> for SearchHit {
    /// The id of the point when it is not a UUID
    type Error = Option<qdrant::PointId>;

    fn try_from(scored_point: ScoredPoint) -> Result<Self, Self::Error> {
        let uuid = match scored_point
            .id
            .as_ref()
            .and_then(|id| id.point_id_options.as_ref())
        {
            Some(PointIdOptions::Uuid(uuid)) => Uuid::parse_str(uuid).ok(),
            _ => None,
        };
        let Some(id) = uuid else {
            return Err(scored_point.id);
        };

        Ok(SearchHit {
            id,
            score: scored_point.score,
            metadata: payload_from_qdrant(scored_point.payload),
        })
    }
}

/// Non-string values are kept as their JSON text
fn payload_from_qdrant(payload: HashMap<String, qdrant::Value>) -> Payload {
    payload
        .into_iter()
        .map(|(field, value)| {
            let value = match value_to_json(value) {
                JsonValue::String(text) => text,
                other => other.to_string(),
            };
            (field, value)
        })
        .collect()
}

fn value_to_json(value: qdrant::Value) -> JsonValue {
    match value.kind {
        Some(Kind::StringValue(text)) => JsonValue::String(text),
        Some(Kind::IntegerValue(integer)) => JsonValue::from(integer),
        Some(Kind::DoubleValue(double)) => JsonValue::from(double),
        Some(Kind::BoolValue(boolean)) => JsonValue::Bool(boolean),
        Some(Kind::StructValue(structure)) => JsonValue::Object(
            structure
                .fields
                .into_iter()
                .map(|(field, value)| (field, value_to_json(value)))
                .collect(),
        ),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.into_iter().map(value_to_json).collect())
        }
        Some(Kind::NullValue(_)) | None => JsonValue::Null,
    }
}
