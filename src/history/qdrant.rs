use async_trait::async_trait;
use log::{ info, warn };
use std::collections::HashMap;

use qdrant_client::qdrant::Value as QdrantValue;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CollectionInfo,
    CreateCollection,
    CreateCollectionBuilder,
    Distance,
    PointStruct,
    SearchPointsBuilder,
    UpsertPointsBuilder,
    VectorParamsBuilder,
    VectorsConfig,
};

use crate::cli::Args;
use crate::error::StoreError;
use crate::history::{ HistoryStore, COLLECTION_DESCRIPTION };
use crate::models::chat::{ ChatMessage, HistoryMatch, Role };

pub struct QdrantHistoryStore {
    client: Qdrant,
    collection_name: String,
    vector_dim: u64,
}

/// The collection as found at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExistingCollection {
    Missing,
    /// `vector_size` is `None` for named-vector layouts.
    Present {
        vector_size: Option<u64>,
    },
}

fn vector_size(config: Option<&VectorsConfig>) -> Option<u64> {
    match config?.config.as_ref()? {
        VectorsConfigKind::Params(params) => Some(params.size),
        VectorsConfigKind::ParamsMap(_) => None,
    }
}

fn existing_vector_size(info: &CollectionInfo) -> Option<u64> {
    vector_size(info.config.as_ref()?.params.as_ref()?.vectors_config.as_ref())
}

/// Returns the create request when the collection is missing, nothing when
/// it already exists with a single vector of `dimension`, and an error otherwise.
fn reconcile_collection(
    name: &str,
    dimension: u64,
    existing: ExistingCollection
) -> Result<Option<CreateCollection>, StoreError> {
    match existing {
        ExistingCollection::Missing =>
            Ok(
                Some(
                    CreateCollectionBuilder::new(name)
                        .vectors_config(VectorParamsBuilder::new(dimension, Distance::Cosine))
                        .build()
                )
            ),
        ExistingCollection::Present { vector_size: Some(size) } if size == dimension => Ok(None),
        ExistingCollection::Present { vector_size: Some(size) } =>
            Err(
                StoreError::IncompatibleCollection(
                    format!("'{}' stores {}-d vectors but the embedder produces {}-d", name, size, dimension)
                )
            ),
        ExistingCollection::Present { vector_size: None } =>
            Err(
                StoreError::IncompatibleCollection(
                    format!("'{}' does not use a single unnamed vector", name)
                )
            ),
    }
}

impl QdrantHistoryStore {
    pub fn new(args: &Args) -> Result<Self, StoreError> {
        let client = Qdrant::from_url(&args.vector_host)
            .api_key(Args::non_empty(&args.vector_secret))
            .build()?;

        Ok(Self {
            client,
            collection_name: args.collection.clone(),
            vector_dim: args.dimension as u64,
        })
    }

    async fn existing_collection(&self) -> Result<ExistingCollection, StoreError> {
        if !self.client.collection_exists(&self.collection_name).await? {
            return Ok(ExistingCollection::Missing);
        }
        let info = self.client.collection_info(&self.collection_name).await?;
        Ok(ExistingCollection::Present {
            vector_size: info.result.as_ref().and_then(existing_vector_size),
        })
    }

    fn build_payload(message: &ChatMessage) -> HashMap<String, QdrantValue> {
        let mut payload = HashMap::new();
        payload.insert("role".to_string(), message.role.as_str().into());
        payload.insert("timestamp".to_string(), message.timestamp.clone().into());
        payload.insert("document".to_string(), message.content.clone().into());
        payload
    }

    fn payload_to_match(payload: &HashMap<String, QdrantValue>) -> Option<HistoryMatch> {
        let role = payload.get("role")?.as_str()?.parse::<Role>().ok()?;
        let content = payload.get("document")?.as_str()?.to_string();

        Some(HistoryMatch { content, role })
    }
}

#[async_trait]
impl HistoryStore for QdrantHistoryStore {
    async fn ensure_collection(&self) -> Result<(), StoreError> {
        let existing = self.existing_collection().await?;
        match reconcile_collection(&self.collection_name, self.vector_dim, existing)? {
            Some(create) => {
                self.client.create_collection(create).await?;
                info!(
                    "Created Qdrant history collection: {} ({}, dimension {})",
                    self.collection_name,
                    COLLECTION_DESCRIPTION,
                    self.vector_dim
                );
            }
            None => {
                info!("Qdrant history collection '{}' already exists", self.collection_name);
            }
        }
        Ok(())
    }

    async fn add(&self, message: &ChatMessage, embedding: Vec<f32>) -> Result<(), StoreError> {
        let point = PointStruct::new(message.id.clone(), embedding, Self::build_payload(message));
        self.client.upsert_points(
            UpsertPointsBuilder::new(&self.collection_name, vec![point]).wait(true)
        ).await?;

        Ok(())
    }

    async fn query(&self, embedding: Vec<f32>, k: usize) -> Result<Vec<HistoryMatch>, StoreError> {
        let response = self.client.search_points(
            SearchPointsBuilder::new(&self.collection_name, embedding, k as u64).with_payload(true)
        ).await?;

        let matches = response.result
            .iter()
            .filter_map(|point| {
                let found = Self::payload_to_match(&point.payload);
                if found.is_none() {
                    warn!("Skipping history point without usable role/document payload");
                }
                found
            })
            .collect();

        Ok(matches)
    }
}
