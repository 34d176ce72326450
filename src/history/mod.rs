pub mod chroma;
pub mod qdrant;

use async_trait::async_trait;
use log::{ debug, info, warn };
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::error::{ EmbeddingError, StoreError };
use crate::llm::embedding::Embedder;
use crate::models::chat::{ ChatMessage, HistoryMatch };

pub const COLLECTION_DESCRIPTION: &str = "Store chat history embeddings";

/// A collection in an external vector database.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Creates the collection when it does not exist yet.
    async fn ensure_collection(&self) -> Result<(), StoreError>;

    /// Writes one record: id, embedding, `{role, timestamp}` metadata, content as document.
    async fn add(&self, message: &ChatMessage, embedding: Vec<f32>) -> Result<(), StoreError>;

    /// The `k` nearest records, most similar first.
    async fn query(&self, embedding: Vec<f32>, k: usize) -> Result<Vec<HistoryMatch>, StoreError>;
}

/// What a similarity lookup produced. Lookups never fail the request; an
/// unreachable store shows up here as `Unavailable`.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryLookup {
    Found(Vec<HistoryMatch>),
    NoMatches,
    Unavailable(String),
}

/// Vector store adapter: embeds text and talks to the backing collection.
#[derive(Clone)]
pub struct ChatMemory {
    embedder: Embedder,
    store: Arc<dyn HistoryStore>,
}

impl ChatMemory {
    pub fn new(embedder: Embedder, store: Arc<dyn HistoryStore>) -> Self {
        Self { embedder, store }
    }

    pub async fn verify_embedder(&self) -> Result<(), EmbeddingError> {
        self.embedder.verify_dimension().await
    }

    pub async fn store(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let embedding = self.embedder.embed(&message.content).await?;
        self.store.add(message, embedding).await
    }

    pub async fn query_similar(&self, text: &str, k: usize) -> HistoryLookup {
        if k == 0 {
            return HistoryLookup::NoMatches;
        }
        let embedding = match self.embedder.embed(text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Error embedding history query: {}", e);
                return HistoryLookup::Unavailable(e.to_string());
            }
        };
        match self.store.query(embedding, k).await {
            Ok(matches) if matches.is_empty() => HistoryLookup::NoMatches,
            Ok(matches) => {
                debug!("Retrieved {} related messages", matches.len());
                HistoryLookup::Found(matches)
            }
            Err(e) => {
                warn!("Error retrieving chat history: {}", e);
                HistoryLookup::Unavailable(e.to_string())
            }
        }
    }
}

pub fn create_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    match args.vector_type.trim().to_lowercase().as_str() {
        "chroma" => {
            let store = chroma::ChromaHistoryStore::new(args)?;
            Ok(Arc::new(store))
        }
        "qdrant" => {
            let store = qdrant::QdrantHistoryStore::new(args)?;
            Ok(Arc::new(store))
        }
        _ => Err(format!("Unsupported vector store type: {}", args.vector_type).into()),
    }
}

pub async fn initialize_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    info!(
        "Chat history will be stored in: {} at {} (collection '{}')",
        args.vector_type,
        args.vector_host,
        args.collection
    );
    let store = create_history_store(args)?;
    store.ensure_collection().await.map_err(|e| format!("Error initializing vector DB: {}", e))?;
    info!("Vector DB initialized successfully");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;
    use crate::test_support::{ memory_with, HashEmbeddingClient, RecordingStore };

    #[tokio::test]
    async fn store_embeds_content_and_writes_one_record() {
        let store = Arc::new(RecordingStore::default());
        let memory = memory_with(store.clone());
        let message = ChatMessage::new(Role::User, "remember this");

        memory.store(&message).await.unwrap();

        let added = store.added();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].0.id, message.id);
        assert_eq!(added[0].0.content, "remember this");
        assert_eq!(added[0].1.len(), HashEmbeddingClient::DIM);
    }

    #[tokio::test]
    async fn query_keeps_backend_order() {
        let matches = vec![
            HistoryMatch { content: "closest".into(), role: Role::User },
            HistoryMatch { content: "further".into(), role: Role::Assistant }
        ];
        let store = Arc::new(RecordingStore::with_matches(matches.clone()));
        let memory = memory_with(store.clone());

        assert_eq!(memory.query_similar("question", 5).await, HistoryLookup::Found(matches));
        assert_eq!(store.queried_k(), vec![5]);
    }

    #[tokio::test]
    async fn empty_and_failed_lookups_degrade_to_no_history() {
        let empty = memory_with(Arc::new(RecordingStore::default()));
        assert_eq!(empty.query_similar("question", 5).await, HistoryLookup::NoMatches);

        let down = memory_with(Arc::new(RecordingStore::unavailable()));
        let lookup = down.query_similar("question", 5).await;
        assert!(matches!(lookup, HistoryLookup::Unavailable(_)));
    }

    #[tokio::test]
    async fn zero_k_skips_the_backend() {
        let store = Arc::new(RecordingStore::default());
        let memory = memory_with(store.clone());
        assert_eq!(memory.query_similar("question", 0).await, HistoryLookup::NoMatches);
        assert!(store.queried_k().is_empty());
    }

    #[tokio::test]
    async fn unembeddable_text_is_not_written() {
        let store = Arc::new(RecordingStore::default());
        let memory = memory_with(store.clone());
        let err = memory.store(&ChatMessage::new(Role::User, "   ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Embedding(_)));
        assert!(store.added().is_empty());
    }
}
