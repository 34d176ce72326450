//! Recording doubles for the three external collaborators.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{ Hash, Hasher };
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };

use crate::agent::ChatAgent;
use crate::error::{ CompletionError, EmbeddingError, StoreError };
use crate::history::{ ChatMemory, HistoryStore };
use crate::llm::chat::{ ChatClient, CompletionOptions };
use crate::llm::embedding::{ Embedder, EmbeddingClient, EmbeddingResponse };
use crate::models::chat::{ ChatMessage, ChatTurn, HistoryMatch };

/// Deterministic pseudo-embeddings derived from a hash of the text.
pub struct HashEmbeddingClient {
    dim: usize,
    calls: AtomicUsize,
}

impl HashEmbeddingClient {
    pub const DIM: usize = 12;

    pub fn new(dim: usize) -> Self {
        Self { dim, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let embedding = (0..self.dim)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                (i, text).hash(&mut hasher);
                ((hasher.finish() % 1000) as f32) / 1000.0 + 0.1
            })
            .collect();
        Ok(EmbeddingResponse { embedding })
    }
}

#[derive(Default)]
pub struct RecordingStore {
    matches: Vec<HistoryMatch>,
    query_fails: bool,
    add_fails: bool,
    added: Mutex<Vec<(ChatMessage, Vec<f32>)>>,
    queried: Mutex<Vec<usize>>,
    add_attempts: AtomicUsize,
}

impl RecordingStore {
    pub fn with_matches(matches: Vec<HistoryMatch>) -> Self {
        Self { matches, ..Default::default() }
    }

    pub fn unavailable() -> Self {
        Self { query_fails: true, add_fails: true, ..Default::default() }
    }

    pub fn rejecting_writes() -> Self {
        Self { add_fails: true, ..Default::default() }
    }

    pub fn added(&self) -> Vec<(ChatMessage, Vec<f32>)> {
        self.added.lock().unwrap().clone()
    }

    pub fn queried_k(&self) -> Vec<usize> {
        self.queried.lock().unwrap().clone()
    }

    pub fn add_attempts(&self) -> usize {
        self.add_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryStore for RecordingStore {
    async fn ensure_collection(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn add(&self, message: &ChatMessage, embedding: Vec<f32>) -> Result<(), StoreError> {
        self.add_attempts.fetch_add(1, Ordering::SeqCst);
        if self.add_fails {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.added.lock().unwrap().push((message.clone(), embedding));
        Ok(())
    }

    async fn query(&self, _embedding: Vec<f32>, k: usize) -> Result<Vec<HistoryMatch>, StoreError> {
        self.queried.lock().unwrap().push(k);
        if self.query_fails {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(self.matches.iter().take(k).cloned().collect())
    }
}

pub struct StubChatClient {
    reply: Option<String>,
    calls: Mutex<Vec<(Vec<ChatTurn>, CompletionOptions)>>,
}

impl StubChatClient {
    pub fn replying(reply: &str) -> Self {
        Self { reply: Some(reply.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { reply: None, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<(Vec<ChatTurn>, CompletionOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for StubChatClient {
    async fn complete(
        &self,
        conversation: &[ChatTurn],
        options: &CompletionOptions
    ) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push((conversation.to_vec(), options.clone()));
        self.reply.clone().ok_or_else(|| CompletionError::Provider("quota exceeded".into()))
    }
}

pub fn memory_with(store: Arc<RecordingStore>) -> ChatMemory {
    let embedder = Embedder::new(
        Arc::new(HashEmbeddingClient::new(HashEmbeddingClient::DIM)),
        HashEmbeddingClient::DIM
    );
    ChatMemory::new(embedder, store)
}

pub fn agent_with(chat: Arc<StubChatClient>, store: Arc<RecordingStore>) -> ChatAgent {
    let options = CompletionOptions {
        model: "test-model".to_string(),
        temperature: 0.7,
        max_tokens: 1024,
    };
    ChatAgent::new(chat, memory_with(store), options, 5)
}
