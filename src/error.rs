use thiserror::Error;

/// Failures turning text into a unit-length vector.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,
    #[error("embedding model is not initialized: {0}")]
    Uninitialized(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding has zero or non-finite norm")]
    Degenerate,
    #[error("embedding backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("vector store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed vector store response: {0}")]
    Malformed(String),
    #[error("incompatible vector collection: {0}")]
    IncompatibleCollection(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for StoreError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion provider error: {0}")]
    Provider(String),
    #[error("completion provider returned no choices")]
    EmptyResponse,
    #[error("completion client misconfigured: {0}")]
    Config(String),
}

/// Outcome of a chat request that reaches the caller. Store failures never
/// appear here; they are logged and masked inside the orchestrator.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}
