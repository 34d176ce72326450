pub mod local;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::error::EmbeddingError;
use super::{ check_model_name, LlmConfig, LlmType };
use self::local::LocalEmbeddingClient;
use self::ollama::OllamaEmbeddingClient;
use self::openai::OpenAIEmbeddingClient;

#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
}

/// Raw model access. Implementations return whatever the model produces;
/// [`Embedder`] enforces dimensionality and unit length on top.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, EmbeddingError>;
}

pub fn new_client(
    config: &LlmConfig,
    dimension: usize,
    cache_dir: Option<&str>
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingError> {
    if let Some(model) = config.resolved_embedding_model() {
        check_model_name(
            "Embedding",
            config.llm_type,
            &model,
            config.llm_type.recognized_embedding_models()
        );
    }
    let client: Arc<dyn EmbeddingClient> = match config.llm_type {
        LlmType::Local => {
            let specific_client = LocalEmbeddingClient::from_config(config, cache_dir)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaEmbeddingClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI => {
            let specific_client = OpenAIEmbeddingClient::from_config(config, dimension)?;
            Arc::new(specific_client)
        }
        LlmType::Groq => {
            return Err(
                EmbeddingError::Uninitialized(
                    "Groq does not serve embeddings; choose local, ollama or openai".to_string()
                )
            );
        }
    };
    info!(
        "Embedding client configured: Type={}, Model={}",
        config.llm_type,
        config.resolved_embedding_model().as_deref().unwrap_or("adapter default")
    );
    Ok(client)
}

/// Scales `vector` to unit L2 norm in place.
pub fn l2_normalize(vector: &mut [f32]) -> Result<(), EmbeddingError> {
    let norm = vector
        .iter()
        .map(|v| v * v)
        .sum::<f32>()
        .sqrt();
    if !norm.is_finite() || norm <= f32::EPSILON {
        return Err(EmbeddingError::Degenerate);
    }
    for v in vector.iter_mut() {
        *v /= norm;
    }
    Ok(())
}

/// The embedder handed to the vector store adapter. Same input, same model,
/// same unit vector.
#[derive(Clone)]
pub struct Embedder {
    client: Arc<dyn EmbeddingClient>,
    dimension: usize,
}

impl Embedder {
    pub fn new(client: Arc<dyn EmbeddingClient>, dimension: usize) -> Self {
        Self { client, dimension }
    }

    /// Embeds a fixed sample once so a model whose output size differs from
    /// the collection dimension is caught before serving.
    pub async fn verify_dimension(&self) -> Result<(), EmbeddingError> {
        self.embed("dimension check").await.map(|_| ())
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        let mut vector = self.client.embed(text).await?.embedding;
        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        l2_normalize(&mut vector)?;
        Ok(vector)
    }
}
