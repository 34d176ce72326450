use async_trait::async_trait;
use rllm::{ builder::{ LLMBackend, LLMBuilder }, LLMProvider };
use super::{ EmbeddingClient, EmbeddingResponse };
use super::super::LlmConfig;
use crate::error::EmbeddingError;

pub struct OllamaEmbeddingClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
}

impl OllamaEmbeddingClient {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Result<Self, EmbeddingError> {
        let url = base_url.unwrap_or_else(|| "http://localhost:11434".to_string());
        let embed_model = model.unwrap_or_else(|| "nomic-embed-text".to_string());

        let llm = LLMBuilder::new()
            .backend(LLMBackend::Ollama)
            .base_url(url)
            .model(embed_model)
            .stream(false)
            .build()
            .map_err(|e| EmbeddingError::Uninitialized(e.to_string()))?;

        Ok(Self { llm })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, EmbeddingError> {
        Self::new(config.base_url.clone(), config.resolved_embedding_model())
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, EmbeddingError> {
        let mut embeddings = self.llm
            .embed(vec![text.to_string()]).await
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| {
                EmbeddingError::Backend("Ollama embedding generation returned no results".into())
            })?;

        Ok(EmbeddingResponse { embedding })
    }
}
