use async_trait::async_trait;
use rllm::{ builder::{ LLMBackend, LLMBuilder }, LLMProvider };
use super::super::LlmConfig;
use super::{ EmbeddingClient, EmbeddingResponse };
use crate::error::EmbeddingError;

pub struct OpenAIEmbeddingClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
}

impl OpenAIEmbeddingClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        dimensions: Option<u32>
    ) -> Result<Self, EmbeddingError> {
        let model_name = model.unwrap_or_else(|| "text-embedding-3-small".to_string());

        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::OpenAI)
            .api_key(api_key)
            .model(&model_name);

        if let Some(url) = base_url {
            builder = builder.base_url(url);
        }
        if let Some(dims) = dimensions {
            builder = builder.embedding_dimensions(dims);
        }

        let llm = builder.build().map_err(|e| EmbeddingError::Uninitialized(e.to_string()))?;

        Ok(Self { llm })
    }

    /// `dimension` is forwarded to models that can be shortened to the
    /// collection's size.
    pub fn from_config(config: &LlmConfig, dimension: usize) -> Result<Self, EmbeddingError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| {
                EmbeddingError::Uninitialized(
                    "OpenAI API key is required for OpenAIEmbeddingClient".to_string()
                )
            })?;
        let model = config.resolved_embedding_model();
        let dimensions = model
            .as_deref()
            .filter(|m| supports_shortening(m))
            .and_then(|_| u32::try_from(dimension).ok());

        Self::new(api_key, model, config.base_url.clone(), dimensions)
    }
}

/// Only the text-embedding-3 family accepts a `dimensions` parameter; older
/// models reject requests that carry it.
fn supports_shortening(model: &str) -> bool {
    model.starts_with("text-embedding-3")
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, EmbeddingError> {
        let mut embeddings = self.llm
            .embed(vec![text.to_string()]).await
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| {
                EmbeddingError::Backend("OpenAI embedding generation returned no results".into())
            })?;

        Ok(EmbeddingResponse { embedding })
    }
}
