use async_trait::async_trait;
use fastembed::{ EmbeddingModel, InitOptions, TextEmbedding };
use log::info;
use std::path::PathBuf;
use std::sync::{ Arc, Mutex };

use super::super::LlmConfig;
use super::{ EmbeddingClient, EmbeddingResponse };
use crate::error::EmbeddingError;

/// In-process sentence embedder. The supported models are sentence-transformer
/// exports whose fastembed post-processing is mean pooling over token vectors
/// followed by L2 normalization.
pub struct LocalEmbeddingClient {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
}

pub fn resolve_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match name.trim().to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" | "xenova/all-minilm-l6-v2" =>
            Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" | "sentence-transformers/all-minilm-l12-v2" =>
            Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" =>
            Ok(EmbeddingModel::NomicEmbedTextV15),
        other =>
            Err(
                EmbeddingError::Uninitialized(
                    format!("Unsupported local embedding model: '{}'", other)
                )
            ),
    }
}

impl LocalEmbeddingClient {
    pub fn new(model_name: String, cache_dir: Option<&str>) -> Result<Self, EmbeddingError> {
        let model = resolve_model(&model_name)?;
        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(PathBuf::from(dir));
        }

        info!("Loading local embedding model '{}'", model_name);
        let embedding = TextEmbedding::try_new(options).map_err(|e|
            EmbeddingError::Uninitialized(format!("Failed to load '{}': {}", model_name, e))
        )?;
        info!("Embedding model initialized successfully");

        Ok(Self {
            model: Arc::new(Mutex::new(embedding)),
            model_name,
        })
    }

    pub fn from_config(
        config: &LlmConfig,
        cache_dir: Option<&str>
    ) -> Result<Self, EmbeddingError> {
        let model_name = config
            .resolved_embedding_model()
            .ok_or_else(|| EmbeddingError::Uninitialized("No local embedding model".to_string()))?;
        Self::new(model_name, cache_dir)
    }
}

#[async_trait]
impl EmbeddingClient for LocalEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, EmbeddingError> {
        let model = Arc::clone(&self.model);
        let input = vec![text.to_string()];

        let mut embeddings = tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| EmbeddingError::Backend("embedding model lock poisoned".into()))?;
            guard.embed(input, None).map_err(|e| EmbeddingError::Backend(e.to_string()))
        }).await
            .map_err(|e| EmbeddingError::Backend(format!("embedding task failed: {}", e)))??;

        let embedding = embeddings
            .pop()
            .ok_or_else(||
                EmbeddingError::Backend(
                    format!("{} embedding generation returned no results", self.model_name)
                )
            )?;

        Ok(EmbeddingResponse { embedding })
    }
}
