pub mod groq;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use super::{ check_model_name, LlmConfig, LlmType };
use self::groq::GroqChatClient;
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;
use crate::error::CompletionError;
use crate::models::chat::ChatTurn;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A hosted chat model. It keeps no memory between calls: the whole
/// conversation goes out with every request.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        conversation: &[ChatTurn],
        options: &CompletionOptions
    ) -> Result<String, CompletionError>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, CompletionError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Groq => {
            let specific_client = GroqChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Local => {
            return Err(
                CompletionError::Config(
                    "'local' only provides embeddings; choose groq, openai or ollama".to_string()
                )
            );
        }
    };
    info!(
        "Chat client configured: Type={}, BaseURL={}",
        config.llm_type,
        config.base_url.as_deref().unwrap_or("adapter default")
    );
    Ok(client)
}

/// Builds the per-request options, falling back to the provider's default model.
pub fn completion_options(
    config: &LlmConfig,
    temperature: f32,
    max_tokens: u32
) -> Result<CompletionOptions, CompletionError> {
    let model = config
        .resolved_completion_model()
        .ok_or_else(|| {
            CompletionError::Config(format!("No completion model for provider {}", config.llm_type))
        })?;
    check_model_name(
        "Completion",
        config.llm_type,
        &model,
        config.llm_type.recognized_completion_models()
    );
    Ok(CompletionOptions { model, temperature, max_tokens })
}

pub(crate) fn bearer_http_client(api_key: &str) -> Result<reqwest::Client, CompletionError> {
    use reqwest::header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
            CompletionError::Config(format!("Invalid API key format: {}", e))
        )?
    );

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}
