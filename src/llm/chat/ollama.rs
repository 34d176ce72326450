use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ ChatClient, CompletionOptions };
use crate::error::CompletionError;
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::ChatTurn;

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
    options: GenerationOptions,
}

#[derive(Serialize)]
struct GenerationOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>) -> Self {
        let url = base_url.unwrap_or_else(|| "http://localhost:11434".into());

        Self {
            http: HttpClient::new(),
            base_url: url,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        if config.llm_type != LlmType::Ollama {
            return Err(CompletionError::Config("Invalid config type for OllamaClient".into()));
        }

        Ok(Self::new(config.base_url.clone()))
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete(
        &self,
        conversation: &[ChatTurn],
        options: &CompletionOptions
    ) -> Result<String, CompletionError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let req = ChatRequest {
            model: &options.model,
            messages: conversation,
            stream: false,
            options: GenerationOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let resp = self.http
            .post(&url)
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<ChatResponse>().await?;

        resp.message.map(|m| m.content).ok_or(CompletionError::EmptyResponse)
    }
}
