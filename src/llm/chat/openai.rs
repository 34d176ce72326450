use async_trait::async_trait;
use rllm::{
    builder::{ LLMBackend, LLMBuilder },
    chat::{ ChatMessage, ChatRole, MessageType },
};

use super::{ ChatClient, CompletionOptions };
use crate::error::CompletionError;
use crate::llm::LlmConfig;
use crate::models::chat::{ ChatTurn, Role };

/// OpenAI chat completions through rllm. Temperature and token limits are
/// builder settings there, so a provider is built per request.
pub struct OpenAIChatClient {
    api_key: String,
    base_url: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self { api_key, base_url }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| CompletionError::Config("OpenAI API key is required".to_string()))?;

        Ok(Self::new(api_key, config.base_url.clone()))
    }
}

fn to_rllm_messages(conversation: &[ChatTurn]) -> Vec<ChatMessage> {
    conversation
        .iter()
        .map(|turn| ChatMessage {
            role: match turn.role {
                Role::User => ChatRole::User,
                Role::Assistant => ChatRole::Assistant,
            },
            content: turn.content.clone(),
            message_type: MessageType::Text,
        })
        .collect()
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        conversation: &[ChatTurn],
        options: &CompletionOptions
    ) -> Result<String, CompletionError> {
        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::OpenAI)
            .api_key(self.api_key.clone())
            .model(&options.model)
            .temperature(options.temperature)
            .max_tokens(options.max_tokens);

        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.clone());
        }

        let provider = builder.build().map_err(|e| CompletionError::Config(e.to_string()))?;
        let messages = to_rllm_messages(conversation);

        let resp = provider
            .chat(&messages).await
            .map_err(|e| CompletionError::Provider(e.to_string()))?;

        resp.text().ok_or(CompletionError::EmptyResponse)
    }
}
