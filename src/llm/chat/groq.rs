use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ bearer_http_client, ChatClient, CompletionOptions };
use crate::error::CompletionError;
use crate::llm::LlmConfig;
use crate::models::chat::ChatTurn;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct GroqChatClient {
    http: HttpClient,
    base_url: String,
}

#[derive(Serialize, Deserialize)]
struct GroqMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct GroqRequest {
    messages: Vec<GroqMessage>,
    model: String,
    temperature: f32,
    #[serde(rename = "max_tokens")]
    max_tokens: u32,
}

#[derive(Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: GroqMessage,
}

impl GroqRequest {
    fn new(conversation: &[ChatTurn], options: &CompletionOptions) -> Self {
        Self {
            messages: conversation
                .iter()
                .map(|turn| GroqMessage {
                    role: turn.role.to_string(),
                    content: turn.content.clone(),
                })
                .collect(),
            model: options.model.clone(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }
}

impl GroqResponse {
    fn into_reply(self) -> Result<String, CompletionError> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}

impl GroqChatClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, CompletionError> {
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = bearer_http_client(&api_key)?;

        Ok(Self { http, base_url: api_url })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| CompletionError::Config("Groq API key is required".to_string()))?;

        Self::new(api_key, config.base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatClient for GroqChatClient {
    async fn complete(
        &self,
        conversation: &[ChatTurn],
        options: &CompletionOptions
    ) -> Result<String, CompletionError> {
        let url = self.endpoint();
        let req = GroqRequest::new(conversation, options);
        debug!("Groq request: model={}, messages={}", req.model, req.messages.len());

        let resp = self.http
            .post(&url)
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<GroqResponse>().await?;

        resp.into_reply()
    }
}
