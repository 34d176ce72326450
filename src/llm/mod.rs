pub mod chat;
pub mod embedding;
use log::warn;
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    /// In-process model, embeddings only.
    Local,
    Ollama,
    OpenAI,
    Groq,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLlmTypeError {
    message: String,
}

impl fmt::Display for ParseLlmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLlmTypeError {}

impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(LlmType::Local),
            "ollama" => Ok(LlmType::Ollama),
            "openai" => Ok(LlmType::OpenAI),
            "groq" => Ok(LlmType::Groq),
            _ =>
                Err(ParseLlmTypeError {
                    message: format!("Invalid LLM type: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmType::Local => "local",
            LlmType::Ollama => "ollama",
            LlmType::OpenAI => "openai",
            LlmType::Groq => "groq",
        };
        f.write_str(name)
    }
}

impl LlmType {
    pub fn default_completion_model(&self) -> Option<&'static str> {
        match self {
            LlmType::Local => None,
            LlmType::Ollama => Some("llama3.1"),
            LlmType::OpenAI => Some("gpt-4o-mini"),
            LlmType::Groq => Some("llama-3.3-70b-versatile"),
        }
    }

    /// Completion models known to be served by the provider. Empty means any
    /// name is plausible (self-hosted catalogues).
    pub fn recognized_completion_models(&self) -> &'static [&'static str] {
        match self {
            LlmType::Local | LlmType::Ollama => &[],
            LlmType::OpenAI => &["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini", "gpt-4.1-nano"],
            LlmType::Groq =>
                &[
                    "llama-3.3-70b-versatile",
                    "llama-3.1-8b-instant",
                    "gemma2-9b-it",
                    "mixtral-8x7b-32768",
                ],
        }
    }

    pub fn default_embedding_model(&self) -> Option<&'static str> {
        match self {
            LlmType::Local => Some("all-MiniLM-L6-v2"),
            LlmType::Ollama => Some("nomic-embed-text"),
            LlmType::OpenAI => Some("text-embedding-3-small"),
            LlmType::Groq => None,
        }
    }

    pub fn recognized_embedding_models(&self) -> &'static [&'static str] {
        match self {
            LlmType::Local =>
                &["all-MiniLM-L6-v2", "all-MiniLM-L12-v2", "bge-small-en-v1.5", "nomic-embed-text-v1.5"],
            LlmType::Ollama => &[],
            LlmType::OpenAI => &["text-embedding-3-small", "text-embedding-3-large"],
            LlmType::Groq => &[],
        }
    }
}

/// Warns when a configured model is not in the provider's known list.
/// The name is still used; provider catalogues move faster than releases.
pub(crate) fn check_model_name(kind: &str, llm_type: LlmType, model: &str, recognized: &[&str]) {
    if !recognized.is_empty() && !recognized.contains(&model) {
        warn!(
            "{} model '{}' is not a recognized {} model (known: {}). Using it anyway.",
            kind,
            model,
            llm_type,
            recognized.join(", ")
        );
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub embedding_model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            llm_type: LlmType::Groq,
            api_key: None,
            completion_model: None,
            embedding_model: None,
            base_url: None,
        }
    }
}

impl LlmConfig {
    pub fn resolved_completion_model(&self) -> Option<String> {
        self.completion_model
            .clone()
            .or_else(|| self.llm_type.default_completion_model().map(str::to_string))
    }

    pub fn resolved_embedding_model(&self) -> Option<String> {
        self.embedding_model
            .clone()
            .or_else(|| self.llm_type.default_embedding_model().map(str::to_string))
    }
}

pub fn parse_llm_type(type_str: &str) -> Result<LlmType, String> {
    type_str.parse::<LlmType>().map_err(|_| format!("Unsupported LLM type: {}", type_str))
}
