use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- HTTP Server Args ---
    /// Address the HTTP server binds to.
    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    pub http_host: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Directory of static front-end assets served alongside the API.
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: String,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (groq, openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "groq")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., https://api.groq.com/openai/v1)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider (required for groq and openai)
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., llama-3.3-70b-versatile, gpt-4o-mini)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on provider defaults if None
    pub chat_model: Option<String>,

    /// Sampling temperature for chat completion.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.7")]
    pub chat_temperature: f32,

    /// Maximum number of tokens the model may generate per reply.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "1024")]
    pub chat_max_tokens: u32,

    // --- Embedding Provider Args ---
    /// Type of provider for text embedding (local, openai, ollama)
    #[arg(long, env = "EMBEDDING_LLM_TYPE", default_value = "local")]
    pub embedding_llm_type: String,

    /// Base URL for a remote embedding provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "EMBEDDING_BASE_URL")]
    pub embedding_base_url: Option<String>,

    /// API Key for a remote embedding provider (e.g., OpenAI)
    #[arg(long, env = "EMBEDDING_API_KEY", default_value = "")]
    pub embedding_api_key: String,

    /// Model name for text embedding (e.g., all-MiniLM-L6-v2, text-embedding-3-small)
    #[arg(long, env = "EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Where the local embedding model is downloaded and cached.
    #[arg(long, env = "EMBEDDING_CACHE_DIR")]
    pub embedding_cache_dir: Option<String>,

    // --- Vector Store Args ---
    /// Vector database type (chroma, qdrant)
    #[arg(short = 't', long, env = "VECTOR_TYPE", default_value = "chroma")]
    pub vector_type: String,

    /// Vector database URL/host endpoint (e.g., http://localhost:8000)
    #[arg(long, env = "VECTOR_HOST", default_value = "http://localhost:8000")]
    pub vector_host: String,

    /// API key/token for vector database authentication (Chroma, Qdrant)
    #[arg(short = 'k', long, env = "VECTOR_SECRET", default_value = "")]
    pub vector_secret: String,

    /// Tenant name for multi-tenant vector databases (Chroma)
    #[arg(long, env = "VECTOR_TENANT", default_value = "default_tenant")]
    pub vector_tenant: String,

    /// Target database name for vector store (Chroma)
    #[arg(long, env = "VECTOR_DATABASE", default_value = "default_database")]
    pub vector_database: String,

    /// Collection holding the chat history records.
    #[arg(long, env = "VECTOR_COLLECTION", default_value = "chat_history")]
    pub collection: String,

    /// Vector dimension size. Must match the embedding model output.
    #[arg(long, env = "VECTOR_DIMENSION", default_value = "384")]
    pub dimension: usize,

    /// Number of similar past messages pulled into each prompt.
    #[arg(long, env = "HISTORY_LIMIT", default_value = "5", value_parser = clap::value_parser!(u16).range(1..))]
    pub history_limit: u16,

    // --- TLS Args ---
    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.port)
    }

    pub(crate) fn non_empty(value: &str) -> Option<String> {
        Some(value.to_string()).filter(|v| !v.trim().is_empty())
    }
}
