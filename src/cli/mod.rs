use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Interface the HTTP server binds to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (openai, deepseek, groq, xai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., https://api.openai.com)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let the provider type decide
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider. Only checked when /chat is called.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-4o-mini, llama3)
    #[arg(long, env = "COACH_MODEL", default_value = "gpt-4o-mini")]
    pub chat_model: String,

    /// Temperature used when a chat request does not carry a numeric one.
    #[arg(long, env = "COACH_TEMPERATURE", default_value = "0.6")]
    pub default_temperature: f64,

    /// Upper bound in seconds for a single upstream completion call. 0 means no timeout.
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value = "60")]
    pub chat_timeout_secs: u64,

    // --- Conversation Store Args ---
    /// Conversation store backend (memory)
    #[arg(long, env = "STORE_TYPE", default_value = "memory")]
    pub store_type: String,

    /// Maximum number of users kept in the store. 0 means unbounded.
    #[arg(long, env = "STORE_MAX_USERS", default_value = "0")]
    pub store_max_users: usize,

    /// Seconds after its last sync before a user's conversations expire. 0 means no TTL.
    #[arg(long, env = "STORE_TTL_SECS", default_value = "0")]
    pub store_ttl_secs: u64,
}
