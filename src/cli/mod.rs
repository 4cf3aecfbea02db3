use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Path of the chat endpoint.
    #[arg(long, env = "ROUTE_PATH", default_value = "/chat")]
    pub route_path: String,

    /// Comma-separated list of origins allowed to call the endpoint ("*" allows any).
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "*")]
    pub allowed_origins: String,

    /// Include internal error details in 500 responses.
    #[arg(long, env = "VERBOSE_ERRORS", default_value = "false")]
    pub verbose_errors: bool,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (openai, gemini)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider
    #[arg(long, env = "CHAT_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-3.5-turbo, gemini-1.5-flash-latest)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Maximum number of tokens the provider may generate per reply.
    #[arg(long, env = "MAX_OUTPUT_TOKENS", default_value = "1024")]
    pub max_output_tokens: u32,

    /// Upper bound in seconds for a single generation call.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "60")]
    pub request_timeout_secs: u64,

    /// Upper bound in seconds for writing the conversation record.
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value = "10")]
    pub store_timeout_secs: u64,

    /// Reply returned when the provider answers without usable text.
    #[arg(
        long,
        env = "FALLBACK_REPLY",
        default_value = "Sorry, I could not generate a proper response."
    )]
    pub fallback_reply: String,

    // --- Record Store Args ---
    /// Conversation record store type (redis, memory)
    #[arg(long, env = "RECORD_STORE_TYPE", default_value = "redis")]
    pub record_store_type: String,

    /// Record store endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "RECORD_STORE_HOST", default_value = "redis://127.0.0.1:6379")]
    pub record_store_host: String,

    /// Table name; used as the key prefix for stored records.
    #[arg(long, env = "RECORD_TABLE", default_value = "conversations")]
    pub record_table: String,

    // --- Persona Args ---
    /// Path to the persona configuration file.
    #[arg(long, env = "PERSONA_PATH", default_value = "json/persona.json")]
    pub persona_path: String,

    /// Remove line breaks from history texts before sending them.
    #[arg(long, env = "STRIP_NEWLINES", default_value = "true", action = clap::ArgAction::Set)]
    pub strip_newlines: bool,

    /// UTC offset in hours used to render today's date into the persona.
    #[arg(long, env = "UTC_OFFSET_HOURS", default_value = "9", allow_hyphen_values = true)]
    pub utc_offset_hours: i32,

    // --- TLS Args ---
    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect()
    }
}
