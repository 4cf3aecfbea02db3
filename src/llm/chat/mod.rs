pub mod openai;
pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use super::{ LlmConfig, LlmType };
use self::openai::OpenAIChatClient;
use self::gemini::GeminiChatClient;
use crate::models::chat::Turn;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM configuration error: {0}")]
    Config(String),
    #[error("LLM HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub system_instruction: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 1024,
            system_instruction: None,
        }
    }
}

/// One chat provider. `prior_turns` is the context, `new_message` the user
/// turn to answer. `Ok(None)` means the call succeeded but carried no text.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn generate(
        &self,
        prior_turns: &[Turn],
        new_message: &str,
        config: &GenerationConfig
    ) -> Result<Option<String>, LlmError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
    fn get_llm_type(&self) -> LlmType;
}

/// Maps blank provider output to `None`; other text is returned as-is.
pub fn usable_text(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}
