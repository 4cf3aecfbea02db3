use crate::cli::Args;
use crate::config::persona::{ load_persona, PersonaConfig };
use crate::history::{ compose, normalize_text, ComposeOptions };
use crate::llm::LlmConfig;
use crate::llm::chat::{ new_client as new_chat_client, ChatClient, GenerationConfig, LlmError };
use crate::models::chat::{ Role, Turn };
use crate::models::conversation::{ AssistantReply, ConversationRecord, ConversationRequest };
use crate::store::{ initialize_record_store, RecordStore };

use chrono::{ DateTime, FixedOffset, Offset, Utc };
use log::{ debug, error, info };
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{0}")]
    ClientInput(String),
    #[error("provider call failed: {0}")]
    Provider(#[from] LlmError),
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
    #[error("unhandled error: {0}")]
    Unhandled(String),
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub max_output_tokens: u32,
    pub request_timeout: Duration,
    pub store_timeout: Duration,
    pub fallback_reply: String,
    pub strip_newlines: bool,
    pub utc_offset: FixedOffset,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: 1024,
            request_timeout: Duration::from_secs(60),
            store_timeout: Duration::from_secs(10),
            fallback_reply: "Sorry, I could not generate a proper response.".to_string(),
            strip_newlines: true,
            utc_offset: FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl AgentSettings {
    pub fn from_args(args: &Args) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let utc_offset = args.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| format!("Invalid UTC offset: {} hours", args.utc_offset_hours))?;
        Ok(Self {
            max_output_tokens: args.max_output_tokens,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            store_timeout: Duration::from_secs(args.store_timeout_secs),
            fallback_reply: args.fallback_reply.clone(),
            strip_newlines: args.strip_newlines,
            utc_offset,
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AgentError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AgentError::ClientInput(format!("{} is required", name)))
}

/// Answers one conversation request: composes the turns, asks the provider,
/// records the exchange and returns the reply.
#[derive(Clone)]
pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    record_store: Arc<dyn RecordStore>,
    persona: Arc<PersonaConfig>,
    settings: AgentSettings,
}

impl ChatAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        record_store: Arc<dyn RecordStore>,
        persona: Arc<PersonaConfig>,
        settings: AgentSettings
    ) -> Self {
        Self { chat_client, record_store, persona, settings }
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let chat_api_key = if !args.chat_api_key.is_empty() {
            Some(args.chat_api_key.clone())
        } else {
            None
        };
        let chat_config = LlmConfig {
            llm_type: args.chat_llm_type
                .parse()
                .map_err(|e| format!("Invalid chat LLM type: {}", e))?,
            base_url: args.chat_base_url.clone(),
            api_key: chat_api_key,
            completion_model: args.chat_model.clone(),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={:?}",
            chat_config.llm_type,
            chat_client.get_model(),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );

        let record_store = initialize_record_store(args)?;
        let persona = load_persona(&args.persona_path)?;
        let settings = AgentSettings::from_args(args)?;

        Ok(Self::new(chat_client, record_store, persona, settings))
    }

    fn today(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.settings.utc_offset).format("%Y-%m-%d %H:%M").to_string()
    }

    /// Composes the full turn list, including the live user message if any.
    pub fn build_turns(
        &self,
        req: &ConversationRequest,
        now: DateTime<Utc>
    ) -> Result<Vec<Turn>, AgentError> {
        required(&req.subject_id, "subjectId")?;
        let birth_datetime = required(&req.birth_date_time, "birthDateTime")?;

        let options = ComposeOptions {
            strip_newlines: self.settings.strip_newlines,
            today: self.today(now),
        };
        let mut turns = compose(
            &self.persona,
            birth_datetime,
            req.display_name.as_deref(),
            &req.prior_user_texts,
            &req.prior_assistant_texts,
            &options
        );
        if let Some(text) = req.new_user_text.as_deref().filter(|t| !t.trim().is_empty()) {
            turns.push(Turn::user(normalize_text(text, &options)));
        }

        match turns.last() {
            Some(turn) if turn.role == Role::User => Ok(turns),
            _ =>
                Err(
                    AgentError::ClientInput(
                        "a new user message is required: the conversation must end with a user turn".into()
                    )
                ),
        }
    }

    pub async fn respond(&self, req: &ConversationRequest) -> Result<AssistantReply, AgentError> {
        let now = Utc::now();
        let turns = self.build_turns(req, now)?;
        debug!("Composed {} turns ({} preamble)", turns.len(), self.persona.preamble_len());

        let (new_turn, prior_turns) = turns
            .split_last()
            .ok_or_else(|| AgentError::Unhandled("composed conversation is empty".into()))?;

        let config = GenerationConfig {
            max_output_tokens: self.settings.max_output_tokens,
            system_instruction: self.persona.system.clone(),
        };
        info!(
            "Requesting reply from {} model={} prior_turns={}",
            self.chat_client.get_llm_type(),
            self.chat_client.get_model(),
            prior_turns.len()
        );
        let generated = tokio::time
            ::timeout(
                self.settings.request_timeout,
                self.chat_client.generate(prior_turns, &new_turn.content, &config)
            ).await
            .map_err(|_| AgentError::Timeout(self.settings.request_timeout))??;

        let assistant = generated.unwrap_or_else(|| {
            info!("Provider returned no usable text, using fallback reply");
            self.settings.fallback_reply.clone()
        });

        let record = self.build_record(req, &turns, &new_turn.content, &assistant, now)?;
        match tokio::time::timeout(self.settings.store_timeout, self.record_store.put(&record)).await {
            Ok(Ok(())) => info!("Conversation record {} saved", record.record_id),
            Ok(Err(e)) => error!("Error saving conversation record {}: {}", record.record_id, e),
            Err(_) =>
                error!(
                    "Saving conversation record {} timed out after {:?}",
                    record.record_id,
                    self.settings.store_timeout
                ),
        }

        Ok(AssistantReply { assistant })
    }

    fn build_record(
        &self,
        req: &ConversationRequest,
        turns: &[Turn],
        latest_user_text: &str,
        assistant: &str,
        now: DateTime<Utc>
    ) -> Result<ConversationRecord, AgentError> {
        let conversation = serde_json
            ::to_string(turns)
            .map_err(|e| AgentError::Unhandled(format!("failed to serialize conversation: {}", e)))?;

        Ok(ConversationRecord {
            record_id: Uuid::new_v4().to_string(),
            subject_id: req.subject_id.clone().unwrap_or_default(),
            created_at: now.to_rfc3339(),
            birth_datetime: req.birth_date_time.clone().unwrap_or_default(),
            display_name: req.display_name.clone().unwrap_or_default(),
            latest_user_text: latest_user_text.to_string(),
            latest_assistant_text: assistant.to_string(),
            conversation,
        })
    }
}
