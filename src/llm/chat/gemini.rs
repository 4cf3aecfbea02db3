use async_trait::async_trait;
use log::{ debug, info };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ usable_text, ChatClient, GenerationConfig, LlmError };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::{ Role, Turn };

const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

fn content(role: Option<&str>, text: &str) -> GeminiContent {
    GeminiContent {
        role: role.map(str::to_string),
        parts: vec![GeminiPart { text: Some(text.to_string()) }],
    }
}

/// Gemini has no system role inside `contents`; system turns are lifted into
/// the system instruction and the rest keep their order. Assistant turns use
/// the `model` role.
fn build_request(
    prior_turns: &[Turn],
    new_message: &str,
    config: &GenerationConfig
) -> GeminiRequest {
    let mut system_parts: Vec<String> = config.system_instruction.iter().cloned().collect();
    let mut contents = Vec::with_capacity(prior_turns.len() + 1);

    for turn in prior_turns {
        let role = match turn.role {
            Role::System => {
                system_parts.push(turn.content.clone());
                continue;
            }
            Role::User => "user",
            Role::Assistant => "model",
        };
        contents.push(content(Some(role), &turn.content));
    }
    contents.push(content(Some("user"), new_message));

    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(content(None, &system_parts.join("\n\n")))
    };

    GeminiRequest {
        system_instruction,
        contents,
        generation_config: GeminiGenerationConfig {
            max_output_tokens: config.max_output_tokens,
        },
    }
}

fn extract_text(resp: GeminiResponse) -> Option<String> {
    let parts = resp.candidates.into_iter().next()?.content?.parts;
    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    Some(text)
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("Google API key is required for GeminiChatClient".into()));
        }
        Ok(Self {
            http: HttpClient::builder().build()?,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| LlmError::Config("Google API key is required for GeminiChatClient".into()))?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn generate(
        &self,
        prior_turns: &[Turn],
        new_message: &str,
        config: &GenerationConfig
    ) -> Result<Option<String>, LlmError> {
        let payload = build_request(prior_turns, new_message, config);
        info!(
            "GeminiChatClient::generate() → model={} base_url={} turns={}",
            self.model,
            self.base_url,
            payload.contents.len()
        );

        let resp = self.http
            .post(self.generate_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json::<GeminiResponse>()
            .await?;

        let text = extract_text(resp);
        if text.is_none() {
            debug!("Gemini response carried no candidate content");
        }
        Ok(usable_text(text))
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn get_llm_type(&self) -> LlmType {
        LlmType::Gemini
    }
}
