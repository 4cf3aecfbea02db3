use serde::{ Serialize, Deserialize };

/// Inbound payload of the chat endpoint.
///
/// Every field is optional at the serde level so that a missing `subjectId` or
/// `birthDateTime` can be answered with a plain-text 400 instead of a
/// deserialization rejection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    #[serde(default, alias = "userId")]
    pub subject_id: Option<String>,
    #[serde(default, alias = "myDateTime")]
    pub birth_date_time: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, alias = "userMessages")]
    pub prior_user_texts: Vec<String>,
    #[serde(default, alias = "assistantMessages")]
    pub prior_assistant_texts: Vec<String>,
    /// Live message appended after the reconstructed history.
    #[serde(default)]
    pub new_user_text: Option<String>,
}

/// Flat record written once per exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub record_id: String,
    pub subject_id: String,
    pub created_at: String,
    pub birth_datetime: String,
    pub display_name: String,
    pub latest_user_text: String,
    pub latest_assistant_text: String,
    pub conversation: String,
}

impl ConversationRecord {
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("record_id", self.record_id.as_str()),
            ("subject_id", self.subject_id.as_str()),
            ("created_at", self.created_at.as_str()),
            ("birth_datetime", self.birth_datetime.as_str()),
            ("display_name", self.display_name.as_str()),
            ("latest_user_text", self.latest_user_text.as_str()),
            ("latest_assistant_text", self.latest_assistant_text.as_str()),
            ("conversation", self.conversation.as_str())
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub assistant: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
