// src/models/chat.rs
use serde::{Deserialize, Deserializer, Serialize};

pub type ChatId = i64;
pub type UserId = i64;

/// Title every chat starts with until the first prompt renames it
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            sources,
        }
    }
}

/// Sidebar entry. `POST /chats/create` returns the whole row, extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(default = "default_title", deserialize_with = "nullable_title")]
    pub title: String,
}

impl Chat {
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_CHAT_TITLE
    }
}

/// Payload of `GET /chats/get/{chat_id}`; the log is stored server-side as a JSON string.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRecord {
    pub id: ChatId,
    #[serde(default = "default_title", deserialize_with = "nullable_title")]
    pub title: String,
    #[serde(default)]
    pub messages: Option<String>,
}

impl ChatRecord {
    /// Decode the embedded message log. A missing or blank log is an empty chat.
    pub fn messages(&self) -> Result<Vec<Message>, serde_json::Error> {
        match self.messages.as_deref().map(str::trim) {
            None | Some("") => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateChatRequest<'a> {
    pub user_id: UserId,
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateTitleRequest<'a> {
    pub chat_id: ChatId,
    pub title: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppendMessageRequest {
    pub chat_id: ChatId,
    pub role: Role,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl AppendMessageRequest {
    pub fn from_message(chat_id: ChatId, message: &Message) -> Self {
        let sources = match message.role {
            Role::User => None,
            Role::Assistant => Some(message.sources.clone()),
        };
        Self {
            chat_id,
            role: message.role,
            text: message.text.clone(),
            sources,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default, deserialize_with = "nullable_sources")]
    pub sources: Vec<String>,
}

fn default_title() -> String {
    DEFAULT_CHAT_TITLE.to_string()
}

fn nullable_title<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let title: Option<String> = Option::deserialize(deserializer)?;
    Ok(title.unwrap_or_else(default_title))
}

fn nullable_sources<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let sources: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(sources.unwrap_or_default())
}
