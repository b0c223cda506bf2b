// src/error.rs
use thiserror::Error;

use crate::models::ChatId;

/// Failure of a single call to the chat backend.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Server unreachable: {0}")]
    Unreachable(String),
    #[error("Backend returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },
    #[error("Unexpected response body: {0}")]
    Decode(String),
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            ClientError::Unreachable(err.to_string())
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("State file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("State file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("No state file location: set COMMBOT_STATE_FILE")]
    NoStateDir,
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// Rejection text from the server, shown to the user as is.
    #[error("{0}")]
    Rejected(String),
    #[error("Server unreachable.")]
    Unreachable,
    #[error("Login succeeded but the server sent no user id")]
    MissingUserId,
    #[error(transparent)]
    Client(ClientError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The step of the send sequence that failed.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Could not save your message: {0}")]
    PersistUser(ClientError),
    #[error("Could not get an answer: {0}")]
    Generate(ClientError),
    #[error("Answer received but not saved: {0}")]
    PersistAssistant(ClientError),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not logged in")]
    Unauthenticated,
    #[error("Chat {0} is not in the chat list")]
    UnknownChat(ChatId),
    #[error("A message is already being answered")]
    SendInProgress,
    #[error("Chat {chat_id} has an unreadable message log: {reason}")]
    CorruptLog { chat_id: ChatId, reason: String },
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Cannot read attachment: {0}")]
    Attachment(#[from] std::io::Error),
}
