// src/backend_client.rs
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ClientError;
use crate::models::{
    AppendMessageRequest, AskResponse, AuthResponse, Chat, ChatId, ChatRecord, CreateChatRequest,
    Credentials, UpdateTitleRequest, UserId,
};
use crate::session::attachments::FileAttachment;

/// Everything `/ask` needs: the prompt plus the staged attachments, scoped to one chat.
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub chat_id: ChatId,
    pub prompt: String,
    pub urls: Vec<String>,
    pub files: Vec<FileAttachment>,
}

/// The remote chat store, answer generator and auth service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_chats(&self, user_id: UserId) -> Result<Vec<Chat>, ClientError>;
    async fn get_chat(&self, chat_id: ChatId) -> Result<ChatRecord, ClientError>;
    async fn create_chat(&self, user_id: UserId, title: &str) -> Result<Chat, ClientError>;
    async fn update_title(&self, chat_id: ChatId, title: &str) -> Result<(), ClientError>;
    async fn append_message(&self, request: &AppendMessageRequest) -> Result<(), ClientError>;
    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ClientError>;
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ClientError>;
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError>;
    async fn signup(&self, credentials: &Credentials) -> Result<(), ClientError>;
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::from)?;
        info!("🔌 Chat backend at {}", config.backend_url);
        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-2xx response into `ClientError::Status`, keeping the server's `detail`.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body);
        warn!("Backend error {}: {}", status, detail.as_deref().unwrap_or("<empty>"));
        Err(ClientError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            error!("Unexpected backend payload: {} ({})", e, body);
            ClientError::from(e)
        })
    }
}

/// Extract the FastAPI-style `detail` of an error body.
fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(detail)) => Some(detail.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        },
        Err(_) => Some(trimmed.to_string()),
    }
}

fn file_part(file: &FileAttachment) -> Result<Part, ClientError> {
    let mime = mime_guess::from_path(&file.name).first_or_octet_stream();
    Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(mime.essence_str())
        .map_err(ClientError::from)
}

#[async_trait]
impl ChatBackend for BackendClient {
    async fn list_chats(&self, user_id: UserId) -> Result<Vec<Chat>, ClientError> {
        debug!("GET /chats/{}", user_id);
        let response = self.client.get(self.url(&format!("/chats/{}", user_id))).send().await?;
        Self::decode(response).await
    }

    async fn get_chat(&self, chat_id: ChatId) -> Result<ChatRecord, ClientError> {
        debug!("GET /chats/get/{}", chat_id);
        let response = self
            .client
            .get(self.url(&format!("/chats/get/{}", chat_id)))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn create_chat(&self, user_id: UserId, title: &str) -> Result<Chat, ClientError> {
        debug!("POST /chats/create for user {}", user_id);
        let response = self
            .client
            .post(self.url("/chats/create"))
            .json(&CreateChatRequest { user_id, title })
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn update_title(&self, chat_id: ChatId, title: &str) -> Result<(), ClientError> {
        debug!("POST /chats/update_title {} -> {:?}", chat_id, title);
        let response = self
            .client
            .post(self.url("/chats/update_title"))
            .json(&UpdateTitleRequest { chat_id, title })
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn append_message(&self, request: &AppendMessageRequest) -> Result<(), ClientError> {
        debug!("POST /chats/append {} ({})", request.chat_id, request.role.as_str());
        let response = self
            .client
            .post(self.url("/chats/append"))
            .json(request)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ClientError> {
        debug!("DELETE /chats/{}", chat_id);
        let response = self
            .client
            .delete(self.url(&format!("/chats/{}", chat_id)))
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ClientError> {
        let mut form = Form::new()
            .text("chat_id", request.chat_id.to_string())
            .text("prompt", request.prompt.clone());
        for file in &request.files {
            form = form.part("files", file_part(file)?);
        }
        for url in &request.urls {
            form = form.text("urls", url.clone());
        }

        info!(
            "🤖 Asking in chat {} with {} file(s) and {} url(s)",
            request.chat_id,
            request.files.len(),
            request.urls.len()
        );
        let response = self
            .client
            .post(self.url("/ask"))
            .multipart(form)
            .send()
            .await?;
        let answer: AskResponse = Self::decode(response).await?;
        info!("✅ Answer received for chat {} ({} sources)", request.chat_id, answer.sources.len());
        Ok(answer)
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError> {
        debug!("POST /auth/login for {}", credentials.email);
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn signup(&self, credentials: &Credentials) -> Result<(), ClientError> {
        debug!("POST /auth/signup for {}", credentials.email);
        let response = self
            .client
            .post(self.url("/auth/signup"))
            .json(credentials)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}
