// src/mock_backend.rs
//! In-memory chat backend for tests, mirroring the server's observable behaviour.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::backend_client::{AskRequest, ChatBackend};
use crate::error::ClientError;
use crate::models::{
    AppendMessageRequest, AskResponse, AuthResponse, Chat, ChatId, ChatRecord, Credentials,
    Message, Role, UserId,
};

#[derive(Default)]
struct MockState {
    next_chat_id: ChatId,
    chats: BTreeMap<ChatId, (UserId, Chat, Vec<Message>)>,
    users: HashMap<String, (String, UserId)>,
    calls: Vec<String>,
    asks: Vec<AskRequest>,
    answer: Option<(String, Vec<String>)>,
    unreachable: bool,
    fail_append: HashSet<Role>,
    fail_ask: bool,
    fail_get: HashSet<ChatId>,
    fail_title: bool,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.lock().next_chat_id = 100;
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn add_user(&self, email: &str, password: &str, user_id: UserId) {
        self.lock()
            .users
            .insert(email.to_string(), (password.to_string(), user_id));
    }

    /// Seed a chat owned by `user_id`. Chats are listed newest first, like the server.
    pub fn add_chat(&self, user_id: UserId, chat_id: ChatId, title: &str, messages: Vec<Message>) {
        let chat = Chat {
            id: chat_id,
            title: title.to_string(),
        };
        self.lock().chats.insert(chat_id, (user_id, chat, messages));
    }

    pub fn remote_log(&self, chat_id: ChatId) -> Vec<Message> {
        self.lock()
            .chats
            .get(&chat_id)
            .map(|(_, _, messages)| messages.clone())
            .unwrap_or_default()
    }

    pub fn remote_title(&self, chat_id: ChatId) -> Option<String> {
        self.lock().chats.get(&chat_id).map(|(_, chat, _)| chat.title.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn asks(&self) -> Vec<AskRequest> {
        self.lock().asks.clone()
    }

    pub fn set_answer(&self, answer: &str, sources: &[&str]) {
        self.lock().answer = Some((
            answer.to_string(),
            sources.iter().map(|s| s.to_string()).collect(),
        ));
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    pub fn fail_append(&self, role: Role) {
        self.lock().fail_append.insert(role);
    }

    pub fn fail_ask(&self, fail: bool) {
        self.lock().fail_ask = fail;
    }

    pub fn fail_get(&self, chat_id: ChatId) {
        self.lock().fail_get.insert(chat_id);
    }

    pub fn fail_title(&self, fail: bool) {
        self.lock().fail_title = fail;
    }

    fn record(&self, call: String) -> Result<MutexGuard<'_, MockState>, ClientError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.unreachable {
            return Err(ClientError::Unreachable("connection refused".to_string()));
        }
        Ok(state)
    }
}

fn server_error() -> ClientError {
    ClientError::Status {
        status: 500,
        detail: Some("Internal Server Error".to_string()),
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn list_chats(&self, user_id: UserId) -> Result<Vec<Chat>, ClientError> {
        let state = self.record(format!("list_chats {}", user_id))?;
        Ok(state
            .chats
            .values()
            .rev()
            .filter(|(owner, _, _)| *owner == user_id)
            .map(|(_, chat, _)| chat.clone())
            .collect())
    }

    async fn get_chat(&self, chat_id: ChatId) -> Result<ChatRecord, ClientError> {
        let state = self.record(format!("get_chat {}", chat_id))?;
        if state.fail_get.contains(&chat_id) {
            return Err(server_error());
        }
        let (_, chat, messages) = state.chats.get(&chat_id).ok_or(ClientError::Status {
            status: 404,
            detail: None,
        })?;
        Ok(ChatRecord {
            id: chat.id,
            title: chat.title.clone(),
            messages: Some(serde_json::to_string(messages)?),
        })
    }

    async fn create_chat(&self, user_id: UserId, title: &str) -> Result<Chat, ClientError> {
        let mut state = self.record(format!("create_chat {}", user_id))?;
        let chat_id = state.next_chat_id;
        state.next_chat_id += 1;
        let chat = Chat {
            id: chat_id,
            title: title.to_string(),
        };
        state.chats.insert(chat_id, (user_id, chat.clone(), Vec::new()));
        Ok(chat)
    }

    async fn update_title(&self, chat_id: ChatId, title: &str) -> Result<(), ClientError> {
        let mut state = self.record(format!("update_title {} {}", chat_id, title))?;
        if state.fail_title {
            return Err(server_error());
        }
        if let Some((_, chat, _)) = state.chats.get_mut(&chat_id) {
            chat.title = title.to_string();
        }
        Ok(())
    }

    async fn append_message(&self, request: &AppendMessageRequest) -> Result<(), ClientError> {
        let mut state = self.record(format!(
            "append {} {}",
            request.chat_id,
            request.role.as_str()
        ))?;
        if state.fail_append.contains(&request.role) {
            return Err(server_error());
        }
        if let Some((_, _, messages)) = state.chats.get_mut(&request.chat_id) {
            messages.push(Message {
                role: request.role,
                text: request.text.clone(),
                sources: request.sources.clone().unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ClientError> {
        let mut state = self.record(format!("delete_chat {}", chat_id))?;
        state.chats.remove(&chat_id);
        Ok(())
    }

    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ClientError> {
        let mut state = self.record(format!("ask {}", request.chat_id))?;
        state.asks.push(request.clone());
        if state.fail_ask {
            return Err(server_error());
        }
        let (answer, sources) = state
            .answer
            .clone()
            .unwrap_or_else(|| (format!("Answer to: {}", request.prompt), Vec::new()));
        Ok(AskResponse { answer, sources })
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError> {
        let state = self.record(format!("login {}", credentials.email))?;
        match state.users.get(&credentials.email) {
            Some((password, user_id)) if *password == credentials.password => Ok(AuthResponse {
                success: true,
                user_id: Some(*user_id),
                message: "Login successful".to_string(),
            }),
            _ => Err(ClientError::Status {
                status: 401,
                detail: Some("Invalid email or password".to_string()),
            }),
        }
    }

    async fn signup(&self, credentials: &Credentials) -> Result<(), ClientError> {
        let mut state = self.record(format!("signup {}", credentials.email))?;
        if state.users.contains_key(&credentials.email) {
            return Err(ClientError::Status {
                status: 400,
                detail: Some("Email already exists".to_string()),
            });
        }
        let user_id = state.users.len() as UserId + 1;
        state
            .users
            .insert(credentials.email.clone(), (credentials.password.clone(), user_id));
        Ok(())
    }
}
