// src/session/mod.rs
//! Conversation session: the chat list, the open chat's log, staged attachments and
//! the typing indicator, kept in step with the remote chat store.

pub mod attachments;
pub mod title;

use std::path::Path;

use tracing::{debug, info, warn};

use crate::backend_client::{AskRequest, ChatBackend};
use crate::error::{ClientError, SendError, SessionError};
use crate::models::{
    AppendMessageRequest, AskResponse, Chat, ChatId, Message, UserId, DEFAULT_CHAT_TITLE,
};
use crate::services::auth;
use crate::storage::{LocalStore, ACTIVE_CHAT_ID_KEY};

use attachments::{AttachmentSet, FileAttachment};
pub use title::derive_title;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No stored identity; the caller should show the login screen.
    Unauthenticated,
    Ready,
}

/// A prompt that has been saved and is waiting for its answer.
#[derive(Debug)]
pub struct PendingSend {
    request: AskRequest,
}

impl PendingSend {
    pub fn chat_id(&self) -> ChatId {
        self.request.chat_id
    }

    pub fn request(&self) -> &AskRequest {
        &self.request
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Answered(Message),
    /// The answer belongs to a chat that is no longer open. It was saved to that
    /// chat but not shown.
    Stale { chat_id: ChatId },
}

pub struct SessionManager<B, S> {
    backend: B,
    store: S,
    user_id: Option<UserId>,
    chats: Vec<Chat>,
    active_chat_id: Option<ChatId>,
    messages: Vec<Message>,
    attachments: AttachmentSet,
    draft: String,
    url_draft: String,
    in_flight: Option<ChatId>,
    last_error: Option<String>,
}

impl<B: ChatBackend, S: LocalStore> SessionManager<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            user_id: None,
            chats: Vec::new(),
            active_chat_id: None,
            messages: Vec::new(),
            attachments: AttachmentSet::default(),
            draft: String::new(),
            url_draft: String::new(),
            in_flight: None,
            last_error: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn active_chat_id(&self) -> Option<ChatId> {
        self.active_chat_id
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        let id = self.active_chat_id?;
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn files(&self) -> &[FileAttachment] {
        self.attachments.files()
    }

    pub fn urls(&self) -> &[String] {
        self.attachments.urls()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn url_draft(&self) -> &str {
        &self.url_draft
    }

    /// True only while an `/ask` request is outstanding.
    pub fn is_typing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ------------------------------------------------------------------
    // Chat list
    // ------------------------------------------------------------------

    /// Restore the session for the stored user: chat list, last open chat and its log.
    ///
    /// Whatever was open before is closed first. If the log of the chat to reopen
    /// cannot be fetched, the chat list is shown with no chat open.
    pub async fn load(&mut self) -> Result<LoadOutcome, SessionError> {
        self.close_all();
        let Some(user_id) = auth::stored_user_id(&self.store) else {
            self.reset();
            return Ok(LoadOutcome::Unauthenticated);
        };
        self.user_id = Some(user_id);

        let chats = match self.backend.list_chats(user_id).await {
            Ok(chats) => chats,
            Err(e) => return Err(self.fail(e.into())),
        };
        info!("📋 Loaded {} chat(s) for user {}", chats.len(), user_id);
        self.chats = chats;

        let saved = self
            .store
            .get(ACTIVE_CHAT_ID_KEY)
            .and_then(|raw| raw.trim().parse::<ChatId>().ok())
            .filter(|id| self.contains(*id));
        let selected = saved.or_else(|| self.chats.first().map(|c| c.id));

        match selected {
            Some(chat_id) => {
                let messages = self.fetch_log(chat_id).await?;
                self.activate(chat_id, messages)?;
            }
            None => self.store.remove(ACTIVE_CHAT_ID_KEY)?,
        }
        self.last_error = None;
        Ok(LoadOutcome::Ready)
    }

    pub async fn new_chat(&mut self) -> Result<ChatId, SessionError> {
        let user_id = match self.user_id.or_else(|| auth::stored_user_id(&self.store)) {
            Some(id) => id,
            None => return Err(self.fail(SessionError::Unauthenticated)),
        };

        let chat = match self.backend.create_chat(user_id, DEFAULT_CHAT_TITLE).await {
            Ok(chat) => chat,
            Err(e) => return Err(self.fail(e.into())),
        };
        info!("🆕 Created chat {}", chat.id);
        let chat_id = chat.id;
        self.user_id = Some(user_id);
        self.chats.insert(0, chat);
        self.activate(chat_id, Vec::new())?;
        self.last_error = None;
        Ok(chat_id)
    }

    /// Open another chat. The log is fetched before anything changes, so a failed
    /// fetch leaves the current chat open.
    pub async fn select_chat(&mut self, chat_id: ChatId) -> Result<(), SessionError> {
        if !self.contains(chat_id) {
            return Err(self.fail(SessionError::UnknownChat(chat_id)));
        }
        let messages = self.fetch_log(chat_id).await?;
        self.activate(chat_id, messages)?;
        self.last_error = None;
        Ok(())
    }

    pub async fn delete_chat(&mut self, chat_id: ChatId) -> Result<(), SessionError> {
        if !self.contains(chat_id) {
            return Err(self.fail(SessionError::UnknownChat(chat_id)));
        }
        if let Err(e) = self.backend.delete_chat(chat_id).await {
            return Err(self.fail(e.into()));
        }
        info!("🗑️ Deleted chat {}", chat_id);
        self.chats.retain(|c| c.id != chat_id);

        if self.active_chat_id != Some(chat_id) {
            self.last_error = None;
            return Ok(());
        }

        match self.chats.first().map(|c| c.id) {
            Some(next) => match self.fetch_log(next).await {
                Ok(messages) => self.activate(next, messages)?,
                Err(e) => {
                    // Keep the fallback chat open but show nothing rather than the deleted log.
                    self.activate(next, Vec::new())?;
                    return Err(e);
                }
            },
            None => {
                self.close_chat();
                self.store.remove(ACTIVE_CHAT_ID_KEY)?;
            }
        }
        self.last_error = None;
        Ok(())
    }

    pub async fn rename_chat(&mut self, chat_id: ChatId, title: &str) -> Result<(), SessionError> {
        if !self.contains(chat_id) {
            return Err(self.fail(SessionError::UnknownChat(chat_id)));
        }
        let title = match title.trim() {
            "" => DEFAULT_CHAT_TITLE,
            trimmed => trimmed,
        };
        if let Err(e) = self.backend.update_title(chat_id, title).await {
            return Err(self.fail(e.into()));
        }
        self.set_local_title(chat_id, title);
        self.last_error = None;
        Ok(())
    }

    /// Forget the stored identity and everything shown for it.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        auth::clear_identity(&self.store)?;
        self.reset();
        info!("👋 Logged out");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Draft and attachments
    // ------------------------------------------------------------------

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn add_file(&mut self, file: FileAttachment) {
        debug!("Attached {} ({} bytes)", file.name, file.size());
        self.attachments.add_file(file);
    }

    pub async fn add_file_from_path(&mut self, path: &Path) -> Result<(), SessionError> {
        match FileAttachment::read(path).await {
            Ok(file) => {
                self.add_file(file);
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    pub fn remove_file(&mut self, index: usize) -> Option<FileAttachment> {
        self.attachments.remove_file(index)
    }

    /// Stage a URL. Blank input and URLs already staged are ignored.
    pub fn add_url(&mut self, raw: &str) -> bool {
        self.attachments.add_url(raw)
    }

    pub fn remove_url(&mut self, index: usize) -> Option<String> {
        self.attachments.remove_url(index)
    }

    pub fn set_url_draft(&mut self, text: impl Into<String>) {
        self.url_draft = text.into();
    }

    /// Stage the URL being typed, then empty the URL input.
    pub fn commit_url_draft(&mut self) -> bool {
        let draft = std::mem::take(&mut self.url_draft);
        self.attachments.add_url(&draft)
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Send the draft and wait for the answer.
    ///
    /// `Ok(None)` means there was nothing to send: blank draft or no open chat.
    pub async fn send(&mut self) -> Result<Option<SendOutcome>, SessionError> {
        let Some(pending) = self.begin_send().await? else {
            return Ok(None);
        };
        let result = self.backend.ask(pending.request()).await;
        self.complete_send(pending, result).await.map(Some)
    }

    /// Save the user's prompt, show it, name the chat if it still has the default
    /// title, and stage the `/ask` request. The caller runs the request and hands the
    /// result to [`complete_send`](Self::complete_send).
    pub async fn begin_send(&mut self) -> Result<Option<PendingSend>, SessionError> {
        let Some(chat_id) = self.active_chat_id else {
            return Ok(None);
        };
        if self.draft.trim().is_empty() {
            return Ok(None);
        }
        if self.in_flight.is_some() {
            return Err(self.fail(SessionError::SendInProgress));
        }

        let prompt = self.draft.clone();
        let user_message = Message::user(prompt.clone());
        if let Err(e) = self
            .backend
            .append_message(&AppendMessageRequest::from_message(chat_id, &user_message))
            .await
        {
            return Err(self.fail(SendError::PersistUser(e).into()));
        }
        self.messages.push(user_message);

        if self.active_chat().is_some_and(Chat::has_default_title) {
            let title = derive_title(&prompt);
            match self.backend.update_title(chat_id, &title).await {
                Ok(()) => self.set_local_title(chat_id, &title),
                Err(e) => warn!("Could not rename chat {}: {}", chat_id, e),
            }
        }

        let request = AskRequest {
            chat_id,
            prompt,
            urls: self.attachments.urls().to_vec(),
            files: self.attachments.files().to_vec(),
        };
        self.in_flight = Some(chat_id);
        self.last_error = None;
        Ok(Some(PendingSend { request }))
    }

    /// Record the answer to a pending send. An answer for a chat that is no longer
    /// open is saved remotely but leaves the local session alone.
    pub async fn complete_send(
        &mut self,
        pending: PendingSend,
        result: Result<AskResponse, ClientError>,
    ) -> Result<SendOutcome, SessionError> {
        let chat_id = pending.chat_id();
        self.in_flight = None;
        let current = self.active_chat_id == Some(chat_id);

        let answer = match result {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Ask failed for chat {}: {}", chat_id, e);
                if current {
                    self.clear_staging(&pending);
                }
                return Err(self.fail(SendError::Generate(e).into()));
            }
        };

        let message = Message::assistant(answer.answer, answer.sources);
        let persisted = self
            .backend
            .append_message(&AppendMessageRequest::from_message(chat_id, &message))
            .await;

        if !current {
            info!("Answer for chat {} arrived after switching away", chat_id);
            if let Err(e) = persisted {
                return Err(self.fail(SendError::PersistAssistant(e).into()));
            }
            return Ok(SendOutcome::Stale { chat_id });
        }

        self.draft.clear();
        self.messages.push(message.clone());
        self.clear_staging(&pending);

        if let Err(e) = persisted {
            return Err(self.fail(SendError::PersistAssistant(e).into()));
        }
        self.last_error = None;
        Ok(SendOutcome::Answered(message))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn contains(&self, chat_id: ChatId) -> bool {
        self.chats.iter().any(|c| c.id == chat_id)
    }

    async fn fetch_log(&mut self, chat_id: ChatId) -> Result<Vec<Message>, SessionError> {
        let record = match self.backend.get_chat(chat_id).await {
            Ok(record) => record,
            Err(e) => return Err(self.fail(e.into())),
        };
        match record.messages() {
            Ok(messages) => {
                debug!("Fetched {} message(s) for chat {}", messages.len(), chat_id);
                Ok(messages)
            }
            Err(e) => Err(self.fail(SessionError::CorruptLog {
                chat_id,
                reason: e.to_string(),
            })),
        }
    }

    /// Make `chat_id` the open chat with the given log. Staged attachments never
    /// carry over to another chat.
    fn activate(&mut self, chat_id: ChatId, messages: Vec<Message>) -> Result<(), SessionError> {
        self.store.set(ACTIVE_CHAT_ID_KEY, &chat_id.to_string())?;
        self.active_chat_id = Some(chat_id);
        self.messages = messages;
        self.attachments.clear();
        Ok(())
    }

    fn set_local_title(&mut self, chat_id: ChatId, title: &str) {
        if let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) {
            chat.title = title.to_string();
        }
    }

    /// Unstage what the pending prompt carried and empty the URL input.
    fn clear_staging(&mut self, pending: &PendingSend) {
        self.attachments
            .discard_sent(&pending.request.files, &pending.request.urls);
        self.url_draft.clear();
    }

    fn close_chat(&mut self) {
        self.active_chat_id = None;
        self.messages.clear();
        self.attachments.clear();
    }

    fn close_all(&mut self) {
        self.chats.clear();
        self.close_chat();
    }

    fn reset(&mut self) {
        self.user_id = None;
        self.close_all();
        self.draft.clear();
        self.url_draft.clear();
        self.in_flight = None;
        self.last_error = None;
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.last_error = Some(err.to_string());
        err
    }
}
