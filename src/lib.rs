// lib.rs - Chat client library: backend calls, local state and the conversation session
pub mod backend_client;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;

#[cfg(test)]
mod mock_backend;

// Re-export commonly used types for convenience
pub use backend_client::{AskRequest, BackendClient, ChatBackend};
pub use config::Config;
pub use error::{AuthError, ClientError, ConfigError, SendError, SessionError, StoreError};
pub use models::*;
pub use services::Authenticator;
pub use session::{derive_title, LoadOutcome, PendingSend, SendOutcome, SessionManager};
pub use storage::{FileStore, LocalStore, MemoryStore};
