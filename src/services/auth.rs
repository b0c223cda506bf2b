// src/services/auth.rs
use tracing::{info, warn};

use crate::backend_client::ChatBackend;
use crate::error::{AuthError, ClientError, StoreError};
use crate::models::{Credentials, UserId};
use crate::storage::{LocalStore, ACTIVE_CHAT_ID_KEY, USER_ID_KEY};

/// The logged-in user, if the stored id is present and numeric.
pub fn stored_user_id<S: LocalStore + ?Sized>(store: &S) -> Option<UserId> {
    store
        .get(USER_ID_KEY)
        .and_then(|raw| raw.trim().parse::<UserId>().ok())
}

pub fn clear_identity<S: LocalStore + ?Sized>(store: &S) -> Result<(), StoreError> {
    store.remove(USER_ID_KEY)?;
    store.remove(ACTIVE_CHAT_ID_KEY)?;
    Ok(())
}

/// Map a failed auth call to what the login and signup screens show.
fn auth_error(err: ClientError, fallback: &str) -> AuthError {
    match err {
        ClientError::Unreachable(reason) => {
            warn!("Auth server unreachable: {}", reason);
            AuthError::Unreachable
        }
        ClientError::Status { detail, .. } => {
            AuthError::Rejected(detail.unwrap_or_else(|| fallback.to_string()))
        }
        other => AuthError::Client(other),
    }
}

pub struct Authenticator<B, S> {
    backend: B,
    store: S,
}

impl<B: ChatBackend, S: LocalStore> Authenticator<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self { backend, store }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserId, AuthError> {
        let credentials = Credentials::new(email.trim(), password);
        let response = self
            .backend
            .login(&credentials)
            .await
            .map_err(|e| auth_error(e, "Login failed"))?;
        let user_id = response.user_id.ok_or(AuthError::MissingUserId)?;

        self.store.set(USER_ID_KEY, &user_id.to_string())?;
        info!("🔐 Logged in as user {}", user_id);
        Ok(user_id)
    }

    /// Create an account. Nothing is stored; the user logs in afterwards.
    pub async fn signup(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let credentials = Credentials::new(email.trim(), password);
        self.backend
            .signup(&credentials)
            .await
            .map_err(|e| auth_error(e, "Signup failed"))?;
        info!("Account created for {}", credentials.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_backend::MockBackend;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_login_stores_user_id() {
        let backend = MockBackend::new();
        backend.add_user("ada@example.com", "hunter2", 42);
        let store = MemoryStore::new();
        let auth = Authenticator::new(backend, store.clone());

        let user_id = auth.login(" ada@example.com ", "hunter2").await.unwrap();
        assert_eq!(user_id, 42);
        assert_eq!(store.get(USER_ID_KEY).as_deref(), Some("42"));
        assert_eq!(stored_user_id(&store), Some(42));
    }

    #[tokio::test]
    async fn test_login_rejection_shows_server_detail() {
        let backend = MockBackend::new();
        let store = MemoryStore::new();
        let auth = Authenticator::new(backend, store.clone());

        let err = auth.login("nobody@example.com", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(store.get(USER_ID_KEY), None);
    }

    #[tokio::test]
    async fn test_unreachable_server_message() {
        let backend = MockBackend::new();
        backend.set_unreachable(true);
        let auth = Authenticator::new(backend, MemoryStore::new());

        let err = auth.signup("ada@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Unreachable));
        assert_eq!(err.to_string(), "Server unreachable.");
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let backend = MockBackend::new();
        backend.add_user("ada@example.com", "pw", 1);
        let auth = Authenticator::new(backend, MemoryStore::new());

        let err = auth.signup("ada@example.com", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Email already exists");
    }

    #[test]
    fn test_rejection_without_detail_uses_fallback() {
        assert_eq!(
            auth_error(ClientError::Status { status: 500, detail: None }, "Login failed").to_string(),
            "Login failed"
        );
    }

    #[test]
    fn test_clear_identity_forgets_user_and_active_chat() {
        let store = MemoryStore::new();
        store.set(USER_ID_KEY, "3").unwrap();
        store.set(ACTIVE_CHAT_ID_KEY, "9").unwrap();

        clear_identity(&store).unwrap();
        assert_eq!(store.get(USER_ID_KEY), None);
        assert_eq!(store.get(ACTIVE_CHAT_ID_KEY), None);
    }

    #[test]
    fn test_non_numeric_user_id_is_not_a_user() {
        let store = MemoryStore::new();
        store.set(USER_ID_KEY, "undefined").unwrap();
        assert_eq!(stored_user_id(&store), None);
    }
}
