pub mod auth;
pub mod chat;

pub use auth::{AuthResponse, Credentials};
pub use chat::*;
