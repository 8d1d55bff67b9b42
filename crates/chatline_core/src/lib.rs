//! Core domain logic for chatline.
//! This crate owns validation, error classification and chat orchestration.

pub mod db;
pub mod envelope;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validate;

pub use envelope::{classify, ErrorEnvelope, ErrorKind};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::chat::{Chat, ChatId, UpdateChatRequest};
pub use repo::chat_repo::{ChatStore, SqliteChatRepository, StoreError, StoreResult};
pub use service::chat_service::{ChatService, ServiceResult};
pub use validate::{is_phone_like, validate, ValidationMode};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
