//! Repository layer contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the chat persistence contract the service depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Missing rows are reported as `StoreError::NotFound`, never by message
//!   text.
//! - `get_all` always returns a concrete (possibly empty) vector.

pub mod chat_repo;
