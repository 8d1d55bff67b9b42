//! Chat message domain model.
//!
//! # Responsibility
//! - Define the canonical record exchanged between transport, service and
//!   persistence layers.
//!
//! # Invariants
//! - Every persisted chat is identified by a store-assigned `ChatId`.
//! - `created_at` is stamped once by the service and never rewritten.

pub mod chat;
