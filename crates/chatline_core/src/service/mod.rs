//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation and store calls into use-case level APIs.
//! - Keep HTTP and other transport layers decoupled from storage details.

pub mod chat_service;
