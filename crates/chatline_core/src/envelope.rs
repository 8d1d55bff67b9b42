//! Error envelope shared by service, transport and clients.
//!
//! # Responsibility
//! - Define the fixed failure vocabulary and its wire representation.
//! - Classify store failures into envelopes exactly once.
//!
//! # Invariants
//! - Every `ErrorKind` maps to exactly one `(status, tag)` pair.
//! - `classify` is pure: the same store error always yields the same envelope.

use crate::repo::chat_repo::StoreError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOT_FOUND_MESSAGE: &str = "no record matching given id";
const DUPLICATE_MESSAGE: &str = "title already taken";
const PROCESSING_PREFIX: &str = "error when processing request: ";

/// Failure category carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    UnprocessableEntity,
    InternalServer,
}

impl ErrorKind {
    /// HTTP-style status code for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::UnprocessableEntity => 422,
            Self::InternalServer => 500,
        }
    }

    /// Machine-readable tag serialized as `error`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::UnprocessableEntity => "invalid_request",
            Self::InternalServer => "server_error",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "not_found" => Some(Self::NotFound),
            "bad_request" => Some(Self::BadRequest),
            "invalid_request" => Some(Self::UnprocessableEntity),
            "server_error" => Some(Self::InternalServer),
            _ => None,
        }
    }
}

/// Fully populated failure returned by every core operation.
///
/// Serialized as `{"message": .., "status": .., "error": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "EnvelopeBody", try_from = "EnvelopeBody")]
pub struct ErrorEnvelope {
    kind: ErrorKind,
    message: String,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnprocessableEntity, message)
    }

    pub fn internal_server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalServer, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }
}

impl Display for ErrorEnvelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.tag(), self.status_code(), self.message)
    }
}

impl Error for ErrorEnvelope {}

/// Wire shape of `ErrorEnvelope`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnvelopeBody {
    message: String,
    status: u16,
    error: String,
}

impl From<ErrorEnvelope> for EnvelopeBody {
    fn from(value: ErrorEnvelope) -> Self {
        Self {
            status: value.status_code(),
            error: value.tag().to_string(),
            message: value.message,
        }
    }
}

impl TryFrom<EnvelopeBody> for ErrorEnvelope {
    type Error = String;

    fn try_from(value: EnvelopeBody) -> Result<Self, Self::Error> {
        let kind = ErrorKind::from_tag(&value.error)
            .ok_or_else(|| format!("unknown error tag `{}`", value.error))?;
        if kind.status_code() != value.status {
            return Err(format!(
                "status {} does not match error tag `{}`",
                value.status, value.error
            ));
        }
        Ok(Self::new(kind, value.message))
    }
}

/// Maps one store failure to its envelope.
pub fn classify(err: &StoreError) -> ErrorEnvelope {
    match err {
        StoreError::NotFound(_) => ErrorEnvelope::not_found(NOT_FOUND_MESSAGE),
        // Chats have no title field; message kept as clients already see it.
        StoreError::Duplicate(_) => ErrorEnvelope::internal_server(DUPLICATE_MESSAGE),
        other => ErrorEnvelope::internal_server(format!("{PROCESSING_PREFIX}{other}")),
    }
}
