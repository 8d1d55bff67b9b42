//! HTTP rendering of core error envelopes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chatline_core::ErrorEnvelope;
use log::error;
use std::any::Any;

pub const INVALID_CHAT_ID: &str = "chat id should be a number";
pub const INVALID_JSON_BODY: &str = "invalid json body";
const HANDLER_PANIC: &str = "error when processing request: internal panic";

/// Transport wrapper so the core envelope can be returned from handlers.
#[derive(Debug)]
pub struct ApiError(pub ErrorEnvelope);

impl From<ErrorEnvelope> for ApiError {
    fn from(value: ErrorEnvelope) -> Self {
        Self(value)
    }
}

impl ApiError {
    pub fn invalid_chat_id() -> Self {
        Self(ErrorEnvelope::bad_request(INVALID_CHAT_ID))
    }

    pub fn invalid_json_body() -> Self {
        Self(ErrorEnvelope::unprocessable_entity(INVALID_JSON_BODY))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

/// Response for a request whose handler panicked. The payload stays out of
/// the response body.
pub(super) fn panic_response(_payload: Box<dyn Any + Send + 'static>) -> Response {
    error!("event=handler_panic module=http status=error");
    ApiError(ErrorEnvelope::internal_server(HANDLER_PANIC)).into_response()
}
