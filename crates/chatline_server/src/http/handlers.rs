//! Route handlers for `/api/v1/chats`.

use super::{ApiError, AppState};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chatline_core::{core_version, Chat, ChatId, UpdateChatRequest};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct DeleteResponse {
    status: &'static str,
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: core_version(),
    })
}

pub(super) async fn create_chat(
    State(state): State<AppState>,
    payload: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<Chat>), ApiError> {
    let chat: Chat = decode_body(payload)?;
    let created = state
        .with_chat_service(move |service| service.create_chat(chat))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn get_chat(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Chat>, ApiError> {
    let id = parse_chat_id(&raw_id)?;
    let chat = state
        .with_chat_service(move |service| service.get_chat(id))
        .await?;
    Ok(Json(chat))
}

pub(super) async fn get_all_chats(State(state): State<AppState>) -> Result<Json<Vec<Chat>>, ApiError> {
    let chats = state
        .with_chat_service(|service| service.get_all_chats())
        .await?;
    Ok(Json(chats))
}

pub(super) async fn update_chat(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Bytes, BytesRejection>,
) -> Result<Json<Chat>, ApiError> {
    let id = parse_chat_id(&raw_id)?;
    let mut request: UpdateChatRequest = decode_body(payload)?;
    request.id = id;
    let updated = state
        .with_chat_service(move |service| service.update_chat(request))
        .await?;
    Ok(Json(updated))
}

pub(super) async fn delete_chat(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_chat_id(&raw_id)?;
    state
        .with_chat_service(move |service| service.delete_chat(id))
        .await?;
    Ok(Json(DeleteResponse { status: "deleted" }))
}

fn parse_chat_id(raw: &str) -> Result<ChatId, ApiError> {
    raw.parse::<ChatId>()
        .map_err(|_| ApiError::invalid_chat_id())
}

/// Decodes a JSON body regardless of the request's content type.
fn decode_body<T: DeserializeOwned>(payload: Result<Bytes, BytesRejection>) -> Result<T, ApiError> {
    let bytes = payload.map_err(|rejection| {
        debug!(
            "event=http_decode module=http status=rejected error={}",
            rejection.body_text()
        );
        ApiError::invalid_json_body()
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        debug!("event=http_decode module=http status=rejected error={err}");
        ApiError::invalid_json_body()
    })
}

#[cfg(test)]
mod tests {
    use super::{decode_body, parse_chat_id};
    use axum::body::Bytes;
    use chatline_core::{Chat, UpdateChatRequest};

    #[test]
    fn parse_chat_id_accepts_signed_integers_only() {
        assert_eq!(parse_chat_id("42").unwrap(), 42);
        assert_eq!(parse_chat_id("-1").unwrap(), -1);
        assert!(parse_chat_id("abc").is_err());
        assert!(parse_chat_id("1.5").is_err());
        assert!(parse_chat_id("").is_err());
    }

    #[test]
    fn decode_body_leaves_missing_fields_to_validation() {
        let chat: Chat = decode_body(Ok(Bytes::from_static(br#"{"body": "hi"}"#))).unwrap();
        assert!(chat.sender.is_empty());
        assert_eq!(chat.body, "hi");

        let request: UpdateChatRequest = decode_body(Ok(Bytes::from_static(b"{}"))).unwrap();
        assert!(request.body.is_empty());

        let err = decode_body::<Chat>(Ok(Bytes::from_static(br#""hello""#))).unwrap_err();
        assert_eq!(err.0.message(), "invalid json body");
    }
}
