//! JSON HTTP transport for chat operations.
//!
//! # Responsibility
//! - Map routes onto `ChatService` operations.
//! - Parse path ids and request bodies before the core runs.
//! - Render success payloads and error envelopes with their status codes.
//! - Apply per-client rate limiting, permissive CORS, request logging and
//!   panic recovery, outermost first.
//!
//! # Invariants
//! - Store calls run on the blocking pool under one connection mutex.
//! - A panicked store call never leaves the connection unusable.
//! - Handlers never re-classify envelopes returned by the core.

mod error;
mod handlers;
mod rate_limit;

pub use error::{ApiError, INVALID_CHAT_ID, INVALID_JSON_BODY};
pub use rate_limit::RateLimit;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chatline_core::{ChatService, ErrorEnvelope, SqliteChatRepository};
use log::info;
use rate_limit::RateLimiter;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

/// Shared handler state: one SQLite connection behind a mutex plus the
/// per-client request limiter.
#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    limiter: Arc<RateLimiter>,
}

impl AppState {
    /// State without request limiting.
    pub fn new(conn: Connection) -> Self {
        Self::with_rate_limit(conn, RateLimit::disabled())
    }

    pub fn with_rate_limit(conn: Connection, limit: RateLimit) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            limiter: Arc::new(RateLimiter::new(limit)),
        }
    }

    /// Runs `f` against a request-scoped `ChatService` on the blocking pool.
    pub(crate) async fn with_chat_service<T, F>(&self, f: F) -> Result<T, ErrorEnvelope>
    where
        T: Send + 'static,
        F: FnOnce(&ChatService<SqliteChatRepository<'_>>) -> Result<T, ErrorEnvelope>
            + Send
            + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            // A panic mid-call leaves the connection itself intact.
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            let service = ChatService::new(SqliteChatRepository::new(&guard));
            f(&service)
        })
        .await
        .map_err(|err| {
            ErrorEnvelope::internal_server(format!("error when processing request: {err}"))
        })?
    }
}

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/chats",
            get(handlers::get_all_chats).post(handlers::create_chat),
        )
        .route(
            "/api/v1/chats/",
            get(handlers::get_all_chats).post(handlers::create_chat),
        )
        .route(
            "/api/v1/chats/:chat_id",
            get(handlers::get_chat)
                .put(handlers::update_chat)
                .delete(handlers::delete_chat),
        );
    with_middleware(routes, state)
}

fn with_middleware(routes: Router<AppState>, state: AppState) -> Router {
    let limiter = Arc::clone(&state.limiter);
    routes
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(limiter, rate_limit::enforce))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!(
        "event=http_request module=http status={} method={} path={} duration_ms={}",
        response.status().as_u16(),
        method,
        path,
        started_at.elapsed().as_millis()
    );
    response
}
