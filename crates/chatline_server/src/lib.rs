//! HTTP server wiring for chatline.
//! Configuration, routing and error rendering around `chatline_core`.

pub mod config;
pub mod http;

pub use config::{ConfigError, ServerConfig};
pub use http::{app, ApiError, AppState, RateLimit};
