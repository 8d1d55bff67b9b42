//! chatline HTTP server entry point.
//!
//! # Responsibility
//! - Load configuration, initialize logging and open the database.
//! - Serve the chat API until Ctrl-C or SIGTERM.

use chatline_core::db::open_db;
use chatline_core::{init_logging, init_stderr_logging};
use chatline_server::{app, AppState, ServerConfig};
use log::{info, warn};
use std::error::Error;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::from_env()?;

    match config.log_dir.as_deref() {
        Some(dir) => init_logging(&config.log_level, dir)?,
        None => init_stderr_logging(&config.log_level)?,
    }

    let conn = open_db(&config.db_path)?;
    info!(
        "event=server_start module=server status=start bind={} db_path={} rate_limit_requests={} rate_limit_window_s={}",
        config.bind,
        config.db_path.display(),
        config.rate_limit.requests,
        config.rate_limit.window.as_secs()
    );

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    let router = app(AppState::with_rate_limit(conn, config.rate_limit));

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("event=signal_listen module=server status=error error={err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("event=signal_listen module=server status=error error={err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("event=server_shutdown module=server status=start");
}
