//! Process-wide `log` backend for chatline.
//!
//! The server picks a target once at startup: rotating files under a log
//! directory, or stderr. Chat bodies never appear in log records.
//!
//! # Invariants
//! - Repeating the active `(level, target)` is a no-op; anything else is
//!   rejected.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Once;

const LOG_FILE_BASENAME: &str = "chatline";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Directory(PathBuf),
}

impl LogTarget {
    fn describe(&self) -> String {
        match self {
            Self::Stderr => "stderr".to_string(),
            Self::Directory(dir) => dir.display().to_string(),
        }
    }
}

struct LoggingState {
    level: &'static str,
    target: LogTarget,
    _logger: LoggerHandle,
}

/// Starts rotating file logs under `log_dir`, creating it when missing.
///
/// Fails on an unknown level, a blank or uncreatable directory, or when
/// logging already runs with a different level or target.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let dir = log_dir.trim();
    if dir.is_empty() {
        return Err("log directory cannot be blank".to_string());
    }
    init_with_target(parse_level(level)?, LogTarget::Directory(PathBuf::from(dir)))
}

/// Starts logging to stderr.
pub fn init_stderr_logging(level: &str) -> Result<(), String> {
    init_with_target(parse_level(level)?, LogTarget::Stderr)
}

/// Returns `(level, target)` when logging is active.
pub fn logging_status() -> Option<(&'static str, LogTarget)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.target.clone()))
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn init_with_target(level: &'static str, target: LogTarget) -> Result<(), String> {
    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        let logger = start_logger(level, &target)?;
        PANIC_HOOK.call_once(install_panic_hook);
        info!(
            "event=logging_init module=core status=ok level={level} target={} version={}",
            target.describe(),
            env!("CARGO_PKG_VERSION")
        );
        Ok(LoggingState {
            level,
            target: target.clone(),
            _logger: logger,
        })
    })?;
    state.ensure_same(level, &target)
}

impl LoggingState {
    fn ensure_same(&self, level: &'static str, target: &LogTarget) -> Result<(), String> {
        if self.level == level && &self.target == target {
            return Ok(());
        }
        Err(format!(
            "logging already runs at level `{}` on `{}`; refusing to switch to level `{level}` on `{}`",
            self.level,
            self.target.describe(),
            target.describe()
        ))
    }
}

fn start_logger(level: &'static str, target: &LogTarget) -> Result<LoggerHandle, String> {
    let logger =
        Logger::try_with_str(level).map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    let logger = match target {
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| format!("cannot create log directory `{}`: {err}", dir.display()))?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
    };

    logger
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))
}

fn parse_level(level: &str) -> Result<&'static str, String> {
    let parsed = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        other => return Err(format!("unknown log level `{other}`")),
    };
    Ok(parsed)
}

/// Chains a hook that records panics (location plus a capped payload)
/// before the default report.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string payload>".to_string());
        error!(
            "event=panic module=core status=error location={location} payload={}",
            sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous(info);
    }));
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    let mut capped: String = flat.chars().take(max_chars).collect();
    if flat.chars().nth(max_chars).is_some() {
        capped.push_str("...");
    }
    capped
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, init_stderr_logging, logging_status, parse_level, sanitize_message,
        LogTarget,
    };

    #[test]
    fn levels_are_case_insensitive_and_allow_warning_alias() {
        assert_eq!(parse_level(" INFO ").unwrap(), "info");
        assert_eq!(parse_level("Warning").unwrap(), "warn");
        assert!(parse_level("verbose").unwrap_err().contains("verbose"));
    }

    #[test]
    fn blank_directory_is_rejected_before_init() {
        assert!(init_logging("info", "  ").is_err());
    }

    #[test]
    fn panic_payloads_are_flattened_and_capped() {
        let sanitized = sanitize_message("body: a\nb\rc", 9);
        assert_eq!(sanitized, "body: a b...");
        assert_eq!(sanitize_message("short", 9), "short");
    }

    // The only test that starts the process-wide logger.
    #[test]
    fn repeated_init_is_accepted_and_conflicts_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let dir_text = dir.path().to_str().unwrap().to_string();

        init_logging("info", &dir_text).unwrap();
        init_logging("INFO", &format!(" {dir_text} ")).unwrap();

        assert!(init_logging("debug", &dir_text)
            .unwrap_err()
            .contains("refusing to switch"));
        assert!(init_stderr_logging("info")
            .unwrap_err()
            .contains("refusing to switch"));

        let (level, target) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(target, LogTarget::Directory(dir.path().to_path_buf()));
    }
}
