//! Tracing setup for the two ways medlit runs.
//!
//! `serve` logs to stdout and to a log file (`MEDLIT_LOG_FILE`, else `logs/medlit.log`).
//! A one-shot `search` keeps stdout for its JSON: console logs go to stderr at `warn`, and a file
//! is written only when `MEDLIT_LOG_FILE` asks for one.
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, fmt::writer::BoxMakeWriter, prelude::*};

const LOG_FILE_ENV: &str = "MEDLIT_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "logs/medlit.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Console stream receiving human-readable logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Console {
    Stdout,
    Stderr,
}

/// Configure tracing for the HTTP server.
///
/// Respects `RUST_LOG` (default `info`). Keeps the non-blocking file writer guard alive for the
/// process lifetime.
pub fn init_tracing() {
    let path = log_file_path(std::env::var(LOG_FILE_ENV).ok(), true);
    install(Console::Stdout, "info", path.as_deref());
}

/// Configure tracing for a one-shot CLI run that prints JSON on stdout.
pub fn init_cli_tracing() {
    let path = log_file_path(std::env::var(LOG_FILE_ENV).ok(), false);
    install(Console::Stderr, "warn", path.as_deref());
}

fn install(console: Console, default_filter: &str, log_file: Option<&Path>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let writer = match console {
        Console::Stdout => BoxMakeWriter::new(std::io::stdout),
        Console::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let console_layer = fmt::layer().with_writer(writer).with_target(false).compact();
    let file_layer = log_file.and_then(open_log_writer).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

/// Resolve the log file: an explicit non-blank path wins, otherwise the default when allowed.
fn log_file_path(explicit: Option<String>, use_default: bool) -> Option<PathBuf> {
    match explicit.filter(|path| !path.trim().is_empty()) {
        Some(path) => Some(PathBuf::from(path.trim())),
        None if use_default => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        None => None,
    }
}

/// Open `path` for appending behind a non-blocking writer, creating parent directories.
///
/// Failures are reported on stderr and disable file logging rather than aborting startup.
fn open_log_writer(path: &Path) -> Option<NonBlocking> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let Some(file_name) = path.file_name().and_then(OsStr::to_str) else {
        eprintln!("Invalid log file path {}", path.display());
        return None;
    };
    if let Err(err) = std::fs::create_dir_all(directory) {
        eprintln!("Failed to create log directory {}: {err}", directory.display());
        return None;
    }

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory);
    match appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
