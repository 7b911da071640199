// src/logging.rs

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::PathBuf;
use time::macros::format_description;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    /// The data-dir log file. Used by the TUI, which owns the terminal.
    File,
    /// Standard error, for the one-shot scan and the HTTP server.
    Stderr,
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "exposure-rs", env!("CARGO_PKG_NAME"))
}

pub fn get_data_dir() -> PathBuf {
    if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn log_file_path() -> PathBuf {
    get_data_dir().join(LOG_FILE.clone())
}

fn log_level() -> String {
    std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.clone()))
        .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")))
}

/// Installs the global tracing subscriber.
///
/// Timestamps are local `YYYY-MM-DD HH:MM:SS`; the TUI log panel relies on the
/// first two space-separated fields being the date and the time.
pub fn initialize_logging(sink: LogSink) -> Result<()> {
    let timer = LocalTime::new(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"));

    let output_layer = match sink {
        LogSink::File => {
            let directory = get_data_dir();
            std::fs::create_dir_all(&directory)?;
            let log_file = std::fs::File::create(log_file_path())?;
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_timer(timer)
                .with_target(false)
                .with_ansi(false)
                .with_filter(EnvFilter::new(log_level()))
                .boxed()
        }
        LogSink::Stderr => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(timer)
            .with_target(false)
            .with_filter(EnvFilter::new(log_level()))
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(output_layer)
        .with(ErrorLayer::default())
        .init();

    Ok(())
}
