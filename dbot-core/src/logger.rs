//! Tracing initialization: console and log file share the same fmt layer format
//! (level, target, thread id, span close events and all fields).

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Installs the global tracing subscriber, writing every event to stdout and to `log_file_path`.
///
/// The level comes from `RUST_LOG` (e.g. `info`, `debug`, `relay=trace`) and defaults to `info`.
/// Load `.env` (dotenvy) before calling, otherwise `RUST_LOG` from the file is not seen.
/// The parent directory of the log file is created when missing.
pub fn init_tracing(log_file_path: &str) -> anyhow::Result<()> {
    init_tracing_with_default(log_file_path, "info")
}

/// Like [`init_tracing`], with `default_filter` used when `RUST_LOG` is unset.
pub fn init_tracing_with_default(log_file_path: &str, default_filter: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    let file = Arc::new(file);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    use tracing_subscriber::fmt::writer::MakeWriterExt;
    let writer = io::stdout.and(file);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}
