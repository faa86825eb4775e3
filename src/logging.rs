//! Tracing subscriber setup
//!
//! Logs go to stderr so stdout stays reserved for the rendered results.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "tf_module_versions=info";

/// Filter used with `--quiet`
const QUIET_FILTER: &str = "error";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub quiet: bool,
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

/// Builds the level filter: `--quiet` wins over `RUST_LOG`, which wins over the default
fn env_filter(quiet: bool) -> EnvFilter {
    if quiet {
        return EnvFilter::new(QUIET_FILTER);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn fmt_layer<S>(format: LogFormat, writer: BoxMakeWriter, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer);
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Opens the log file for appending, creating its directory
fn file_writer(path: &Path) -> std::io::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(tracing_appender::non_blocking(file))
}

/// Installs the global subscriber.
///
/// The returned guard flushes the log file on drop and must be held for the
/// lifetime of the program.
pub fn init(options: &LogOptions) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = fmt_layer(options.format, BoxMakeWriter::new(std::io::stderr), true);

    let (file_layer, guard) = match &options.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt_layer(options.format, BoxMakeWriter::new(writer), false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(options.quiet))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
