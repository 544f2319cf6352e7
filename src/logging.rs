//! Tracing initialization.
//!
//! - Verbosity comes from `LogLevel` and is scoped to this crate's targets.
//! - The console layer writes to stderr so stdout stays scriptable (listings, kinds, dims).
//! - `--json` switches every layer to structured JSON.
//! - An optional log file gets its own non-blocking layer with thread ids.

use anyhow::{Context, Result};
use adxlink::output as out;
use adxlink::platform::open_log_file_secure_append;
use adxlink::{LogLevel, default_log_path, path_has_symlink_ancestor};
use chrono::Local;
use std::fmt as stdfmt;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Local timestamps as DD/MM/YY HH:MM:SS.
struct LocalHumanTime;

impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

fn level_filter(lvl: &LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

/// Dependencies stay silent; only `adxlink` targets pass.
fn crate_filter(lvl: &LogLevel) -> EnvFilter {
    let level = level_filter(lvl).to_string().to_ascii_lowercase();
    EnvFilter::new(format!("adxlink={level}"))
}

fn console_layer(json: bool) -> BoxedLayer {
    let base = tsfmt::layer()
        .with_timer(LocalHumanTime)
        .with_writer(std::io::stderr);
    if json {
        base.event_format(tsfmt::format().json()).with_target(true).boxed()
    } else {
        base.compact().with_target(false).boxed()
    }
}

fn file_layer(json: bool, writer: NonBlocking) -> BoxedLayer {
    let base = tsfmt::layer()
        .with_timer(LocalHumanTime)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(writer);
    if json {
        base.event_format(tsfmt::format().json()).boxed()
    } else {
        base.compact().boxed()
    }
}

/// Open `path` for appending behind a non-blocking writer.
/// Returns `None` (after telling the user why) when the path is unsafe or unusable.
fn open_file_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match path_has_symlink_ancestor(path) {
        Ok(false) => {}
        Ok(true) => {
            out::print_warn(&format!(
                "Not logging to {}: an ancestor directory is a symlink.",
                path.display()
            ));
            return None;
        }
        Err(e) => {
            out::print_warn(&format!("Not logging to {}: {e}", path.display()));
            return None;
        }
    }

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match open_log_file_secure_append(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(e) => {
            out::print_warn(&format!("Not logging to {}: {e}", path.display()));
            None
        }
    }
}

/// Install the global subscriber. The returned guard (present when a log file is in
/// use) must live until exit so buffered lines reach the file.
pub fn init_tracing(lvl: &LogLevel, log_file: Option<&Path>, json: bool) -> Result<Option<WorkerGuard>> {
    let mut layers = vec![console_layer(json)];
    let mut guard = None;

    if let Some(path) = log_file {
        match open_file_writer(path) {
            Some((writer, g)) => {
                layers.push(file_layer(json, writer));
                guard = Some(g);
            }
            None => {
                if let Some(def) = default_log_path() {
                    out::print_warn(&format!(
                        "Logs continue on stderr only; the default log path is {}",
                        def.display()
                    ));
                }
            }
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(crate_filter(lvl))
        .try_init()
        .context("install tracing subscriber")?;
    Ok(guard)
}
