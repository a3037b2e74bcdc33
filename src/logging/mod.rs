//! Logging - `tracing` events for the object model and its C surface
//!
//! Nothing is printed until a subscriber is installed. `pyabi_runtime_init`
//! installs one from `RuntimeConfig::logging`; embedders that already run
//! their own global subscriber keep it, and our events flow into theirs.
//!
//! Levels used across the crate:
//! - `trace`: block traffic and refcount transitions
//! - `debug`: object deallocation, arena and container growth, dispatch
//! - `warn`: an entry point of the C surface failed and returned its sentinel
//! - `error`: an invariant broke and the process is about to abort

use crate::error::ApiError;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub use tracing::{debug, error, info, trace, warn};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Flushes the file writer when the process exits
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

static PERF_GUARDS: AtomicBool = AtomicBool::new(false);

/// `[logging]` section of the runtime configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    #[serde(deserialize_with = "level_from_name")]
    pub level: Level,
    pub file_output: bool,
    /// Written only when `file_output` is set
    pub log_path: Option<String>,
    pub json_format: bool,
    /// Emit span enter/close events
    pub show_spans: bool,
    /// Enables `perf::track` timing events
    pub track_performance: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            file_output: false,
            log_path: None,
            json_format: false,
            show_spans: false,
            track_performance: false,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay the `PYABI_LOG_*` variables; unparseable values are ignored
    pub fn apply_env(&mut self) {
        let var = |name: &str| std::env::var(name).ok();

        if let Some(level) = var("PYABI_LOG_LEVEL").as_deref().and_then(level_named) {
            self.level = level;
        }
        if let Some(path) = var("PYABI_LOG_FILE") {
            self.file_output = true;
            self.log_path = Some(path);
        }
        if let Some(flag) = var("PYABI_LOG_JSON").as_deref().and_then(flag_value) {
            self.json_format = flag;
        }
        if let Some(flag) = var("PYABI_LOG_SPANS").as_deref().and_then(flag_value) {
            self.show_spans = flag;
        }
        if let Some(flag) = var("PYABI_LOG_PERF").as_deref().and_then(flag_value) {
            self.track_performance = flag;
        }
    }

    fn file_path(&self) -> Option<&Path> {
        self.log_path.as_deref().filter(|_| self.file_output).map(Path::new)
    }

    fn span_events(&self) -> FmtSpan {
        if self.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

fn level_named(name: &str) -> Option<Level> {
    name.trim().parse().ok()
}

fn flag_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn level_from_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
    let name = String::deserialize(deserializer)?;
    level_named(&name).ok_or_else(|| serde::de::Error::custom(format!("unknown log level '{}'", name)))
}

/// Non-blocking writer for `path`, created next to it
fn file_writer(path: &Path) -> NonBlocking {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = path.file_name().unwrap_or(path.as_os_str());
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
    let _ = FILE_GUARD.set(guard);
    writer
}

/// Install a subscriber configured from the environment alone
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Install a subscriber for `config`
///
/// Only the first call in a process has any effect. `RUST_LOG` replaces
/// the level filter when set.
pub fn init_with_config(config: LogConfig) {
    INSTALLED.get_or_init(|| {
        PERF_GUARDS.store(config.track_performance, Ordering::Relaxed);

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("pyabi_runtime={}", config.level.as_str().to_ascii_lowercase()))
        });

        let text = (!config.json_format).then(|| {
            fmt::layer()
                .with_writer(io::stderr)
                .with_span_events(config.span_events())
                .with_thread_names(true)
        });
        let json = config.json_format.then(|| {
            fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_span_events(config.span_events())
        });
        let file = config.file_path().map(|path| {
            fmt::layer()
                .with_writer(file_writer(path))
                .with_ansi(false)
                .with_span_events(config.span_events())
        });

        // Fails only when the host already set a global subscriber
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(text)
            .with(json)
            .with(file)
            .try_init();
    });
}

pub fn is_initialized() -> bool {
    INSTALLED.get().is_some()
}

/// Whether `perf::track` guards are worth creating
#[inline]
pub fn performance_tracking() -> bool {
    PERF_GUARDS.load(Ordering::Relaxed)
}

// ============================================================================
// Event helpers
// ============================================================================

#[inline]
pub fn log_block_alloc(size: usize, block: *const u8) {
    trace!(event = "block_alloc", size_bytes = size, block = ?block);
}

#[inline]
pub fn log_block_free(block: *const u8) {
    trace!(event = "block_free", block = ?block);
}

/// An object's count reached zero and its type's dealloc is running
#[inline]
pub fn log_dealloc(type_name: &str, object: *const u8) {
    debug!(event = "dealloc", type_name, object = ?object);
}

pub fn log_entry(entry: &str, arg_count: usize) {
    debug!(event = "c_entry", entry, arg_count);
}

/// A C entry point is about to return its failure sentinel
pub fn log_entry_failure(entry: &str, err: &ApiError) {
    warn!(event = "c_entry_failed", entry, kind = ?err.kind(), "{}", err);
}

#[cold]
pub fn log_fatal(violation: &str, address: *const u8) {
    error!(event = "fatal", violation, address = ?address, "Object model invariant broken, aborting");
}

pub fn log_runtime_init() {
    info!(event = "runtime_init", version = env!("CARGO_PKG_VERSION"), "pyabi runtime starting");
}

pub fn log_runtime_shutdown() {
    info!(event = "runtime_shutdown", "pyabi runtime stopped");
}

/// Timing of slow paths such as arena acquisition
pub mod perf {
    use std::time::Instant;
    use tracing::debug;

    /// Guard that reports the elapsed time of `operation` when dropped
    #[must_use]
    pub fn track(operation: &'static str) -> Timed {
        Timed {
            operation,
            started: Instant::now(),
        }
    }

    pub struct Timed {
        operation: &'static str,
        started: Instant,
    }

    impl Drop for Timed {
        fn drop(&mut self) {
            debug!(
                event = "timed",
                operation = self.operation,
                elapsed_us = self.started.elapsed().as_micros() as u64
            );
        }
    }
}
