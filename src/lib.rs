//! pyabi runtime - a CPython-compatible object model for native extensions
//!
//! Extension modules written against the CPython C API link this crate
//! instead of a Python interpreter. It provides the object header and
//! reference counting, a two-tier allocator, integer, float, text, tuple
//! and list boxes, format-string argument marshalling and method dispatch.

pub mod allocator;
pub mod args;
pub mod builtins;
pub mod config;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod methods;
pub mod object;
pub mod refcount;

// Re-export core types
pub use error::{ApiError, ApiResult, ErrorKind};
pub use object::{PyObject, PyVarObject, TypeObject, TypeTag};
pub use refcount::{Borrowed, Owned};

use crate::logging::{info, warn};

/// Runtime initialization
///
/// Loads configuration from the environment, installs logging from its
/// `[logging]` section and warms up the calling thread's allocator. A bad
/// configuration is logged and the defaults are kept. Safe to call more
/// than once.
#[no_mangle]
pub extern "C" fn pyabi_runtime_init() {
    let loaded = config::RuntimeConfig::from_env();
    let log_config = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => logging::LogConfig::from_env(),
    };
    logging::init_with_config(log_config);
    logging::log_runtime_init();

    match loaded {
        Ok(config) => config::install(config),
        Err(err) => warn!(error = %err, "Ignoring invalid runtime configuration"),
    }
    allocator::init();
}

/// Runtime cleanup: reports allocator statistics for the calling thread
#[no_mangle]
pub extern "C" fn pyabi_runtime_cleanup() {
    let stats = allocator::stats();
    info!(
        arena_bytes = stats.arena_bytes,
        arenas = stats.arena_count,
        pool_blocks_in_use = stats.pool.blocks_in_use,
        heap_blocks_live = stats.heap.live_blocks,
        heap_bytes_live = stats.heap.live_bytes,
        orphaned_bytes = allocator::orphaned_bytes(),
        "Allocator statistics"
    );
    logging::log_runtime_shutdown();
}
