//! Runtime configuration - TOML file plus environment overrides
//!
//! The active configuration is process-wide. Per-thread allocators copy
//! the allocator section when they are first touched, so `install` only
//! affects threads that have not allocated yet.

use crate::logging::LogConfig;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Default arena size for the small-object pool
pub const DEFAULT_ARENA_SIZE: usize = 64 * 1024; // 64KB
/// Upper bound for adaptive arena growth
pub const MAX_ARENA_SIZE: usize = 4 * 1024 * 1024; // 4MB

static ACTIVE: Lazy<RwLock<RuntimeConfig>> = Lazy::new(|| RwLock::new(RuntimeConfig::default()));

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub logging: LogConfig,
    pub allocator: AllocatorSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AllocatorSettings {
    /// First arena size; doubles per arena up to `max_arena_size`
    pub arena_size: usize,
    pub max_arena_size: usize,
    /// Cap on bytes one allocator may obtain from the OS
    pub memory_limit: Option<usize>,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            arena_size: DEFAULT_ARENA_SIZE,
            max_arena_size: MAX_ARENA_SIZE,
            memory_limit: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, message: String },
    Parse { message: String },
    Invalid { field: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "Cannot read config '{}': {}", path, message),
            Self::Parse { message } => write!(f, "Invalid config: {}", message),
            Self::Invalid { field, value } => write!(f, "Invalid value '{}' for {}", value, field),
        }
    }
}

impl std::error::Error for ConfigError {}

impl RuntimeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// Load `PYABI_CONFIG` (if set), then apply environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("PYABI_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        config.logging.apply_env();

        if let Ok(value) = std::env::var("PYABI_ARENA_SIZE") {
            config.allocator.arena_size = parse_size("PYABI_ARENA_SIZE", &value)?;
        }
        if let Ok(value) = std::env::var("PYABI_MEMORY_LIMIT") {
            config.allocator.memory_limit = Some(parse_size("PYABI_MEMORY_LIMIT", &value)?);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.allocator;
        if a.arena_size == 0 {
            return Err(ConfigError::Invalid {
                field: "allocator.arena_size",
                value: a.arena_size.to_string(),
            });
        }
        if a.max_arena_size < a.arena_size {
            return Err(ConfigError::Invalid {
                field: "allocator.max_arena_size",
                value: a.max_arena_size.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_size(field: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        field,
        value: value.to_string(),
    })
}

/// Snapshot of the active configuration
pub fn current() -> RuntimeConfig {
    ACTIVE.read().clone()
}

/// Allocator section of the active configuration
pub fn allocator_settings() -> AllocatorSettings {
    ACTIVE.read().allocator
}

/// Replace the active configuration
pub fn install(config: RuntimeConfig) {
    *ACTIVE.write() = config;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.allocator.arena_size, DEFAULT_ARENA_SIZE);
        assert_eq!(config.allocator.max_arena_size, MAX_ARENA_SIZE);
        assert!(config.allocator.memory_limit.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str(
            "[allocator]\nmemory_limit = 1048576\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(config.allocator.memory_limit, Some(1 << 20));
        assert_eq!(config.allocator.arena_size, DEFAULT_ARENA_SIZE);
        assert_eq!(config.logging.level, tracing::Level::DEBUG);
    }

    #[test]
    fn test_invalid_arena_bounds_rejected() {
        let err = RuntimeConfig::from_toml_str(
            "[allocator]\narena_size = 8192\nmax_arena_size = 4096\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "allocator.max_arena_size", .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[allocator]\narena_size = 16384").unwrap();

        let config = RuntimeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.allocator.arena_size, 16384);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RuntimeConfig::from_file("/nonexistent/pyabi.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
