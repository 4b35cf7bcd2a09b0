//! Explicit configuration values for store and logging bootstrap.
//!
//! # Responsibility
//! - Carry externally supplied settings into constructors.
//!
//! # Invariants
//! - Core code never reads process environment; callers build these values.
//! - `max_attempts` is always at least 1 once turned into a `RetryPolicy`.

use crate::db::connect::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONNECTION_STRING: &str = "catalog.sqlite3";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Settings consumed by `ConnectionManager`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// `:memory:`, a `file:` URI, or a filesystem path.
    pub connection_string: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Upper bound of pooled connections; `:memory:` always uses one.
    pub pool_size: u32,
}

impl StoreConfig {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connection_string: DEFAULT_CONNECTION_STRING.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Rolling files inside an absolute directory.
    Directory(PathBuf),
}

/// Settings consumed by `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub target: LogTarget,
}

impl LoggingConfig {
    pub fn stderr(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            target: LogTarget::Stderr,
        }
    }

    pub fn directory(level: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            target: LogTarget::Directory(log_dir.into()),
        }
    }
}
