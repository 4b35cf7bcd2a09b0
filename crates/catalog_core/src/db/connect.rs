//! Startup connection establishment with bounded fixed-delay retry.
//!
//! # Responsibility
//! - Provide a standalone retry policy usable without a process lifecycle.
//! - Establish the process-wide `CatalogDb` from a `StoreConfig`.
//!
//! # Invariants
//! - At most `max_attempts` attempts are made; sleeps happen only between attempts.
//! - Exhaustion surfaces the last underlying error, never a default value.
//! - No reconnection happens after `connect` returns.

use crate::config::StoreConfig;
use crate::db::{CatalogDb, DbError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Bounded retry policy with a fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Final failure of `retry_with_backoff`.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `attempt` until it succeeds or `policy.max_attempts` is reached.
///
/// `attempt` receives the 1-based attempt number. Every failed attempt is
/// logged; `sleep` is called with the policy delay after each one except the last.
pub fn retry_with_backoff<T, E, S, A>(
    policy: RetryPolicy,
    mut sleep: S,
    mut attempt: A,
) -> Result<T, RetryExhausted<E>>
where
    E: Display,
    S: FnMut(Duration),
    A: FnMut(u32) -> Result<T, E>,
{
    let mut attempt_number = 1;
    loop {
        match attempt(attempt_number) {
            Ok(value) => return Ok(value),
            Err(err) => {
                let exhausted = attempt_number >= policy.max_attempts;
                warn!(
                    "event=retry module=db status={} attempt={} max_attempts={} delay_ms={} error={}",
                    if exhausted { "exhausted" } else { "retry" },
                    attempt_number,
                    policy.max_attempts,
                    policy.delay.as_millis(),
                    err
                );
                if exhausted {
                    return Err(RetryExhausted {
                        attempts: attempt_number,
                        last_error: err,
                    });
                }
                sleep(policy.delay);
                attempt_number += 1;
            }
        }
    }
}

/// Connection establishment failed on every allowed attempt.
#[derive(Debug)]
pub struct ConnectionError {
    pub attempts: u32,
    pub cause: DbError,
}

impl Display for ConnectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "connection failed after {} attempt(s): {}",
            self.attempts, self.cause
        )
    }
}

impl Error for ConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}

impl From<RetryExhausted<DbError>> for ConnectionError {
    fn from(value: RetryExhausted<DbError>) -> Self {
        Self {
            attempts: value.attempts,
            cause: value.last_error,
        }
    }
}

/// Establishes the shared catalog connection at startup.
pub struct ConnectionManager {
    config: StoreConfig,
}

impl ConnectionManager {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Connects, blocking the caller for up to `max_attempts x retry_delay`.
    pub fn connect(&self) -> Result<CatalogDb, ConnectionError> {
        self.connect_with_sleeper(std::thread::sleep)
    }

    /// Same as `connect`, with an injectable sleeper.
    pub fn connect_with_sleeper<S>(&self, sleep: S) -> Result<CatalogDb, ConnectionError>
    where
        S: FnMut(Duration),
    {
        let started_at = Instant::now();
        let policy = self.config.retry_policy();
        info!(
            "event=db_connect module=db status=start max_attempts={} delay_ms={}",
            policy.max_attempts(),
            policy.delay().as_millis()
        );

        let connection_string = self.config.connection_string.as_str();
        let pool_size = self.config.pool_size;
        let result = retry_with_backoff(policy, sleep, |_| {
            CatalogDb::open(connection_string, pool_size)
        });

        match result {
            Ok(db) => {
                info!(
                    "event=db_connect module=db status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(db)
            }
            Err(exhausted) => {
                error!(
                    "event=db_connect module=db status=error attempts={} duration_ms={} error={}",
                    exhausted.attempts,
                    started_at.elapsed().as_millis(),
                    exhausted.last_error
                );
                Err(exhausted.into())
            }
        }
    }
}
