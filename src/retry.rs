//! Bounded retry with a fixed backoff
//!
//! Every store mutation and every collaborator call goes through one
//! [`RetryPolicy`]. An error is retried only when it reports itself as
//! [`Transient`]; anything else is handed back on the first attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Errors that know whether trying again could succeed
pub trait Transient {
    /// Returns true if the failure is temporary (lock contention, timeout)
    fn is_transient(&self) -> bool;
}

impl Transient for rusqlite::Error {
    fn is_transient(&self) -> bool {
        match self {
            rusqlite::Error::SqliteFailure(err, _) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Fixed-interval retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Wait between two attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Runs a blocking operation, sleeping the calling thread between attempts
    pub fn run<T, E, F>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Transient + Display,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        "Transient failure ({}), retrying {}/{}",
                        err,
                        attempt,
                        self.max_attempts
                    );
                    std::thread::sleep(self.backoff);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Runs an async operation, yielding to the runtime between attempts
    pub async fn run_async<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        "Transient failure ({}), retrying {}/{}",
                        err,
                        attempt,
                        self.max_attempts
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
