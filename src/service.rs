//! Deadline-bounded async access to the blocking stores.
//!
//! RocksDB calls and password hashing block the calling thread, so request
//! handlers run them on tokio's blocking pool. Each call carries a deadline;
//! when it fires the caller gets `StoreUnavailable` and stops waiting. Work
//! already handed to the pool still finishes, and every store operation is
//! safe to repeat.

use crate::error::{BlogError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Shared handle to a blocking component plus its deadline.
pub struct Blocking<T> {
    inner: Arc<T>,
    deadline: Duration,
}

impl<T> Clone for Blocking<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            deadline: self.deadline,
        }
    }
}

impl<T: Send + Sync + 'static> Blocking<T> {
    pub fn new(inner: Arc<T>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    /// Direct access for callers already off the async runtime.
    pub fn inner(&self) -> &Arc<T> {
        &self.inner
    }

    /// Runs `op` on the blocking pool within the deadline.
    pub async fn run<R, F>(&self, op: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&T) -> Result<R> + Send + 'static,
    {
        let inner = self.inner.clone();
        let task = tokio::task::spawn_blocking(move || op(&inner));

        match tokio::time::timeout(self.deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                error!("Store task failed: {}", join_error);
                Err(BlogError::StoreUnavailable("store task failed".into()))
            }
            Err(_) => {
                warn!(deadline_ms = self.deadline.as_millis() as u64, "Store operation timed out");
                Err(BlogError::StoreUnavailable("store operation timed out".into()))
            }
        }
    }
}

impl<T> std::fmt::Debug for Blocking<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blocking")
            .field("deadline", &self.deadline)
            .finish()
    }
}
