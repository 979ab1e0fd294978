//! Scoped advisory lock around a migration run.

use crate::error::{EngineError, EngineResult};
use sm_db::DatabaseLock;
use std::time::Duration;
use tokio::time::Instant;

/// Delay between acquisition attempts.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Holds a named advisory lock until [`release`](LockGuard::release) is called.
///
/// Release needs an async round trip, so it cannot happen in `Drop`; a guard
/// dropped while still held logs a warning and the lock row stays behind.
pub struct LockGuard<'a, L: DatabaseLock + ?Sized> {
    db: &'a L,
    name: String,
    released: bool,
}

impl<'a, L: DatabaseLock + ?Sized> LockGuard<'a, L> {
    /// Poll for `name` until it is free or `timeout` elapses.
    ///
    /// A zero timeout makes exactly one attempt.
    pub async fn acquire(db: &'a L, name: &str, timeout: Duration) -> EngineResult<Self> {
        let deadline = Instant::now() + timeout;
        loop {
            if db.try_acquire_lock(name).await? {
                return Ok(Self {
                    db,
                    name: name.to_string(),
                    released: false,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(EngineError::LockTimeout {
                    name: name.to_string(),
                    timeout,
                });
            }
            log::debug!("Waiting for migration lock '{}'", name);
            tokio::time::sleep(LOCK_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Name of the held lock.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release the lock.
    pub async fn release(mut self) -> EngineResult<()> {
        self.released = true;
        self.db.release_lock(&self.name).await?;
        Ok(())
    }

    /// Release the lock and pass `outcome` through.
    ///
    /// A release failure replaces a successful outcome; after a failed run
    /// the run's error wins and the release failure is only logged.
    pub async fn release_after<T>(self, outcome: EngineResult<T>) -> EngineResult<T> {
        let name = self.name.clone();
        match (self.release().await, outcome) {
            (Ok(()), outcome) => outcome,
            (Err(release_err), Ok(_)) => Err(release_err),
            (Err(release_err), Err(run_err)) => {
                log::warn!("Failed to release migration lock '{}': {}", name, release_err);
                Err(run_err)
            }
        }
    }
}

impl<L: DatabaseLock + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("Migration lock '{}' dropped without release", self.name);
        }
    }
}
