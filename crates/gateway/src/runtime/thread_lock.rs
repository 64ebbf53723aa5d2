//! Per-thread concurrency control.
//!
//! Only one turn runs per conversation thread at a time. A second message
//! for the same thread waits until the running turn releases its permit;
//! turns on different threads never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Manages per-thread run locks.
///
/// Each thread id maps to a `Semaphore(1)`. Holding the permit gives
/// exclusive access for one turn; it is released on drop.
pub struct ThreadLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for ThreadLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the run lock for a thread, waiting for any in-flight turn.
    pub async fn acquire(&self, thread_id: &str) -> Result<OwnedSemaphorePermit, ThreadLockClosed> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(thread_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned().await.map_err(|_| ThreadLockClosed)
    }

    /// Number of tracked threads (for monitoring).
    pub fn thread_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop locks that nobody holds or waits on.
    ///
    /// A semaphore cloned out by a pending `acquire` has a strong count
    /// above one and is kept, so a waiter never ends up on a lock that a
    /// newer caller cannot see.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1 || sem.available_permits() == 0);
    }
}

/// The lock's semaphore was closed. Never happens while the map is alive.
#[derive(Debug)]
pub struct ThreadLockClosed;

impl std::fmt::Display for ThreadLockClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "thread lock closed")
    }
}

impl std::error::Error for ThreadLockClosed {}
