//! Per-user lock pool
//!
//! Serialises requests from the same user so the duplicate-order check and
//! the write that follows it cannot interleave with another request from
//! that user. Different users never share a lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::trace;

/// Pool of async mutexes keyed by user id
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the user's lock; it is released when the guard drops
    pub async fn acquire(&self, user: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // drop locks nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user.to_string()).or_default())
        };

        trace!(user = %user, "Waiting for user lock");
        lock.lock_owned().await
    }

    /// Number of users with a live lock
    pub fn active_count(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.len()
    }
}
