//! Rate-limited work queue with per-key serialization.
//!
//! A key is handed to at most one worker at a time. Adding a key that is
//! already waiting is a no-op; adding a key that is being processed marks it
//! dirty so it is queued again once the worker calls [`WorkQueue::done`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use rcs_state::ObjectKey;
use tokio::sync::{Mutex, Notify};
use tracing::trace;

/// First retry delay after a failed reconcile.
pub const BASE_BACKOFF: Duration = Duration::from_millis(5);

/// Upper bound for the per-key failure backoff.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Default)]
struct QueueState {
    queue: VecDeque<ObjectKey>,
    /// Keys that need processing (queued, or re-added while processing).
    dirty: HashSet<ObjectKey>,
    processing: HashSet<ObjectKey>,
    failures: HashMap<ObjectKey, u32>,
    shutdown: bool,
}

/// Cloneable handle to a shared work queue.
#[derive(Clone, Default)]
pub struct WorkQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a key now.
    pub async fn add(&self, key: ObjectKey) {
        let mut state = self.state.lock().await;
        if state.shutdown || state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            trace!(%key, "key busy, marked dirty");
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
    }

    /// Enqueue a key after `delay`.
    pub fn add_after(&self, key: ObjectKey, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key).await;
        });
    }

    /// Enqueue a key after its exponential failure backoff.
    pub async fn add_rate_limited(&self, key: ObjectKey) -> Duration {
        let delay = {
            let mut state = self.state.lock().await;
            let failures = state.failures.entry(key.clone()).or_insert(0);
            let delay = backoff_for(*failures);
            *failures = failures.saturating_add(1);
            delay
        };
        self.add_after(key, delay);
        delay
    }

    /// Reset the failure count for a key.
    pub async fn forget(&self, key: &ObjectKey) {
        self.state.lock().await.failures.remove(key);
    }

    /// Wait for the next key. Returns `None` once shut down.
    pub async fn get(&self) -> Option<ObjectKey> {
        loop {
            // Register interest before checking so a concurrent add or
            // shutdown cannot slip between the check and the wait.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock().await;
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutdown {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark a key finished; re-queue it if it was added meanwhile.
    pub async fn done(&self, key: &ObjectKey) {
        let mut state = self.state.lock().await;
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    pub async fn shutdown(&self) {
        self.state.lock().await.shutdown = true;
        self.notify.notify_waiters();
    }

    /// Number of keys waiting to be handed out.
    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// `BASE_BACKOFF * 2^failures`, capped at [`MAX_BACKOFF`].
pub fn backoff_for(failures: u32) -> Duration {
    let factor = 2u32.saturating_pow(failures.min(31));
    BASE_BACKOFF.saturating_mul(factor).min(MAX_BACKOFF)
}
