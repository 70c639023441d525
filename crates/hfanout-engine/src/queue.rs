//! Thread-safe FIFO of pending requests.
//!
//! Callers append from any thread; only the reactor thread dequeues. The
//! mutex guards nothing but the deque itself and is never held across a
//! reactor or transfer-engine call, so it cannot head-of-line block the
//! dispatch path.
//!
//! Enqueueing wakes no one by itself — the caller signals the wakeup fd
//! separately after pushing.

use hfanout_core::request::HttpRequest;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
pub struct RequestQueue {
    inner: Mutex<VecDeque<Arc<HttpRequest>>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request. Thread-safe, never blocks on the reactor.
    pub fn push(&self, request: Arc<HttpRequest>) {
        self.lock().push_back(request);
    }

    /// Atomically remove and return up to `n` requests in FIFO order.
    pub fn pop_up_to(&self, n: usize) -> Vec<Arc<HttpRequest>> {
        let mut guard = self.lock();
        let count = n.min(guard.len());
        guard.drain(..count).collect()
    }

    /// Snapshot of the pending count; may be stale immediately after return.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Arc<HttpRequest>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
