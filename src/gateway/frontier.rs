//! Crawl frontier: the pending-url queue plus the ever-seen set.
//!
//! A url is in the seen set iff it is queued or was popped at least once;
//! that set is the dedup barrier for both submission paths. `pop` suspends
//! the caller until a url is available, with no timeout.
//!
//! Depth gating is a coarse global counter of crawler discoveries since the
//! last client submission, an approximation of BFS depth, not a per-path
//! bound.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

pub struct Frontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
    max_depth: usize,
}

#[derive(Default)]
struct FrontierInner {
    queue: VecDeque<String>,
    seen: HashSet<String>,
    /// Crawler discoveries admitted since the last client submission.
    discovered: usize,
}

impl Frontier {
    pub fn new(max_depth: usize) -> Self {
        Self {
            inner: Mutex::new(FrontierInner::default()),
            notify: Notify::new(),
            max_depth,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Client submission: admitted if unseen, and treated as a fresh crawl
    /// root, re-arming the discovery budget.
    pub fn client_index_url(&self, url: &str) -> bool {
        if url.trim().is_empty() {
            tracing::warn!("Ignoring empty url submission");
            return false;
        }

        let mut inner = self.lock();
        if inner.seen.contains(url) {
            tracing::info!("URL ({}) was already queued or indexed", url);
            return false;
        }

        inner.seen.insert(url.to_string());
        inner.queue.push_back(url.to_string());
        inner.discovered = 0;
        drop(inner);

        tracing::info!("URL {} added to the queue", url);
        self.notify.notify_one();
        true
    }

    /// Crawler discovery: same dedup, silently dropped once the discovery
    /// budget since the last client submission is spent.
    pub fn queue_discovered(&self, url: &str) -> bool {
        if url.trim().is_empty() {
            return false;
        }

        let mut inner = self.lock();
        if inner.discovered >= self.max_depth {
            return false;
        }
        if inner.seen.contains(url) {
            tracing::info!("URL ({}) was already queued or indexed", url);
            return false;
        }

        inner.seen.insert(url.to_string());
        inner.queue.push_back(url.to_string());
        inner.discovered += 1;
        drop(inner);

        tracing::info!("URL {} added to the queue", url);
        self.notify.notify_one();
        true
    }

    /// Blocking dequeue: suspends until a url is available.
    pub async fn pop(&self) -> String {
        loop {
            // Arm the waiter before checking, so a notify between the check
            // and the await is not lost
            let notified = self.notify.notified();

            if let Some(url) = self.lock().queue.pop_front() {
                return url;
            }

            notified.await;
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn seen(&self) -> usize {
        self.lock().seen.len()
    }
}
