//! Queue whose pops fail a fixed number of times before working.
//!
//! Wraps a `MemoryQueue` so enqueued entries survive the failures and are
//! delivered once the failure budget is spent. Each pop attempt is timestamped
//! with the tokio clock, so tests under `start_paused` can check retry spacing.
//!
//! # Example
//!
//! ```rust,ignore
//! let flaky = Arc::new(FlakyQueue::new("noir/worker/node-test", 2));
//! let manager = MockManager::new().with_queue(flaky.clone());
//!
//! // ... run the consumer ...
//!
//! assert!(flaky.pop_attempts() >= 3);
//! ```

use crate::mock_manager::MOCK_QUEUE_MAX_AGE;
use async_trait::async_trait;
use signal_router::queue::{MemoryQueue, Queue};
use signal_router::RouterError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct FlakyQueue {
    inner: MemoryQueue,
    failures_left: AtomicUsize,
    attempts: Mutex<Vec<Instant>>,
}

impl FlakyQueue {
    /// Fail the first `failures` calls to `block_until_next`.
    pub fn new(topic: &str, failures: usize) -> Self {
        Self {
            inner: MemoryQueue::new(topic, MOCK_QUEUE_MAX_AGE),
            failures_left: AtomicUsize::new(failures),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Number of `block_until_next` calls so far, failed or not.
    pub fn pop_attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Tokio-clock instant of every `block_until_next` call, in order.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    /// Entries waiting in the underlying queue.
    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.is_empty().await
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Queue for FlakyQueue {
    fn topic(&self) -> &str {
        self.inner.topic()
    }

    async fn enqueue(&self, payload: &[u8]) -> Result<(), RouterError> {
        self.inner.enqueue(payload).await
    }

    async fn block_until_next(&self, timeout: Duration) -> Result<Vec<u8>, RouterError> {
        self.attempts.lock().unwrap().push(Instant::now());
        if self.take_failure() {
            return Err(RouterError::queue(self.inner.topic(), "injected pop failure"));
        }
        self.inner.block_until_next(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fails_then_delivers() {
        let queue = FlakyQueue::new("t", 2);
        queue.enqueue(b"hello").await.unwrap();

        for _ in 0..2 {
            assert!(matches!(
                queue.block_until_next(Duration::ZERO).await,
                Err(RouterError::Queue { .. })
            ));
        }
        assert_eq!(queue.len().await, 1);

        let payload = queue.block_until_next(Duration::ZERO).await.unwrap();
        assert_eq!(payload, b"hello");
        assert_eq!(queue.pop_attempts(), 3);
    }
}
