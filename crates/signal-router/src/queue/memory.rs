//! In-process queue backend.

use super::Queue;
use crate::errors::RouterError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;

/// In-memory FIFO queue with entry aging.
///
/// Entries older than `max_age` are discarded when they reach the head of the
/// queue. Waiters are woken through a [`Notify`], so a pop never spins.
#[derive(Debug)]
pub struct MemoryQueue {
    topic: String,
    max_age: Duration,
    entries: Mutex<VecDeque<(Instant, Vec<u8>)>>,
    notify: Notify,
}

impl MemoryQueue {
    #[must_use]
    pub fn new(topic: impl Into<String>, max_age: Duration) -> Self {
        Self {
            topic: topic.into(),
            max_age,
            entries: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Number of entries currently held, including stale ones not yet discarded.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    async fn try_pop(&self) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().await;
        while let Some((enqueued_at, payload)) = entries.pop_front() {
            if enqueued_at.elapsed() <= self.max_age {
                return Some(payload);
            }
            debug!(
                target: "router.queue",
                topic = %self.topic,
                "Discarding stale queue entry"
            );
        }
        None
    }

    async fn wait_next(&self) -> Vec<u8> {
        loop {
            // Register interest before checking so a concurrent enqueue is not missed.
            let notified = self.notify.notified();
            if let Some(payload) = self.try_pop().await {
                return payload;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn enqueue(&self, payload: &[u8]) -> Result<(), RouterError> {
        self.entries
            .lock()
            .await
            .push_back((Instant::now(), payload.to_vec()));
        self.notify.notify_one();
        Ok(())
    }

    async fn block_until_next(&self, timeout: Duration) -> Result<Vec<u8>, RouterError> {
        if timeout.is_zero() {
            return Ok(self.wait_next().await);
        }
        tokio::time::timeout(timeout, self.wait_next())
            .await
            .map_err(|_| RouterError::QueueTimeout(self.topic.clone()))
    }
}

/// Hands out one shared [`MemoryQueue`] per topic.
#[derive(Debug, Clone)]
pub struct MemoryQueueSet {
    max_age: Duration,
    queues: Arc<std::sync::Mutex<HashMap<String, Arc<MemoryQueue>>>>,
}

impl MemoryQueueSet {
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            queues: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    /// The queue for `topic`, created on first use.
    #[must_use]
    pub fn get(&self, topic: &str) -> Arc<MemoryQueue> {
        // A poisoned map still holds valid queues; keep using it.
        let mut queues = self
            .queues
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            queues
                .entry(topic.to_string())
                .or_insert_with(|| Arc::new(MemoryQueue::new(topic, self.max_age))),
        )
    }

    /// Topics created so far.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let queues = self
            .queues
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        queues.keys().cloned().collect()
    }
}
