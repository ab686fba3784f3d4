//! Named, ordered, blocking message queues.
//!
//! A queue is identified by its topic. Entries are opaque byte strings popped
//! in FIFO order; there is no ordering across topics. Entries older than the
//! session timeout are discarded by the backend.
//!
//! # Backends
//!
//! - [`MemoryQueue`] - in-process, used by single-node deployments and tests
//! - [`RedisQueue`] - `RPUSH`/`BLPOP` lists shared by every node

mod memory;
mod redis;

pub use self::memory::{MemoryQueue, MemoryQueueSet};
pub use self::redis::{RedisQueue, RedisQueueFactory};

use crate::errors::RouterError;
use crate::observability::metrics;
use crate::protocol::{encode_reply, encode_request, Reply, Request};
use async_trait::async_trait;
use std::time::Duration;

/// A named FIFO queue.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Topic this queue reads and writes.
    fn topic(&self) -> &str;

    /// Append one entry. Safe to call from concurrent producers.
    async fn enqueue(&self, payload: &[u8]) -> Result<(), RouterError>;

    /// Pop the oldest live entry, waiting up to `timeout`.
    ///
    /// `Duration::ZERO` waits indefinitely. An elapsed timeout returns
    /// [`RouterError::QueueTimeout`].
    async fn block_until_next(&self, timeout: Duration) -> Result<Vec<u8>, RouterError>;
}

/// Encode a reply and enqueue it.
pub async fn enqueue_reply(queue: &dyn Queue, reply: &Reply) -> Result<(), RouterError> {
    let bytes = encode_reply(reply)?;
    queue.enqueue(&bytes).await?;
    metrics::record_reply(reply.as_signal().payload.kind());
    Ok(())
}

/// Encode a request and enqueue it.
pub async fn enqueue_request(queue: &dyn Queue, request: &Request) -> Result<(), RouterError> {
    let bytes = encode_request(request)?;
    queue.enqueue(&bytes).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::protocol::{decode_reply, decode_request, SessionDescription, SignalReply};

    #[tokio::test]
    async fn test_enqueue_reply_writes_encoded_reply() {
        let queue = MemoryQueue::new("noir/peer/peerA/from", Duration::from_secs(25));
        let reply = Reply::signal(
            SignalReply::join_answer("peerA", "r1", &SessionDescription::answer("v=0")).unwrap(),
        );

        enqueue_reply(&queue, &reply).await.unwrap();

        let bytes = queue.block_until_next(Duration::from_millis(10)).await.unwrap();
        assert_eq!(decode_reply(&bytes).unwrap(), reply);
    }

    #[tokio::test]
    async fn test_enqueue_request_writes_encoded_request() {
        let queue = MemoryQueue::new("noir/worker/n1", Duration::from_secs(25));
        let request = Request::join("peerA", "r1", "room1", "v=0");

        enqueue_request(&queue, &request).await.unwrap();

        let bytes = queue.block_until_next(Duration::from_millis(10)).await.unwrap();
        assert_eq!(decode_request(&bytes).unwrap(), request);
    }
}
