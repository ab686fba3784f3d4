//! Redis list queue backend.
//!
//! # Key Patterns
//!
//! - `{topic}` - a Redis list; producers `RPUSH`, consumers `BLPOP`
//!
//! Every push refreshes the list's `EXPIRE` to the session timeout, so a topic
//! nobody consumes disappears once it has been idle that long.
//!
//! # Connection Pattern
//!
//! Pushes share the factory's `MultiplexedConnection` (cloned per operation).
//! `BLPOP` holds its connection until an entry arrives, so each consuming
//! queue opens its own connection on first pop and reuses it afterwards.

use super::Queue;
use crate::config::Config;
use crate::errors::RouterError;
use crate::observability::metrics;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Builds [`RedisQueue`]s that share one client and producer connection.
#[derive(Clone)]
pub struct RedisQueueFactory {
    client: Client,
    connection: MultiplexedConnection,
    max_age: Duration,
}

impl RedisQueueFactory {
    /// Connect using `REDIS_URL` and the session timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::Config` when no Redis URL is configured and
    /// `RouterError::Queue` when the connection fails.
    pub async fn from_config(config: &Config) -> Result<Self, RouterError> {
        let url = config
            .redis_url
            .as_ref()
            .ok_or_else(|| RouterError::Config("REDIS_URL is not set".to_string()))?;
        Self::connect(url.expose_secret(), config.session_timeout).await
    }

    /// Connect to `redis_url`.
    pub async fn connect(redis_url: &str, max_age: Duration) -> Result<Self, RouterError> {
        let client = Client::open(redis_url).map_err(|e| {
            // Do not log redis_url, it may carry credentials
            error!(
                target: "router.queue",
                error = %e,
                "Failed to open Redis client"
            );
            RouterError::Config(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(
                    target: "router.queue",
                    error = %e,
                    "Failed to connect to Redis"
                );
                RouterError::queue("<connect>", e)
            })?;

        Ok(Self {
            client,
            connection,
            max_age,
        })
    }

    /// A queue bound to `topic`.
    #[must_use]
    pub fn queue(&self, topic: impl Into<String>) -> Arc<RedisQueue> {
        Arc::new(RedisQueue {
            topic: topic.into(),
            client: self.client.clone(),
            connection: self.connection.clone(),
            consumer: Mutex::new(None),
            max_age: self.max_age,
        })
    }
}

/// Queue backed by a Redis list.
pub struct RedisQueue {
    topic: String,
    client: Client,
    connection: MultiplexedConnection,
    /// Dedicated connection for blocking pops, opened lazily.
    consumer: Mutex<Option<MultiplexedConnection>>,
    max_age: Duration,
}

impl RedisQueue {
    fn expire_seconds(&self) -> i64 {
        i64::try_from(self.max_age.as_secs().max(1)).unwrap_or(i64::MAX)
    }

    async fn consumer_connection(&self) -> Result<MultiplexedConnection, RouterError> {
        let mut consumer = self.consumer.lock().await;
        if let Some(conn) = consumer.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RouterError::queue(&self.topic, e))?;
        *consumer = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl Queue for RedisQueue {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn enqueue(&self, payload: &[u8]) -> Result<(), RouterError> {
        let mut conn = self.connection.clone();

        let () = redis::pipe()
            .atomic()
            .rpush(&self.topic, payload)
            .ignore()
            .expire(&self.topic, self.expire_seconds())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(
                    target: "router.queue",
                    error = %e,
                    topic = %self.topic,
                    "Failed to enqueue"
                );
                metrics::record_queue_error("enqueue");
                RouterError::queue(&self.topic, e)
            })?;

        Ok(())
    }

    async fn block_until_next(&self, timeout: Duration) -> Result<Vec<u8>, RouterError> {
        let mut conn = self.consumer_connection().await?;

        // BLPOP treats a zero timeout as "wait forever".
        let popped: Result<Option<(String, Vec<u8>)>, RouterError> = redis::cmd("BLPOP")
            .arg(&self.topic)
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(
                    target: "router.queue",
                    error = %e,
                    topic = %self.topic,
                    "Blocking pop failed"
                );
                RouterError::queue(&self.topic, e)
            });

        match popped {
            Ok(Some((_, payload))) => Ok(payload),
            Ok(None) => Err(RouterError::QueueTimeout(self.topic.clone())),
            Err(e) => {
                // Reconnect on the next pop.
                *self.consumer.lock().await = None;
                debug!(
                    target: "router.queue",
                    topic = %self.topic,
                    "Dropped consumer connection after error"
                );
                Err(e)
            }
        }
    }
}
