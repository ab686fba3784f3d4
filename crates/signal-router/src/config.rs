//! Signal router configuration.
//!
//! Configuration is loaded once from environment variables at process start
//! and is immutable afterwards. Sensitive fields are redacted in Debug output.

use crate::protocol::Topics;
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default topic namespace shared by every node in a deployment.
pub const DEFAULT_TOPIC_NAMESPACE: &str = "noir/";

/// Default session timeout in seconds. Queue entries older than this are stale.
pub const DEFAULT_SESSION_TIMEOUT_SECONDS: u64 = 25;

/// Default delay between worker retries after a failed `handle_next`.
pub const DEFAULT_WORKER_RETRY_DELAY_MS: u64 = 1000;

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default node ID prefix.
pub const DEFAULT_NODE_ID_PREFIX: &str = "node";

/// Signal router configuration.
#[derive(Clone)]
pub struct Config {
    /// Unique identifier for this node. Keys the node's worker topic.
    pub node_id: String,

    /// Redis connection URL for the Redis queue backend (optional).
    /// Protected by `SecretString` to prevent accidental logging.
    pub redis_url: Option<SecretString>,

    /// Prefix applied to every queue topic.
    pub topic_namespace: String,

    /// Maximum age of a queue entry (default: 25s).
    pub session_timeout: Duration,

    /// Fixed delay between worker retries (default: 1s).
    pub worker_retry_delay: Duration,

    /// Health endpoint bind address (default: "0.0.0.0:8081").
    pub health_bind_address: String,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("node_id", &self.node_id)
            .field(
                "redis_url",
                &self.redis_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("topic_namespace", &self.topic_namespace)
            .field("session_timeout", &self.session_timeout)
            .field("worker_retry_delay", &self.worker_retry_delay)
            .field("health_bind_address", &self.health_bind_address)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let redis_url = vars.get("REDIS_URL").cloned().map(SecretString::from);

        let topic_namespace = vars
            .get("ROUTER_TOPIC_NAMESPACE")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TOPIC_NAMESPACE.to_string());

        let session_timeout_seconds = parse_u64(
            vars,
            "ROUTER_SESSION_TIMEOUT_SECONDS",
            DEFAULT_SESSION_TIMEOUT_SECONDS,
        )?;
        if session_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "ROUTER_SESSION_TIMEOUT_SECONDS must be greater than zero".to_string(),
            ));
        }

        let worker_retry_delay_ms = parse_u64(
            vars,
            "ROUTER_WORKER_RETRY_DELAY_MS",
            DEFAULT_WORKER_RETRY_DELAY_MS,
        )?;

        let health_bind_address = vars
            .get("ROUTER_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        // Generate node ID
        let node_id = vars.get("ROUTER_NODE_ID").cloned().unwrap_or_else(|| {
            let hostname = vars
                .get("HOSTNAME")
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_NODE_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            node_id,
            redis_url,
            topic_namespace,
            session_timeout: Duration::from_secs(session_timeout_seconds),
            worker_retry_delay: Duration::from_millis(worker_retry_delay_ms),
            health_bind_address,
        })
    }

    /// Topic naming for this deployment.
    #[must_use]
    pub fn topics(&self) -> Topics {
        Topics::new(self.topic_namespace.clone())
    }
}

fn parse_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{name}={raw}: {e}"))),
        None => Ok(default),
    }
}
