//! Queue topic naming.
//!
//! - `{ns}worker/{node_id}` - a node's inbound command queue
//! - `{ns}peer/{pid}/to` - messages addressed to a connection's peer channel
//! - `{ns}peer/{pid}/from` - replies produced for a connection's client
//!
//! Every node in a deployment must agree on the namespace.

use crate::config::DEFAULT_TOPIC_NAMESPACE;

/// Topic name builder for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    namespace: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_NAMESPACE)
    }
}

impl Topics {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Inbound command topic of a worker node.
    #[must_use]
    pub fn worker(&self, node_id: &str) -> String {
        format!("{}worker/{node_id}", self.namespace)
    }

    /// Topic consumed by the peer channel of `pid`.
    #[must_use]
    pub fn to_peer(&self, pid: &str) -> String {
        format!("{}peer/{pid}/to", self.namespace)
    }

    /// Topic the replies for `pid` are enqueued on.
    #[must_use]
    pub fn from_peer(&self, pid: &str) -> String {
        format!("{}peer/{pid}/from", self.namespace)
    }
}
