//! Live peer channel registry.
//!
//! Maps each pid to the generation and cancellation token of its current
//! channel. Registering a pid that is already live cancels the previous
//! channel, so a pid never has two channels consuming its topic.

use crate::observability::metrics;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Token and generation handed to a newly registered channel.
#[derive(Debug, Clone)]
pub struct Registration {
    pub generation: u64,
    pub cancel_token: CancellationToken,
    /// Whether an older live channel for the same pid was cancelled.
    pub replaced: bool,
}

#[derive(Debug)]
struct Entry {
    generation: u64,
    cancel_token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct PeerRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    next_generation: AtomicU64,
}

impl PeerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // Entries stay consistent across a panic in another holder.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a new channel for `pid`, cancelling any live predecessor.
    pub fn register(&self, pid: &str) -> Registration {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel_token = CancellationToken::new();

        let mut entries = self.entries();
        let previous = entries.insert(
            pid.to_string(),
            Entry {
                generation,
                cancel_token: cancel_token.clone(),
            },
        );
        let replaced = match previous {
            Some(old) => {
                info!(
                    target: "router.peer",
                    pid = %pid,
                    old_generation = old.generation,
                    generation,
                    "Replacing live peer channel"
                );
                old.cancel_token.cancel();
                true
            }
            None => false,
        };
        metrics::set_peer_channels_active(entries.len());

        Registration {
            generation,
            cancel_token,
            replaced,
        }
    }

    /// Remove `pid` if its entry still belongs to `generation`.
    ///
    /// Returns `false` when a newer channel has taken over the pid.
    pub fn remove(&self, pid: &str, generation: u64) -> bool {
        let mut entries = self.entries();
        let owned = entries
            .get(pid)
            .is_some_and(|entry| entry.generation == generation);
        if owned {
            entries.remove(pid);
            metrics::set_peer_channels_active(entries.len());
        }
        owned
    }

    #[must_use]
    pub fn is_active(&self, pid: &str) -> bool {
        self.entries().contains_key(pid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Cancel every live channel. Used on node shutdown.
    pub fn cancel_all(&self) {
        for entry in self.entries().values() {
            entry.cancel_token.cancel();
        }
    }
}
