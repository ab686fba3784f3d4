//! Noir signal router.
//!
//! Moves signaling messages (join, SDP offer/answer, ICE candidates, kill)
//! between distributed worker nodes and per-connection handlers over named,
//! ordered, blocking queues. Media negotiation and forwarding belong to an
//! external engine, reached through [`engine::EngineConnection`]; room state
//! and connection lifecycle belong to a [`manager::Manager`].
//!
//! # Architecture
//!
//! ```text
//! {ns}worker/{node}  --> Worker --(join)--> EngineConnection
//!                          |                      |
//!                          | spawns               | events
//!                          v                      v
//! {ns}peer/{pid}/to  --> PeerChannel        event forwarder
//!                          |                      |
//!                          +----> {ns}peer/{pid}/from <----+
//! ```
//!
//! # Modules
//!
//! - [`worker`] - node dispatch loop and join procedure
//! - [`peer`] - per-connection channels, engine event forwarding, live-channel registry
//! - [`queue`] - queue trait with in-memory and Redis backends
//! - [`protocol`] - envelopes, SDP/ICE shapes, topics, JSON codec
//! - [`node`] - process harness with health endpoints and signal handling

pub mod config;
pub mod engine;
pub mod errors;
pub mod manager;
pub mod node;
pub mod observability;
pub mod peer;
pub mod protocol;
pub mod queue;
pub mod worker;

pub use config::Config;
pub use errors::RouterError;
pub use manager::{Manager, RoomData};
pub use worker::Worker;
