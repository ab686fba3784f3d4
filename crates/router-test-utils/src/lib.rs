//! # Router Test Utilities
//!
//! Shared test utilities for the signal router.
//!
//! This crate provides mock collaborators and fixtures so worker and peer
//! channel behavior can be tested in-process, with no Redis and no engine.
//!
//! ## Modules
//!
//! - `mock_manager` - `Manager` backed by in-memory queues that records calls
//! - `mock_engine` - `EngineConnection` that records calls and emits events on demand
//! - `flaky_queue` - `Queue` whose pops fail a set number of times first
//! - `fixtures` - request builders and reply readers for one test peer
//! - `eventual` - polling assertion for effects of spawned tasks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use router_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let manager = MockManager::new().with_room("room1");
//!     let worker = test_worker(&manager);
//!     let peer = TestPeer::new("peerA", "room1");
//!
//!     worker.handle(&peer.join("req-1")).await.unwrap();
//!
//!     let reply = peer.next_reply(&manager).await.expect("join reply");
//!     assert_eq!(reply.request_id.as_deref(), Some("req-1"));
//! }
//! ```

pub mod eventual;
pub mod fixtures;
pub mod flaky_queue;
pub mod mock_engine;
pub mod mock_manager;

pub use eventual::*;
pub use fixtures::*;
pub use flaky_queue::*;
pub use mock_engine::*;
pub use mock_manager::*;
