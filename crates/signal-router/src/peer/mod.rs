//! Per-connection signaling.
//!
//! After a successful join each connection gets a [`PeerChannel`] consuming
//! its inbound topic and an event forwarder turning engine events into
//! replies. Both share the cancellation token issued by the [`PeerRegistry`].

mod channel;
mod events;
mod registry;

pub use channel::{PeerChannel, PeerChannelHandle, PeerSession};
pub use events::spawn_event_forwarder;
pub use registry::{PeerRegistry, Registration};
