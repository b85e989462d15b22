// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Peer network as seen by the node core.
//!
//! The transport itself lives outside of the core: workers only call the
//! `PeerTransport` trait and decode the block sync handshake payload.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod error;
mod hello;
mod transport;

pub use error::{ProtocolError, ProtocolResult};
pub use hello::{HelloData, HelloDataDeserializer, HelloDataSerializer};
pub use transport::{PeerId, PeerTransport};

#[cfg(any(test, feature = "test-exports"))]
pub use transport::MockPeerTransport;
