// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_hash::Hash;
use ixian_models::{BlockSignature, Transaction, TransactionId, WalletStateChunk};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a connected peer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        PeerId(value.to_string())
    }
}

/// Outgoing side of the peer network.
///
/// Every call is fire and forget: `true` means the message was handed to at
/// least one peer, never that it was answered.
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait PeerTransport: Send + Sync {
    /// Asks the network for block `block_num`
    fn broadcast_get_block(&self, block_num: u64) -> bool;

    /// Asks the network for transaction `id`, applied in `block_num` (0 if unknown)
    fn broadcast_get_transaction(&self, id: &TransactionId, block_num: u64) -> bool;

    /// Asks `peer` for the header of its wallet state
    fn sync_wallet_state_from_peer(&self, peer: &PeerId) -> bool;

    /// Asks `peer` for one wallet state chunk
    fn get_wallet_state_chunk_from_peer(&self, peer: &PeerId, chunk_num: u64) -> bool;

    /// Answers a chunk request of `peer`
    fn send_wallet_state_chunk(&self, peer: &PeerId, chunk: &WalletStateChunk) -> bool;

    /// Announces our signature of block `block_num`
    fn broadcast_new_block_signature(
        &self,
        block_num: u64,
        block_checksum: &Hash,
        signature: &BlockSignature,
    ) -> bool;

    /// Relays `transaction`, skipping the peer it came from
    fn broadcast_transaction(&self, transaction: &Transaction, skip: Option<PeerId>) -> bool;

    /// Asks the network for the transactions it has not applied yet
    fn request_unapplied_transactions(&self) -> bool;

    /// Currently connected peers
    fn get_connected_peers(&self) -> Vec<PeerId>;
}
