// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_hash::Hash;
use ixian_models::{BlockSignature, Transaction, TransactionId, WalletStateChunk};
use ixian_protocol_exports::{PeerId, PeerTransport};
use tracing::debug;

/// Transport of a node without network: nothing is ever delivered
pub struct NoPeerTransport;

impl PeerTransport for NoPeerTransport {
    fn broadcast_get_block(&self, block_num: u64) -> bool {
        debug!("no peer to ask for block #{}", block_num);
        false
    }

    fn broadcast_get_transaction(&self, id: &TransactionId, _block_num: u64) -> bool {
        debug!("no peer to ask for transaction {}", id);
        false
    }

    fn sync_wallet_state_from_peer(&self, _peer: &PeerId) -> bool {
        false
    }

    fn get_wallet_state_chunk_from_peer(&self, _peer: &PeerId, _chunk_num: u64) -> bool {
        false
    }

    fn send_wallet_state_chunk(&self, _peer: &PeerId, _chunk: &WalletStateChunk) -> bool {
        false
    }

    fn broadcast_new_block_signature(
        &self,
        _block_num: u64,
        _block_checksum: &Hash,
        _signature: &BlockSignature,
    ) -> bool {
        false
    }

    fn broadcast_transaction(&self, _transaction: &Transaction, _skip: Option<PeerId>) -> bool {
        false
    }

    fn request_unapplied_transactions(&self) -> bool {
        false
    }

    fn get_connected_peers(&self) -> Vec<PeerId> {
        Vec::new()
    }
}
