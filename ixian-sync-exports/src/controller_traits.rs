// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This module exports generic traits representing interfaces for interacting
//! with the sync worker.

use ixian_models::{Block, WalletStateChunk};
use ixian_protocol_exports::{HelloData, PeerId};

use crate::{DltStatus, SyncProgress, WalletStateHeader};

/// interface that communicates with the sync engine
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait SyncController: Send + Sync {
    /// Handles the block sync handshake of a peer, or our own when starting from storage
    fn on_hello_data(&self, hello: HelloData);

    /// Handles a block received while synchronizing
    fn on_block_received(&self, block: Block);

    /// Handles the wallet state header sent by the peer we sync the wallet state from
    fn on_wallet_state_header(&self, header: WalletStateHeader);

    /// Handles a wallet state chunk
    fn on_wallet_state_chunk_received(&self, chunk: WalletStateChunk);

    /// A peer asks for our wallet state.
    /// Returns the header to send back, none while we are synchronizing ourselves.
    fn start_outgoing_wallet_state_sync(&self, peer: &PeerId) -> Option<WalletStateHeader>;

    /// A peer asks for chunk `chunk_num` of our wallet state
    fn on_request_wallet_chunk(&self, chunk_num: u64, peer: &PeerId);

    /// Resets the block bookkeeping and enters synchronization
    fn start_sync(&self);

    /// The node is catching up with the network
    fn is_synchronizing(&self) -> bool;

    /// Progress of the synchronization
    fn get_sync_progress(&self) -> SyncProgress;

    /// Node status as reported to the API
    fn get_dlt_status(&self) -> DltStatus;

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn SyncController>`.
    fn clone_box(&self) -> Box<dyn SyncController>;
}

/// Allow cloning `Box<dyn SyncController>`
/// Uses `SyncController::clone_box` internally
impl Clone for Box<dyn SyncController> {
    fn clone(&self) -> Box<dyn SyncController> {
        self.clone_box()
    }
}

/// Sync manager used to stop the sync thread
pub trait SyncManager {
    /// Stop the sync thread
    /// Note that we do not take self by value to consume it
    /// because it is not allowed to move out of `Box<dyn SyncManager>`
    fn stop(&mut self);
}
