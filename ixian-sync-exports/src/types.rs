// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use ixian_ledger_exports::WalletStateStore;
use ixian_models::NodeStatus;
use ixian_pool_exports::PoolController;
use ixian_protocol_exports::PeerTransport;
use ixian_storage_exports::BlockStore;
use serde::{Deserialize, Serialize};

use crate::BlockProcessor;

/// Outcome of a block verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockVerifyStatus {
    /// the block can be applied
    Valid,
    /// the block must be discarded
    Invalid,
    /// some transactions of the block are still missing
    Indeterminate,
}

/// Node status as reported to the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DltStatus {
    /// catching up with the network
    Synchronizing,
    /// following the network
    Active,
    /// no block was received for a long time
    ErrorLongTimeNoBlock,
    /// the network moved to a block version this node does not understand
    ErrorForkedViaUpgrade,
}

/// Phase of the synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// no target known yet
    Idle,
    /// requesting and rolling forward blocks
    Syncing,
    /// downloading the wallet state chunks
    WalletStateSyncing,
    /// caught up with the target
    Synced,
}

/// Snapshot of the synchronization bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// phase
    pub state: SyncState,
    /// the node is synchronizing
    pub synchronizing: bool,
    /// height the node is catching up with
    pub target: u64,
    /// local tip
    pub local_height: u64,
    /// heights not received yet
    pub missing_blocks: u64,
    /// received blocks waiting to be applied
    pub pending_blocks: u64,
    /// height the downloaded wallet state is valid at, 0 if none
    pub wallet_state_confirmed_height: u64,
    /// wallet state chunks not received yet
    pub missing_chunks: u64,
}

/// Wallet state description sent before its chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStateHeader {
    /// wallet state version
    pub version: u32,
    /// height the wallet state is valid at
    pub block_num: u64,
    /// number of wallets
    pub wallet_count: u64,
}

/// Components the sync engine drives
#[derive(Clone)]
pub struct SyncChannels {
    /// local chain
    pub block_store: Arc<dyn BlockStore>,
    /// wallet state rebuilt while rolling forward
    pub wallet_state: Arc<dyn WalletStateStore>,
    /// transaction pool
    pub pool: Box<dyn PoolController>,
    /// peers
    pub transport: Arc<dyn PeerTransport>,
    /// node status flags
    pub status: Arc<NodeStatus>,
    /// block verification and application
    pub block_processor: Arc<dyn BlockProcessor>,
}
