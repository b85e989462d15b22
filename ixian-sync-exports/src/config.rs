// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_time::IxianTime;
use serde::{Deserialize, Serialize};

/// Sync engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// how far above the local tip blocks are requested
    pub max_block_requests: u64,
    /// a block request is sent again after this delay
    pub block_request_timeout: IxianTime,
    /// the chain is rolled back when no block was committed for this long
    pub watchdog_timeout: IxianTime,
    /// an outgoing wallet state snapshot is kept this long after the last chunk request
    pub chunk_request_cooldown: IxianTime,
    /// number of wallets per wallet state chunk
    pub wallet_state_chunk_split: usize,
    /// number of blocks the chain retains
    pub redacted_window_size: u64,
    /// keep every block and replay the whole history
    pub store_full_history: bool,
    /// rebuild the chain from local storage
    pub recover_from_file: bool,
    /// fully re-verify everything read from local storage
    pub full_storage_data_verification: bool,
    /// complete the synchronization without waiting for a peer
    pub no_network_sync: bool,
    /// the wallet state is saved every this many blocks while rolling forward, 0 to never save it
    pub save_wallet_state_every_block: u64,
    /// sign the blocks close to the network tip
    pub master_node: bool,
    /// the node reports an error when no block was received for this long
    pub long_time_no_block: IxianTime,
}
