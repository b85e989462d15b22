// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::types::BlockSearchMode;
use ixian_time::IxianTime;
use serde::{Deserialize, Serialize};

/// Miner configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MinerConfig {
    /// start the mining threads
    pub enabled: bool,
    /// requested number of mining threads, clamped to what the machine allows
    pub thread_count: usize,
    /// how the next block to solve is picked
    pub search_mode: BlockSearchMode,
    /// period of the hash rate computation
    pub stats_interval: IxianTime,
    /// how often the threads check whether the node is operating before they start
    pub block_processor_poll_interval: IxianTime,
    /// number of blocks the chain retains
    pub redacted_window_size: u64,
    /// the threads only start once the chain is longer than this
    pub min_chain_height: u64,
}
