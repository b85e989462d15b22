// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use ixian_ledger_exports::WalletStateStore;
use ixian_models::NodeStatus;
use ixian_pool_exports::PoolController;
use ixian_pow::PowHasher;
use ixian_storage_exports::BlockStore;
use ixian_time::IxianTime;
use serde::{Deserialize, Serialize};

/// Order in which the unsolved blocks are considered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSearchMode {
    /// easiest block first
    LowestDifficulty,
    /// easiest blocks, skipping a random number of them
    #[default]
    RandomLowestDifficulty,
    /// most recent block first
    LatestBlock,
    /// any block
    Random,
}

/// Miner statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MinerStats {
    /// number of mining threads
    pub thread_count: usize,
    /// mining is paused
    pub paused: bool,
    /// hashes per second over the last stats interval
    pub hash_rate: u64,
    /// block being solved, 0 if none
    pub current_block_num: u64,
    /// difficulty of the block being solved
    pub current_block_difficulty: u64,
    /// version of the block being solved
    pub current_block_version: u32,
    /// number of solutions found by this node
    pub solved_blocks_count: u64,
    /// last block solved by this node, 0 if none
    pub last_solved_block_num: u64,
    /// time of the last solution found by this node
    pub last_solved_time: Option<IxianTime>,
    /// retained blocks nobody solved yet
    pub empty_blocks: u64,
    /// retained blocks already solved
    pub full_blocks: u64,
}

/// Components the miner reads from and submits to
#[derive(Clone)]
pub struct MinerChannels {
    /// pool receiving the solutions
    pub pool: Box<dyn PoolController>,
    /// chain of blocks to solve
    pub block_store: Arc<dyn BlockStore>,
    /// wallet state, read to know whether our public key is registered
    pub wallet_state: Arc<dyn WalletStateStore>,
    /// node status flags
    pub status: Arc<NodeStatus>,
    /// proof of work hash function
    pub hasher: Arc<dyn PowHasher>,
}
