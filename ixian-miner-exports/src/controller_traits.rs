// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This module exports generic traits representing interfaces for interacting
//! with the miner threads.

use ixian_models::{Address, Block};

use crate::{BlockSearchMode, MinerStats};

/// interface that communicates with the miner threads
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait MinerController: Send + Sync {
    /// Current statistics
    fn get_stats(&self) -> MinerStats;

    /// Pause or resume the mining threads
    fn set_paused(&self, paused: bool);

    /// Drop the active block so that the next iteration selects a new one
    fn force_search_for_block(&self);

    /// Drop the active block if it was solved or removed meanwhile
    fn check_active_block_solved(&self);

    /// Submit a solution found outside of this node's threads.
    /// Returns true if the pool accepted it.
    fn submit_mining_solution(&self, nonce: &str, block_num: u64) -> bool;

    /// Returns true if `nonce` solves block `block_num` for `solver` at `difficulty`
    fn verify_mining_solution(
        &self,
        nonce: &str,
        block_num: u64,
        solver: &Address,
        difficulty: u64,
    ) -> bool;

    /// Next block a miner using `search_mode` would work on
    fn get_mining_block_candidate(&self, search_mode: BlockSearchMode) -> Option<Block>;

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn MinerController>`.
    fn clone_box(&self) -> Box<dyn MinerController>;
}

/// Allow cloning `Box<dyn MinerController>`
/// Uses `MinerController::clone_box` internally
impl Clone for Box<dyn MinerController> {
    fn clone(&self) -> Box<dyn MinerController> {
        self.clone_box()
    }
}

/// Miner manager used to stop the mining threads
pub trait MinerManager {
    /// Stop the mining threads
    /// Note that we do not take self by value to consume it
    /// because it is not allowed to move out of `Box<dyn MinerManager>`
    fn stop(&mut self);
}
