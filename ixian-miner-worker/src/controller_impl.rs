// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Miner controller implementation

use std::sync::Arc;

use ixian_miner_exports::{BlockSearchMode, MinerController, MinerStats};
use ixian_models::{Address, Block};
use tracing::warn;

use crate::mining::MinerCore;

/// Controller shared by the components querying the miner
#[derive(Clone)]
pub struct MinerControllerImpl {
    pub(crate) core: Arc<MinerCore>,
}

impl MinerController for MinerControllerImpl {
    fn get_stats(&self) -> MinerStats {
        self.core.stats()
    }

    fn set_paused(&self, paused: bool) {
        self.core.set_paused(paused);
    }

    fn force_search_for_block(&self) {
        self.core.force_search_for_block();
    }

    fn check_active_block_solved(&self) {
        self.core.check_active_block_solved();
    }

    fn submit_mining_solution(&self, nonce: &str, block_num: u64) -> bool {
        match self.core.send_solution(block_num, nonce) {
            Ok(()) => true,
            Err(err) => {
                warn!("mining solution for block #{} not submitted: {}", block_num, err);
                false
            }
        }
    }

    fn verify_mining_solution(
        &self,
        nonce: &str,
        block_num: u64,
        solver: &Address,
        difficulty: u64,
    ) -> bool {
        self.core
            .verify_solution(nonce, block_num, solver, difficulty)
    }

    fn get_mining_block_candidate(&self, search_mode: BlockSearchMode) -> Option<Block> {
        self.core.get_mining_block_candidate(search_mode)
    }

    fn clone_box(&self) -> Box<dyn MinerController> {
        Box::new(self.clone())
    }
}
