// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::{BlockSearchMode, MinerConfig};
use ixian_models::config::{MIN_TRANSACTION_CHAIN_HEIGHT, REDACTED_WINDOW_SIZE};
use ixian_time::IxianTime;

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thread_count: 1,
            search_mode: BlockSearchMode::RandomLowestDifficulty,
            stats_interval: IxianTime::from_secs(5),
            block_processor_poll_interval: IxianTime::from_secs(1),
            redacted_window_size: REDACTED_WINDOW_SIZE,
            min_chain_height: MIN_TRANSACTION_CHAIN_HEIGHT,
        }
    }
}
