// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::SyncConfig;
use ixian_models::config::REDACTED_WINDOW_SIZE;
use ixian_time::IxianTime;

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_block_requests: 50,
            block_request_timeout: IxianTime::from_secs(10),
            watchdog_timeout: IxianTime::from_secs(1200),
            chunk_request_cooldown: IxianTime::from_secs(150),
            wallet_state_chunk_split: 10_000,
            redacted_window_size: REDACTED_WINDOW_SIZE,
            store_full_history: true,
            recover_from_file: false,
            full_storage_data_verification: false,
            no_network_sync: false,
            save_wallet_state_every_block: 1000,
            master_node: false,
            long_time_no_block: IxianTime::from_secs(1800),
        }
    }
}
