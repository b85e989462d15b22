// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::PoolConfig;
use ixian_models::config::{MAX_TRANSACTION_VERSION, REDACTED_WINDOW_SIZE};
use ixian_models::Amount;
use ixian_time::IxianTime;

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            transaction_price: Amount::from_raw(5_000),
            max_transaction_version: MAX_TRANSACTION_VERSION,
            redacted_window_size: REDACTED_WINDOW_SIZE,
            pending_resend_delay: IxianTime::from_secs(40),
            pending_inquiry_delay: IxianTime::from_secs(20),
            pending_expiry: IxianTime::from_secs(3600),
            prune_interval: IxianTime::from_millis(500),
            recover_from_file: false,
            full_storage_data_verification: false,
        }
    }
}
