// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_models::Amount;
use ixian_time::IxianTime;
use serde::{Deserialize, Serialize};

/// Pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// fee charged per started size unit of a transaction
    pub transaction_price: Amount,
    /// highest transaction version this node understands
    pub max_transaction_version: u32,
    /// number of blocks a transaction stays valid for
    pub redacted_window_size: u64,
    /// a pending local transaction is rebroadcast after this delay
    pub pending_resend_delay: IxianTime,
    /// peers are asked about a pending local transaction after this delay
    pub pending_inquiry_delay: IxianTime,
    /// a pending local transaction is forgotten after this delay
    pub pending_expiry: IxianTime,
    /// interval of the pruning and pending transaction pass
    pub prune_interval: IxianTime,
    /// transactions of replayed blocks are not archived again
    pub recover_from_file: bool,
    /// re-verify the PoW of transactions read from local storage
    pub full_storage_data_verification: bool,
}
