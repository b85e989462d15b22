// Copyright (c) 2022 MASSA LABS <info@massa.net>

use serde::{Deserialize, Serialize};

/// Wallet state configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// number of recent blocks kept by the node
    pub redacted_window_size: u64,
    /// number of saved wallet states kept for rollbacks
    pub max_saved_states: usize,
}
