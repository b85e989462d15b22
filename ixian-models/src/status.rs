// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_time::IxianTime;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Node wide flags shared by the pool, the miner and the sync engine.
///
/// Each flag has a single writer: the sync engine owns `synchronizing`,
/// `highest_network_block` and `network_upgraded`, the block processor owns
/// `operating` and `last_block_time`.
#[derive(Debug, Default)]
pub struct NodeStatus {
    synchronizing: AtomicBool,
    highest_network_block: AtomicU64,
    network_upgraded: AtomicBool,
    operating: AtomicBool,
    last_block_time: AtomicU64,
}

impl NodeStatus {
    /// Fresh status: not syncing, not operating
    pub fn new() -> Self {
        Self::default()
    }

    /// The local ledger is not authoritative while synchronizing
    pub fn is_synchronizing(&self) -> bool {
        self.synchronizing.load(Ordering::SeqCst)
    }

    /// set by the sync engine
    pub fn set_synchronizing(&self, value: bool) {
        self.synchronizing.store(value, Ordering::SeqCst);
    }

    /// Highest height announced by a peer
    pub fn highest_network_block(&self) -> u64 {
        self.highest_network_block.load(Ordering::SeqCst)
    }

    /// Raises the highest announced height, never lowers it
    pub fn raise_highest_network_block(&self, height: u64) {
        self.highest_network_block.fetch_max(height, Ordering::SeqCst);
    }

    /// A block with a version above `MAX_BLOCK_VERSION` was received
    pub fn is_network_upgraded(&self) -> bool {
        self.network_upgraded.load(Ordering::SeqCst)
    }

    /// set by the sync engine
    pub fn set_network_upgraded(&self, value: bool) {
        self.network_upgraded.store(value, Ordering::SeqCst);
    }

    /// The block processor accepts new blocks
    pub fn is_operating(&self) -> bool {
        self.operating.load(Ordering::SeqCst)
    }

    /// set by the block processor
    pub fn set_operating(&self, value: bool) {
        self.operating.store(value, Ordering::SeqCst);
    }

    /// Time the last block was appended
    pub fn last_block_time(&self) -> IxianTime {
        IxianTime::from_millis(self.last_block_time.load(Ordering::SeqCst))
    }

    /// set by the block processor
    pub fn set_last_block_time(&self, time: IxianTime) {
        self.last_block_time.store(time.to_millis(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_network_block_is_monotonic() {
        let status = NodeStatus::new();
        status.raise_highest_network_block(10);
        status.raise_highest_network_block(4);
        assert_eq!(status.highest_network_block(), 10);
    }
}
