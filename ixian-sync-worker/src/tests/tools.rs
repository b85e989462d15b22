// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ixian_hash::Hash;
use ixian_ledger_exports::{LedgerConfig, WalletStateStore};
use ixian_ledger_worker::WalletState;
use ixian_models::{Block, NodeStatus};
use ixian_pool_exports::MockPoolController;
use ixian_protocol_exports::{HelloData, MockPeerTransport};
use ixian_signature::KeyPair;
use ixian_storage_exports::{BlockStore, InMemoryBlockStore};
use ixian_sync_exports::{BlockVerifyStatus, MockBlockProcessor, SyncChannels, SyncConfig};
use ixian_time::IxianTime;

use crate::engine::ChainSyncEngine;

/// A chain of version 3 blocks and the collaborators of the sync engine
pub struct SyncTestContext {
    pub block_store: Arc<InMemoryBlockStore>,
    pub wallet_state: Arc<WalletState>,
    pub status: Arc<NodeStatus>,
    /// every block of the network chain, `blocks[n - 1]` is block #n
    pub blocks: Vec<Block>,
    /// heights passed to `broadcast_get_block`
    pub requested: Arc<Mutex<Vec<u64>>>,
    /// heights passed to `apply_accepted_block`
    pub applied: Arc<Mutex<Vec<u64>>>,
    pub resumed: Arc<AtomicBool>,
}

impl SyncTestContext {
    /// Network chain of `len` blocks, the local chain is empty
    pub fn new(len: u64) -> Self {
        Self::with_store(len, |_| InMemoryBlockStore::new())
    }

    /// Network chain of `len` blocks, all of them archived in local storage
    pub fn from_storage(len: u64) -> Self {
        Self::with_store(len, |blocks| InMemoryBlockStore::with_archive(blocks.to_vec()))
    }

    fn with_store<F>(len: u64, store: F) -> Self
    where
        F: FnOnce(&[Block]) -> InMemoryBlockStore,
    {
        let wallet_state = Arc::new(WalletState::new(LedgerConfig {
            redacted_window_size: 1000,
            max_saved_states: 10,
        }));
        let blocks = chain(len, wallet_state.checksum(false));
        SyncTestContext {
            block_store: Arc::new(store(&blocks)),
            wallet_state,
            status: Arc::new(NodeStatus::new()),
            blocks,
            requested: Arc::new(Mutex::new(Vec::new())),
            applied: Arc::new(Mutex::new(Vec::new())),
            resumed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn block(&self, block_num: u64) -> Block {
        self.blocks[block_num as usize - 1].clone()
    }

    /// Appends blocks up to `block_num` to the local chain
    pub fn append_until(&self, block_num: u64) {
        for num in self.block_store.get_last_block_num() + 1..=block_num {
            self.block_store.append_block(self.block(num), true).unwrap();
        }
    }

    /// Handshake announcing block `block_num` of the network chain
    pub fn hello(&self, block_num: u64, from_network: bool) -> HelloData {
        let block = self.block(block_num);
        HelloData {
            block_height: block.block_num,
            block_checksum: block.checksum,
            block_version: block.version,
            wallet_state_checksum: block.wallet_state_checksum,
            consensus: 1,
            last_block_to_read_from_storage: None,
            from_network,
        }
    }

    pub fn requested(&self) -> Vec<u64> {
        self.requested.lock().unwrap().clone()
    }

    pub fn applied(&self) -> Vec<u64> {
        self.applied.lock().unwrap().clone()
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed.load(Ordering::SeqCst)
    }

    /// Transport recording block requests and accepting everything else
    pub fn transport(&self) -> MockPeerTransport {
        let mut transport = MockPeerTransport::new();
        let requested = self.requested.clone();
        transport
            .expect_broadcast_get_block()
            .returning(move |block_num| {
                requested.lock().unwrap().push(block_num);
                true
            });
        transport
            .expect_broadcast_get_transaction()
            .returning(|_, _| true);
        transport
            .expect_request_unapplied_transactions()
            .returning(|| true);
        transport.expect_get_connected_peers().returning(Vec::new);
        transport
    }

    /// Processor accepting every block, recording the applied ones
    pub fn processor(&self) -> MockBlockProcessor {
        let mut processor = MockBlockProcessor::new();
        processor
            .expect_verify_block()
            .returning(|_, _| BlockVerifyStatus::Valid);
        processor
            .expect_verify_block_basic()
            .returning(|_| BlockVerifyStatus::Valid);
        processor
            .expect_verify_block_signatures()
            .returning(|_| true);
        processor
            .expect_verify_signature_freeze_checksum()
            .returning(|_| true);
        let applied = self.applied.clone();
        processor
            .expect_apply_accepted_block()
            .returning(move |block| {
                applied.lock().unwrap().push(block.block_num);
                true
            });
        let resumed = self.resumed.clone();
        processor
            .expect_resume_operation()
            .returning(move || resumed.store(true, Ordering::SeqCst));
        processor
    }

    pub fn channels(
        &self,
        transport: MockPeerTransport,
        pool: MockPoolController,
        processor: MockBlockProcessor,
    ) -> SyncChannels {
        SyncChannels {
            block_store: self.block_store.clone(),
            wallet_state: self.wallet_state.clone(),
            pool: Box::new(pool),
            transport: Arc::new(transport),
            status: self.status.clone(),
            block_processor: Arc::new(processor),
        }
    }

    pub fn engine(
        &self,
        config: SyncConfig,
        transport: MockPeerTransport,
        pool: MockPoolController,
        processor: MockBlockProcessor,
        keypair: Option<KeyPair>,
    ) -> ChainSyncEngine {
        ChainSyncEngine::new(config, self.channels(transport, pool, processor), keypair)
    }
}

/// Chained blocks #1 to #`len`, all declaring `wallet_state_checksum`
pub fn chain(len: u64, wallet_state_checksum: Hash) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for block_num in 1..=len {
        let last_checksum = blocks.last().map_or(Hash::ZERO, |block| block.checksum);
        blocks.push(Block::new(
            block_num,
            3,
            last_checksum,
            wallet_state_checksum,
            Vec::new(),
            1000,
            IxianTime::from_secs(block_num * 30),
        ));
    }
    blocks
}

/// Pool accepting every call the sync engine makes
pub fn permissive_pool() -> MockPoolController {
    let mut pool = MockPoolController::new();
    pool.expect_clear().returning(|| ());
    pool.expect_set_applied_flags_from_block()
        .returning(|_| true);
    pool.expect_get_transaction().returning(|_, _, _| None);
    pool.expect_add_transaction().returning(|_, _, _| true);
    pool
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        redacted_window_size: 1000,
        ..SyncConfig::default()
    }
}
