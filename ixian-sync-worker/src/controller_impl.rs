// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Sync controller implementation

use std::sync::Arc;

use ixian_models::{Block, WalletStateChunk};
use ixian_protocol_exports::{HelloData, PeerId};
use ixian_sync_exports::{DltStatus, SyncController, SyncProgress, WalletStateHeader};
use ixian_time::IxianTime;
use tracing::warn;

use crate::engine::ChainSyncEngine;

/// Controller used by the network handlers and the API
#[derive(Clone)]
pub struct SyncControllerImpl {
    pub(crate) engine: Arc<ChainSyncEngine>,
}

impl SyncControllerImpl {
    fn now() -> Option<IxianTime> {
        match IxianTime::now() {
            Ok(now) => Some(now),
            Err(err) => {
                warn!("sync controller could not read the clock: {}", err);
                None
            }
        }
    }
}

impl SyncController for SyncControllerImpl {
    fn on_hello_data(&self, hello: HelloData) {
        self.engine.on_hello_data(hello);
    }

    fn on_block_received(&self, block: Block) {
        self.engine.on_block_received(block);
    }

    fn on_wallet_state_header(&self, header: WalletStateHeader) {
        self.engine.on_wallet_state_header(header);
    }

    fn on_wallet_state_chunk_received(&self, chunk: WalletStateChunk) {
        self.engine.on_wallet_state_chunk_received(chunk);
    }

    fn start_outgoing_wallet_state_sync(&self, peer: &PeerId) -> Option<WalletStateHeader> {
        let now = Self::now()?;
        self.engine.start_outgoing_wallet_state_sync(peer, now)
    }

    fn on_request_wallet_chunk(&self, chunk_num: u64, peer: &PeerId) {
        if let Some(now) = Self::now() {
            self.engine.on_request_wallet_chunk(chunk_num, peer, now);
        }
    }

    fn start_sync(&self) {
        self.engine.start_sync();
    }

    fn is_synchronizing(&self) -> bool {
        self.engine.is_synchronizing()
    }

    fn get_sync_progress(&self) -> SyncProgress {
        self.engine.get_sync_progress()
    }

    fn get_dlt_status(&self) -> DltStatus {
        let now = Self::now().unwrap_or_default();
        self.engine.get_dlt_status(now)
    }

    fn clone_box(&self) -> Box<dyn SyncController> {
        Box::new(self.clone())
    }
}
