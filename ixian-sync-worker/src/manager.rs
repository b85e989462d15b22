// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::thread::JoinHandle;

use ixian_sync_exports::SyncManager;
use tracing::{info, warn};

/// Allows stopping the sync worker
pub struct SyncManagerImpl {
    /// stop sender and join handle of the worker thread
    pub(crate) worker: Option<(crossbeam_channel::Sender<()>, JoinHandle<()>)>,
}

impl SyncManager for SyncManagerImpl {
    fn stop(&mut self) {
        info!("stopping sync worker...");
        if let Some((stop_sender, join_handle)) = self.worker.take() {
            std::mem::drop(stop_sender);
            if let Err(err) = join_handle.join() {
                warn!("sync worker panicked: {:?}", err);
            }
        }
        info!("sync worker stopped");
    }
}
