// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::thread::JoinHandle;

use ixian_pool_exports::PoolManager;
use tracing::{info, warn};

/// Allows stopping the pool worker
pub struct PoolManagerImpl {
    /// stop sender and join handle of the worker thread
    pub(crate) worker: Option<(crossbeam_channel::Sender<()>, JoinHandle<()>)>,
}

impl PoolManager for PoolManagerImpl {
    fn stop(&mut self) {
        info!("stopping pool worker...");
        if let Some((stop_sender, join_handle)) = self.worker.take() {
            std::mem::drop(stop_sender);
            if let Err(err) = join_handle.join() {
                warn!("pool worker panicked: {:?}", err);
            }
        }
        info!("pool worker stopped");
    }
}
