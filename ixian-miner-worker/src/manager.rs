// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::thread::JoinHandle;

use ixian_miner_exports::MinerManager;
use tracing::{info, warn};

/// Allows stopping the mining threads
pub struct MinerManagerImpl {
    /// dropped to signal every mining thread
    pub(crate) stop_sender: Option<crossbeam_channel::Sender<()>>,
    /// join handles of the mining threads
    pub(crate) threads: Vec<JoinHandle<()>>,
}

impl MinerManager for MinerManagerImpl {
    fn stop(&mut self) {
        info!("stopping miner...");
        std::mem::drop(self.stop_sender.take());
        for join_handle in self.threads.drain(..) {
            if let Err(err) = join_handle.join() {
                warn!("miner thread panicked: {:?}", err);
            }
        }
        info!("miner stopped");
    }
}
