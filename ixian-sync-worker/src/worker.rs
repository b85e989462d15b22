// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use ixian_time::IxianTime;
use tracing::{info, warn};

use crate::engine::ChainSyncEngine;

/// Drives the sync engine until stopped
pub(crate) struct SyncWorker {
    engine: Arc<ChainSyncEngine>,
    stop_receiver: Receiver<()>,
}

impl SyncWorker {
    pub fn new(engine: Arc<ChainSyncEngine>, stop_receiver: Receiver<()>) -> Self {
        SyncWorker {
            engine,
            stop_receiver,
        }
    }

    /// Wait until the deadline or a stop signal.
    /// Returns false if the worker should stop.
    fn interruptible_wait_until(&self, deadline: Instant) -> bool {
        match self.stop_receiver.recv_deadline(deadline) {
            // message received => quit main loop
            Ok(()) => false,
            // timeout => continue main loop
            Err(RecvTimeoutError::Timeout) => true,
            // channel disconnected (sender dropped) => quit main loop
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn run(self) {
        loop {
            let wait = match IxianTime::now() {
                Ok(now) => self.engine.update(now),
                Err(err) => {
                    warn!("sync worker could not read the clock: {}", err);
                    Duration::from_secs(1)
                }
            };
            if !self.interruptible_wait_until(Instant::now() + wait) {
                break;
            }
        }
        info!("sync worker finished");
    }
}
