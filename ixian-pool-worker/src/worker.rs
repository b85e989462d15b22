// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use ixian_time::IxianTime;
use tracing::{info, warn};

use crate::pool::TransactionPool;

/// Periodically prunes the pool and follows up on the pending local transactions
pub(crate) struct PoolWorker {
    pool: Arc<TransactionPool>,
    stop_receiver: Receiver<()>,
}

impl PoolWorker {
    pub fn new(pool: Arc<TransactionPool>, stop_receiver: Receiver<()>) -> Self {
        PoolWorker {
            pool,
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
        let interval = self.pool.rules.config.prune_interval.to_duration();
        loop {
            if !self.interruptible_wait_until(Instant::now() + interval) {
                break;
            }
            self.pool.prune();
            match IxianTime::now() {
                Ok(now) => self.pool.process_pending_transactions(now),
                Err(err) => warn!("pool worker could not read the clock: {}", err),
            }
        }
        info!("pool worker finished");
    }
}
