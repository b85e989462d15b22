// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use ixian_pow::MinerWorkerContext;
use tracing::info;

use crate::mining::MinerCore;

/// Delay between two iterations of a paused thread
const PAUSE_DELAY: Duration = Duration::from_millis(500);
/// Delay before the primary thread searches again after finding no open block
const SEARCH_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Delay between two checks of a secondary thread waiting for an active block
const ARM_DELAY: Duration = Duration::from_millis(10);

/// A mining thread.
///
/// Only the primary thread selects blocks and computes the hash rate, the
/// secondary threads hash nonces for the block it armed.
pub(crate) struct MinerThread {
    core: Arc<MinerCore>,
    stop_receiver: Receiver<()>,
    primary: bool,
    context: MinerWorkerContext,
}

impl MinerThread {
    pub fn new(core: Arc<MinerCore>, stop_receiver: Receiver<()>, primary: bool) -> Self {
        MinerThread {
            core,
            stop_receiver,
            primary,
            context: MinerWorkerContext::new(),
        }
    }

    /// Wait until the deadline or a stop signal.
    /// Returns false if the thread should stop.
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

    fn should_stop(&self) -> bool {
        !matches!(self.stop_receiver.try_recv(), Err(TryRecvError::Empty))
    }

    /// Polls the node until it is operating. Returns false if the thread should stop.
    fn wait_for_node(&self) -> bool {
        let poll_interval = self.core.config.block_processor_poll_interval.to_duration();
        loop {
            if !self.interruptible_wait_until(Instant::now() + poll_interval) {
                return false;
            }
            if self.core.is_ready() {
                return true;
            }
        }
    }

    pub fn run(mut self) {
        if self.wait_for_node() {
            self.mine();
        }
        info!("miner thread finished");
    }

    fn mine(&mut self) {
        while !self.should_stop() {
            if self.core.is_paused() {
                if self.primary {
                    self.core.reset_hash_rate();
                }
                if !self.interruptible_wait_until(Instant::now() + PAUSE_DELAY) {
                    break;
                }
                continue;
            }
            match self.core.active_block() {
                Some(active) => self.core.compute_once(&active, &mut self.context),
                None if self.primary => {
                    if !self.core.search_for_block()
                        && !self.interruptible_wait_until(Instant::now() + SEARCH_RETRY_DELAY)
                    {
                        break;
                    }
                }
                None => {
                    if !self.interruptible_wait_until(Instant::now() + ARM_DELAY) {
                        break;
                    }
                }
            }
            if self.primary {
                self.core.check_active_block_solved();
                self.core.update_hash_rate();
            }
        }
    }
}
