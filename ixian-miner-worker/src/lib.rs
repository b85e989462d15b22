// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Miner worker: one primary thread selecting the block to solve and
//! secondary threads hashing nonces for it.

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod controller_impl;
mod mining;
mod manager;
mod selection;
mod worker;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use ixian_miner_exports::{MinerChannels, MinerConfig, MinerController, MinerManager};
use ixian_signature::KeyPair;
use tracing::{info, warn};

pub use controller_impl::MinerControllerImpl;
pub use manager::MinerManagerImpl;

use crate::mining::MinerCore;
use crate::worker::MinerThread;

/// Number of mining threads allowed on a machine with `vcpus` logical processors.
///
/// Half of the processors minus one are left to the rest of the node, with a
/// minimum of one thread.
pub fn mining_thread_count(requested: usize, vcpus: usize) -> usize {
    if vcpus <= 1 {
        info!("single logical processor detected, forcing one mining thread maximum");
        return 1;
    }
    let max_threads = (vcpus / 2).saturating_sub(1).max(1);
    if requested > max_threads {
        warn!(
            "requested mining thread count ({}) exceeds the maximum allowed ({})",
            requested, max_threads
        );
        return max_threads;
    }
    requested.max(1)
}

/// Start the mining threads.
///
/// Solutions are signed with `keypair`. When mining is disabled no thread is
/// started but the controller still serves candidate and verification queries.
pub fn start_miner_worker(
    config: MinerConfig,
    channels: MinerChannels,
    keypair: KeyPair,
) -> (Box<dyn MinerManager>, Box<dyn MinerController>) {
    let vcpus = std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1);
    let thread_count = if config.enabled {
        mining_thread_count(config.thread_count, vcpus)
    } else {
        0
    };
    let core = Arc::new(MinerCore::new(config, channels, keypair, thread_count));

    let (stop_sender, stop_receiver) = crossbeam_channel::bounded::<()>(1);
    let mut threads = Vec::with_capacity(thread_count);
    if thread_count == 0 {
        info!("miner disabled");
    } else {
        info!(
            "starting miner with {} threads on {} logical processors",
            thread_count, vcpus
        );
        let primary = MinerThread::new(core.clone(), stop_receiver.clone(), true);
        threads.push(
            std::thread::Builder::new()
                .name("miner main".into())
                .spawn(move || primary.run())
                .expect("could not spawn miner main thread"),
        );
        for index in 0..thread_count - 1 {
            let secondary = MinerThread::new(core.clone(), stop_receiver.clone(), false);
            threads.push(
                std::thread::Builder::new()
                    .name(format!("miner worker #{}", index))
                    .spawn(move || secondary.run())
                    .expect("could not spawn miner worker thread"),
            );
        }
    }

    let manager = MinerManagerImpl {
        stop_sender: Some(stop_sender),
        threads,
    };
    let controller = MinerControllerImpl { core };
    (Box::new(manager), Box::new(controller))
}
