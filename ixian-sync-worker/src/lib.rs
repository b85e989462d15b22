// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Sync worker: catches the local chain up with the network, downloads the
//! wallet state when the node does not keep the full history, and serves our
//! own wallet state to syncing peers.

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod controller_impl;
mod engine;
mod manager;
mod wallet_state_service;
mod worker;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use ixian_signature::KeyPair;
use ixian_sync_exports::{SyncChannels, SyncConfig, SyncController, SyncManager};

pub use controller_impl::SyncControllerImpl;
pub use manager::SyncManagerImpl;

use crate::engine::ChainSyncEngine;
use crate::worker::SyncWorker;

/// Start the sync worker thread.
///
/// `keypair` signs the synchronized blocks close to the network tip when the node is a master node.
/// Returns the manager stopping the thread and the controller fed by the network handlers.
pub fn start_sync_worker(
    config: SyncConfig,
    channels: SyncChannels,
    keypair: Option<KeyPair>,
) -> (Box<dyn SyncManager>, Box<dyn SyncController>) {
    let engine = Arc::new(ChainSyncEngine::new(config, channels, keypair));

    let (stop_sender, stop_receiver) = crossbeam_channel::bounded(1);
    let worker = SyncWorker::new(engine.clone(), stop_receiver);
    let join_handle = std::thread::Builder::new()
        .name("sync worker".into())
        .spawn(move || worker.run())
        .expect("could not spawn sync worker thread");

    let manager = SyncManagerImpl {
        worker: Some((stop_sender, join_handle)),
    };
    let controller = SyncControllerImpl { engine };
    (Box::new(manager), Box::new(controller))
}
