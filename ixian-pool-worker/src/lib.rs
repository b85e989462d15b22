// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Transaction pool worker: validates incoming transactions, applies the
//! transactions of committed blocks to the wallet state and prunes what can
//! no longer be included.

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod apply;
mod controller_impl;
mod ledger_rules;
mod manager;
mod pool;
mod worker;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use ixian_ledger_exports::WalletStateStore;
use ixian_models::NodeStatus;
use ixian_pool_exports::{PoolChannels, PoolConfig, PoolController, PoolManager};
use ixian_pow::PowHasher;
use ixian_protocol_exports::PeerTransport;
use ixian_storage_exports::{BlockStore, TransactionStorage};

pub use controller_impl::PoolControllerImpl;
pub use manager::PoolManagerImpl;

use crate::ledger_rules::LedgerRules;
use crate::pool::TransactionPool;
use crate::worker::PoolWorker;

/// Collaborators of the pool
pub struct PoolDependencies {
    /// chain of blocks
    pub block_store: Arc<dyn BlockStore>,
    /// wallet state the transactions are applied to
    pub wallet_state: Arc<dyn WalletStateStore>,
    /// archive of the applied transactions
    pub storage: Arc<dyn TransactionStorage>,
    /// peers to relay transactions to
    pub transport: Arc<dyn PeerTransport>,
    /// node status flags
    pub status: Arc<NodeStatus>,
    /// hasher used to check PoW solutions
    pub hasher: Arc<dyn PowHasher>,
}

/// Start the pool worker thread.
///
/// Returns the manager stopping the thread and the controller used to interact with the pool.
pub fn start_pool_controller(
    config: PoolConfig,
    dependencies: PoolDependencies,
    channels: PoolChannels,
) -> (Box<dyn PoolManager>, Box<dyn PoolController>) {
    let PoolDependencies {
        block_store,
        wallet_state,
        storage,
        transport,
        status,
        hasher,
    } = dependencies;
    let rules = LedgerRules {
        config,
        block_store,
        wallet_state,
        status,
        hasher,
    };
    let pool = Arc::new(TransactionPool::new(rules, storage, transport, channels));

    let (stop_sender, stop_receiver) = crossbeam_channel::bounded(1);
    let worker = PoolWorker::new(pool.clone(), stop_receiver);
    let join_handle = std::thread::Builder::new()
        .name("pool worker".into())
        .spawn(move || worker.run())
        .expect("could not spawn pool worker thread");

    let manager = PoolManagerImpl {
        worker: Some((stop_sender, join_handle)),
    };
    let controller = PoolControllerImpl { pool };
    (Box::new(manager), Box::new(controller))
}
