// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Ixian DLT node.
//!
//! Runs the transaction pool, the miner and the chain synchronization on in-memory
//! collaborators, without peers, until ctrl-c is pressed.

#![warn(unused_crate_dependencies)]

mod block_processor;
mod settings;
mod transport;

use std::sync::Arc;

use anyhow::Context;
use crossbeam_channel::{bounded, Receiver};
use ixian_hash::Hash;
use ixian_ledger_exports::WalletStateStore;
use ixian_ledger_worker::WalletState;
use ixian_miner_exports::{MinerChannels, MinerManager};
use ixian_miner_worker::start_miner_worker;
use ixian_models::NodeStatus;
use ixian_pool_exports::{PoolChannels, PoolManager};
use ixian_pool_worker::{start_pool_controller, PoolDependencies};
use ixian_pow::Argon2PowHasher;
use ixian_protocol_exports::HelloData;
use ixian_signature::KeyPair;
use ixian_storage_exports::{BlockStore, InMemoryBlockStore, InMemoryTransactionStorage};
use ixian_sync_exports::{SyncChannels, SyncController, SyncManager};
use ixian_sync_worker::start_sync_worker;
use tokio::sync::broadcast;
use tracing::{info, Level};

use crate::block_processor::StandaloneBlockProcessor;
use crate::settings::SETTINGS;
use crate::transport::NoPeerTransport;

const POOL_EVENT_CHANNEL_SIZE: usize = 5000;

fn level_from_setting(level: usize) -> Level {
    match level {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Announce of the local chain, used to start the sync from local storage
fn local_hello(block_store: &dyn BlockStore, wallet_state: &dyn WalletStateStore) -> HelloData {
    let last = block_store.get_last_block();
    HelloData {
        block_height: last.as_ref().map_or(0, |block| block.block_num),
        block_checksum: last.as_ref().map_or(Hash::ZERO, |block| block.checksum),
        block_version: last.as_ref().map_or(0, |block| block.version),
        wallet_state_checksum: last
            .as_ref()
            .map_or_else(|| wallet_state.checksum(false), |block| block.wallet_state_checksum),
        consensus: 0,
        last_block_to_read_from_storage: Some(block_store.get_last_storage_block_num()),
        from_network: false,
    }
}

struct Node {
    pool_manager: Box<dyn PoolManager>,
    miner_manager: Box<dyn MinerManager>,
    sync_manager: Box<dyn SyncManager>,
}

fn launch() -> Node {
    let keypair = KeyPair::generate();
    info!("node public key: {}", keypair.get_public_key());

    let status = Arc::new(NodeStatus::new());
    let block_store = Arc::new(InMemoryBlockStore::new());
    let wallet_state = Arc::new(WalletState::new(SETTINGS.ledger_config()));
    let transport = Arc::new(NoPeerTransport);
    let hasher = Arc::new(Argon2PowHasher);

    let (pool_manager, pool_controller) = start_pool_controller(
        SETTINGS.pool_config(),
        PoolDependencies {
            block_store: block_store.clone(),
            wallet_state: wallet_state.clone(),
            storage: Arc::new(InMemoryTransactionStorage::new()),
            transport: transport.clone(),
            status: status.clone(),
            hasher: hasher.clone(),
        },
        PoolChannels {
            transaction_sender: broadcast::channel(POOL_EVENT_CHANNEL_SIZE).0,
            applied_sender: broadcast::channel(POOL_EVENT_CHANNEL_SIZE).0,
        },
    );

    let (miner_manager, _miner_controller) = start_miner_worker(
        SETTINGS.miner_config(),
        MinerChannels {
            pool: pool_controller.clone(),
            block_store: block_store.clone(),
            wallet_state: wallet_state.clone(),
            status: status.clone(),
            hasher,
        },
        keypair.clone(),
    );

    let block_processor = Arc::new(StandaloneBlockProcessor::new(
        block_store.clone(),
        wallet_state.clone(),
        pool_controller.clone(),
        status.clone(),
    ));
    let (sync_manager, sync_controller) = start_sync_worker(
        SETTINGS.sync_config(),
        SyncChannels {
            block_store: block_store.clone(),
            wallet_state: wallet_state.clone(),
            pool: pool_controller,
            transport,
            status,
            block_processor,
        },
        SETTINGS.sync.master_node.then_some(keypair),
    );

    sync_controller.on_hello_data(local_hello(block_store.as_ref(), wallet_state.as_ref()));

    Node {
        pool_manager,
        miner_manager,
        sync_manager,
    }
}

fn stop(node: Node) {
    let Node {
        mut pool_manager,
        mut miner_manager,
        mut sync_manager,
    } = node;
    sync_manager.stop();
    miner_manager.stop();
    pool_manager.stop();
}

fn wait_for_interrupt() -> anyhow::Result<Receiver<()>> {
    let (sender, receiver) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = sender.try_send(());
    })
    .context("could not set the ctrl-c handler")?;
    Ok(receiver)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level_from_setting(SETTINGS.logging.level))
        .init();

    let interrupt = wait_for_interrupt()?;
    let node = launch();
    info!("node started");

    interrupt
        .recv()
        .context("the ctrl-c handler was dropped")?;
    info!("interrupt signal received");

    stop(node);
    info!("node stopped");
    Ok(())
}
