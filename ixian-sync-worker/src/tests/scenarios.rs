// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ixian_hash::Hash;
use ixian_ledger_exports::{LedgerConfig, WalletStateStore};
use ixian_ledger_worker::WalletState;
use ixian_models::config::MAX_BLOCK_VERSION;
use ixian_models::{Address, Amount, Block};
use ixian_protocol_exports::{MockPeerTransport, PeerId};
use ixian_signature::KeyPair;
use ixian_storage_exports::BlockStore;
use ixian_sync_exports::{BlockVerifyStatus, DltStatus, SyncConfig, SyncState, WalletStateHeader};
use ixian_time::IxianTime;

use super::tools::{permissive_pool, test_config, SyncTestContext};
use crate::start_sync_worker;

fn secs(value: u64) -> IxianTime {
    IxianTime::from_secs(value)
}

#[test]
fn test_out_of_order_blocks_commit_in_one_pass() {
    let context = SyncTestContext::new(105);
    context.append_until(102);
    let engine = context.engine(
        test_config(),
        context.transport(),
        permissive_pool(),
        context.processor(),
        None,
    );
    engine.on_hello_data(context.hello(105, true));
    assert!(engine.is_synchronizing());
    assert!(context.status.is_synchronizing());

    engine.on_block_received(context.block(105));
    engine.update(secs(1000));
    assert_eq!(context.block_store.get_last_block_num(), 102);
    assert_eq!(context.requested(), vec![103, 104]);
    let progress = engine.get_sync_progress();
    assert_eq!(progress.state, SyncState::Syncing);
    assert_eq!(progress.target, 105);
    assert_eq!(progress.pending_blocks, 1);
    assert_eq!(progress.missing_blocks, 2);

    engine.on_block_received(context.block(104));
    engine.update(secs(1001));
    assert_eq!(context.block_store.get_last_block_num(), 102);
    assert_eq!(engine.get_sync_progress().pending_blocks, 2);
    assert!(context.applied().is_empty());

    engine.on_block_received(context.block(103));
    engine.update(secs(1002));
    assert_eq!(context.block_store.get_last_block_num(), 105);
    assert_eq!(context.applied(), vec![103, 104, 105]);

    // the sync completed in the same pass
    assert!(!engine.is_synchronizing());
    assert!(!context.status.is_synchronizing());
    assert!(context.is_resumed());
    let progress = engine.get_sync_progress();
    assert_eq!(progress.state, SyncState::Synced);
    assert_eq!(progress.pending_blocks, 0);
    assert_eq!(progress.missing_blocks, 0);
}

#[test]
fn test_watchdog_rolls_back_to_saved_state() {
    let context = SyncTestContext::new(200);
    context.append_until(149);
    context.wallet_state.save_state(40);
    let mut pool = permissive_pool();
    pool.checkpoint();
    pool.expect_clear().times(1).returning(|| ());
    let engine = context.engine(
        test_config(),
        context.transport(),
        pool,
        context.processor(),
        None,
    );
    engine.on_hello_data(context.hello(200, true));
    engine.on_block_received(context.block(150));

    let start = secs(10_000);
    engine.update(start);
    assert_eq!(context.block_store.get_last_block_num(), 150);
    assert_eq!(context.requested(), (151..=200).collect::<Vec<_>>());
    context.requested.lock().unwrap().clear();

    // still within the stall timeout
    engine.update(start.saturating_add(secs(5)));
    assert_eq!(context.block_store.get_last_block_num(), 150);

    // no block for longer than the timeout
    engine.update(start.saturating_add(secs(1201)));
    assert_eq!(context.block_store.get_last_block_num(), 40);
    let progress = engine.get_sync_progress();
    assert_eq!(progress.wallet_state_confirmed_height, 40);
    assert_eq!(progress.missing_blocks, 160);
    assert_eq!(progress.target, 200);
    assert!(engine.is_synchronizing());
    // requests resume above the restored height
    assert_eq!(context.requested(), (41..=90).collect::<Vec<_>>());
}

#[test]
fn test_wallet_state_mismatch_after_apply_rolls_back() {
    let context = SyncTestContext::new(200);
    context.append_until(149);
    context.wallet_state.save_state(40);
    let mut pool = permissive_pool();
    pool.checkpoint();
    pool.expect_clear().times(1).returning(|| ());
    let engine = context.engine(
        test_config(),
        context.transport(),
        pool,
        context.processor(),
        None,
    );
    engine.on_hello_data(context.hello(200, true));

    let mut block = context.block(150);
    block.wallet_state_checksum = Hash::compute_from(b"another wallet state");
    block.update_checksum();
    engine.on_block_received(block);
    engine.update(secs(10_000));

    // the block was applied, then the chain went back to the saved state
    assert_eq!(context.applied(), vec![150]);
    assert_eq!(context.block_store.get_last_block_num(), 40);
    assert!(context.block_store.get_block(150, false).is_none());
    assert!(context.block_store.get_block(41, false).is_none());
    let progress = engine.get_sync_progress();
    assert_eq!(progress.wallet_state_confirmed_height, 40);
    assert_eq!(progress.pending_blocks, 0);
    assert_eq!(progress.missing_blocks, 160);
    assert!(engine.is_synchronizing());
    assert_eq!(context.requested(), (41..=90).collect::<Vec<_>>());
}

#[test]
fn test_hello_raises_target() {
    let context = SyncTestContext::new(30);
    context.append_until(20);
    let engine = context.engine(
        test_config(),
        context.transport(),
        permissive_pool(),
        context.processor(),
        None,
    );
    engine.on_hello_data(context.hello(25, true));
    engine.update(secs(1000));
    assert_eq!(context.requested(), vec![21, 22, 23, 24, 25]);
    assert_eq!(context.status.highest_network_block(), 25);

    engine.on_hello_data(context.hello(30, true));
    let progress = engine.get_sync_progress();
    assert_eq!(progress.target, 30);
    assert_eq!(progress.missing_blocks, 10);
    assert_eq!(context.status.highest_network_block(), 30);

    // the target never decreases
    engine.on_hello_data(context.hello(28, true));
    assert_eq!(engine.get_sync_progress().target, 30);

    engine.update(secs(1001));
    assert_eq!(
        context.requested(),
        vec![21, 22, 23, 24, 25, 26, 27, 28, 29, 30]
    );
}

#[test]
fn test_invalid_block_requested_again() {
    let context = SyncTestContext::new(103);
    context.append_until(102);
    let mut processor = context.processor();
    processor.checkpoint();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    processor
        .expect_verify_block()
        .returning(move |_, _| match calls_clone.fetch_add(1, Ordering::SeqCst) {
            0 => BlockVerifyStatus::Invalid,
            _ => BlockVerifyStatus::Valid,
        });
    processor
        .expect_verify_block_basic()
        .returning(|_| BlockVerifyStatus::Valid);
    processor
        .expect_verify_block_signatures()
        .returning(|_| true);
    processor
        .expect_verify_signature_freeze_checksum()
        .returning(|_| true);
    processor.expect_apply_accepted_block().returning(|_| true);
    processor.expect_resume_operation().returning(|| ());
    let engine = context.engine(
        test_config(),
        context.transport(),
        permissive_pool(),
        processor,
        None,
    );
    engine.on_hello_data(context.hello(103, true));
    engine.on_block_received(context.block(103));
    engine.update(secs(1000));
    assert_eq!(context.block_store.get_last_block_num(), 102);
    assert_eq!(engine.get_sync_progress().pending_blocks, 0);
    assert_eq!(context.requested(), vec![103]);

    engine.on_block_received(context.block(103));
    engine.update(secs(1001));
    assert_eq!(context.block_store.get_last_block_num(), 103);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!engine.is_synchronizing());
}

#[test]
fn test_unsupported_block_version_halts_progress() {
    let context = SyncTestContext::new(5);
    context.append_until(5);
    let engine = context.engine(
        test_config(),
        context.transport(),
        permissive_pool(),
        context.processor(),
        None,
    );
    let tip = context.block(5);
    let upgraded = Block::new(
        6,
        MAX_BLOCK_VERSION + 1,
        tip.checksum,
        tip.wallet_state_checksum,
        Vec::new(),
        1000,
        secs(180),
    );
    let mut hello = context.hello(5, true);
    hello.block_height = 6;
    engine.on_hello_data(hello);
    engine.on_block_received(upgraded);
    engine.update(secs(1000));

    assert_eq!(context.block_store.get_last_block_num(), 5);
    assert!(context.status.is_network_upgraded());
    assert_eq!(engine.get_sync_progress().pending_blocks, 0);
    assert_eq!(engine.get_dlt_status(secs(1000)), DltStatus::ErrorForkedViaUpgrade);
    assert!(context.applied().is_empty());
}

#[test]
fn test_dlt_status() {
    let context = SyncTestContext::new(1);
    let engine = context.engine(
        test_config(),
        context.transport(),
        permissive_pool(),
        context.processor(),
        None,
    );
    let now = secs(100_000);
    context.status.set_last_block_time(now.saturating_sub(secs(30)));
    assert_eq!(engine.get_dlt_status(now), DltStatus::Active);

    context.status.set_last_block_time(now.saturating_sub(secs(1801)));
    assert_eq!(engine.get_dlt_status(now), DltStatus::ErrorLongTimeNoBlock);

    context.status.set_synchronizing(true);
    assert_eq!(engine.get_dlt_status(now), DltStatus::Synchronizing);

    context.status.set_network_upgraded(true);
    assert_eq!(engine.get_dlt_status(now), DltStatus::ErrorForkedViaUpgrade);
}

#[test]
fn test_restart_from_storage_without_network() {
    let context = SyncTestContext::from_storage(20);
    let mut pool = permissive_pool();
    pool.checkpoint();
    pool.expect_set_applied_flags_from_block()
        .times(20)
        .returning(|_| true);
    let config = SyncConfig {
        no_network_sync: true,
        ..test_config()
    };
    let engine = context.engine(
        config,
        context.transport(),
        pool,
        context.processor(),
        None,
    );
    let mut hello = context.hello(20, false);
    hello.last_block_to_read_from_storage = Some(20);
    engine.on_hello_data(hello);
    assert_eq!(engine.get_sync_progress().wallet_state_confirmed_height, 20);

    engine.update(secs(1000));
    assert_eq!(context.block_store.get_last_block_num(), 20);
    // blocks below the confirmed wallet state are not applied again
    assert!(context.applied().is_empty());
    assert!(context.requested().is_empty());
    assert!(!engine.is_synchronizing());
    assert!(context.is_resumed());
    assert!(context
        .block_store
        .get_block(20, false)
        .map_or(false, |block| block.from_local_storage));
}

#[test]
fn test_sync_waits_for_a_peer() {
    let context = SyncTestContext::from_storage(20);
    let engine = context.engine(
        test_config(),
        context.transport(),
        permissive_pool(),
        context.processor(),
        None,
    );
    let mut hello = context.hello(20, false);
    hello.last_block_to_read_from_storage = Some(20);
    engine.on_hello_data(hello);

    engine.update(secs(1000));
    assert_eq!(context.block_store.get_last_block_num(), 20);
    assert!(engine.is_synchronizing());
    assert!(!context.is_resumed());

    // a peer confirms the height
    engine.on_hello_data(context.hello(20, true));
    engine.update(secs(1001));
    assert!(!engine.is_synchronizing());
    assert!(context.is_resumed());
}

#[test]
fn test_master_node_signs_blocks_near_the_tip() {
    let context = SyncTestContext::new(20);
    context.append_until(18);
    let keypair = KeyPair::generate();
    let signed = Arc::new(Mutex::new(Vec::new()));
    let mut transport = context.transport();
    let signed_clone = signed.clone();
    transport
        .expect_broadcast_new_block_signature()
        .returning(move |block_num, _, signature| {
            signed_clone
                .lock()
                .unwrap()
                .push((block_num, signature.signer));
            true
        });
    let config = SyncConfig {
        master_node: true,
        ..test_config()
    };
    let engine = context.engine(
        config,
        transport,
        permissive_pool(),
        context.processor(),
        Some(keypair.clone()),
    );
    engine.on_hello_data(context.hello(20, true));
    engine.on_block_received(context.block(19));
    engine.on_block_received(context.block(20));
    engine.update(secs(1000));

    assert_eq!(context.block_store.get_last_block_num(), 20);
    let public_key = keypair.get_public_key();
    assert_eq!(
        *signed.lock().unwrap(),
        vec![(19, public_key), (20, public_key)]
    );
    let tip = context.block_store.get_block(20, false).unwrap();
    assert_eq!(tip.signatures.len(), 1);
    assert!(tip.verify_signatures());
}

#[test]
fn test_wallet_state_chunk_sync() {
    let context = SyncTestContext::new(20);
    let source = WalletState::new(LedgerConfig {
        redacted_window_size: 1000,
        max_saved_states: 1,
    });
    for value in 1..=5 {
        let address = Address::from_public_key(&KeyPair::generate().get_public_key());
        source.set_balance(&address, Amount::from_raw(value), false);
    }
    let chunks = source.get_chunks(2, 20);
    assert_eq!(chunks.len(), 3);

    let peer = PeerId::from("peer");
    let chunk_requests = Arc::new(Mutex::new(Vec::new()));
    let mut transport = MockPeerTransport::new();
    let connected = peer.clone();
    transport
        .expect_get_connected_peers()
        .returning(move || vec![connected.clone()]);
    transport
        .expect_sync_wallet_state_from_peer()
        .times(1)
        .returning(|_| true);
    let chunk_requests_clone = chunk_requests.clone();
    transport
        .expect_get_wallet_state_chunk_from_peer()
        .returning(move |_, chunk_num| {
            chunk_requests_clone.lock().unwrap().push(chunk_num);
            true
        });
    transport.expect_broadcast_get_block().returning(|_| true);
    let config = SyncConfig {
        store_full_history: false,
        wallet_state_chunk_split: 2,
        ..test_config()
    };
    let engine = context.engine(
        config,
        transport,
        permissive_pool(),
        context.processor(),
        None,
    );
    engine.on_hello_data(context.hello(20, true));
    engine.update(secs(1000));
    assert_eq!(
        engine.get_sync_progress().state,
        SyncState::WalletStateSyncing
    );

    engine.on_wallet_state_header(WalletStateHeader {
        version: source.version(),
        block_num: 20,
        wallet_count: 5,
    });
    let progress = engine.get_sync_progress();
    assert_eq!(progress.wallet_state_confirmed_height, 20);
    assert_eq!(progress.missing_chunks, 3);

    engine.update(secs(1001));
    assert_eq!(*chunk_requests.lock().unwrap(), vec![0, 1, 2]);

    for index in [2, 0, 1] {
        engine.on_wallet_state_chunk_received(chunks[index].clone());
    }
    // unexpected chunks are ignored
    engine.on_wallet_state_chunk_received(chunks[0].clone());
    engine.update(secs(1002));

    assert_eq!(
        context.wallet_state.checksum(false),
        source.checksum(false)
    );
    assert_eq!(context.wallet_state.wallet_count(), 5);
    let progress = engine.get_sync_progress();
    assert_eq!(progress.missing_chunks, 0);
    assert_eq!(progress.state, SyncState::Syncing);
}

#[test]
fn test_outgoing_wallet_state_refused_while_synchronizing() {
    let context = SyncTestContext::new(10);
    context.append_until(8);
    let mut transport = context.transport();
    transport.expect_send_wallet_state_chunk().never();
    let engine = context.engine(
        test_config(),
        transport,
        permissive_pool(),
        context.processor(),
        None,
    );
    let peer = PeerId::from("peer");
    engine.on_hello_data(context.hello(10, true));
    assert!(engine
        .start_outgoing_wallet_state_sync(&peer, secs(1000))
        .is_none());
    engine.on_request_wallet_chunk(0, &peer, secs(1000));

    engine.on_block_received(context.block(9));
    engine.on_block_received(context.block(10));
    engine.update(secs(1001));
    assert!(!engine.is_synchronizing());
    let header = engine
        .start_outgoing_wallet_state_sync(&peer, secs(1002))
        .unwrap();
    assert_eq!(header.block_num, 10);
    assert_eq!(header.wallet_count, 0);
}

#[test]
fn test_sync_worker_thread() {
    let context = SyncTestContext::new(10);
    context.append_until(8);
    let channels = context.channels(context.transport(), permissive_pool(), context.processor());
    let (mut manager, controller) = start_sync_worker(test_config(), channels, None);

    controller.on_hello_data(context.hello(10, true));
    assert!(controller.is_synchronizing());
    controller.on_block_received(context.block(9));
    controller.on_block_received(context.block(10));

    let deadline = Instant::now() + Duration::from_secs(10);
    while controller.get_sync_progress().state != SyncState::Synced && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    manager.stop();

    assert_eq!(controller.get_sync_progress().state, SyncState::Synced);
    assert_eq!(context.block_store.get_last_block_num(), 10);
    assert_eq!(context.applied(), vec![9, 10]);
}
