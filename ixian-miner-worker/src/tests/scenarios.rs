// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::mpsc;
use std::time::Duration;

use assert_matches::assert_matches;
use ixian_ledger_exports::WalletStateStore;
use ixian_miner_exports::{BlockSearchMode, MinerConfig};
use ixian_models::config::INFINIMINE;
use ixian_models::{Amount, TransactionSender, TransactionType};
use ixian_pool_exports::MockPoolController;
use ixian_pow::encode_nonce;
use ixian_storage_exports::BlockStore;

use super::tools::{test_config, MinerTestContext};
use crate::{mining_thread_count, start_miner_worker};

#[test]
fn test_mining_thread_count() {
    assert_eq!(mining_thread_count(4, 1), 1);
    assert_eq!(mining_thread_count(4, 2), 1);
    assert_eq!(mining_thread_count(4, 3), 1);
    assert_eq!(mining_thread_count(8, 8), 3);
    assert_eq!(mining_thread_count(2, 16), 2);
    assert_eq!(mining_thread_count(0, 16), 1);
}

#[test]
fn test_solution_submitted_to_pool() {
    let context = MinerTestContext::new(12, true);
    context.status.set_operating(true);
    let (solution_sender, solution_receiver) = mpsc::channel();
    let mut pool = MockPoolController::new();
    pool.expect_add_local_transaction()
        .returning(move |transaction| {
            let _ = solution_sender.send(transaction);
            true
        });
    let config = MinerConfig {
        search_mode: BlockSearchMode::LatestBlock,
        ..test_config()
    };
    let (mut manager, controller) =
        start_miner_worker(config, context.channels(pool), context.keypair.clone());

    let solution = solution_receiver
        .recv_timeout(Duration::from_secs(10))
        .expect("no solution submitted");
    manager.stop();

    assert_eq!(solution.content.tx_type, TransactionType::PoWSolution);
    assert_eq!(solution.content.block_height, 12);
    assert!(solution.content.amount.is_zero());
    assert!(solution.content.fee.is_zero());
    assert_eq!(
        solution.content.to_list,
        vec![(INFINIMINE.clone(), Amount::zero())]
    );
    assert_matches!(solution.content.sender, TransactionSender::PublicKey(_));
    let (solved_block, _nonce) = solution.pow_solution().unwrap();
    assert_eq!(solved_block, 12);

    let stats = controller.get_stats();
    assert!(stats.solved_blocks_count >= 1);
    assert_ne!(stats.last_solved_block_num, 0);
    assert!(stats.last_solved_time.is_some());
}

#[test]
fn test_no_mining_before_operating() {
    let context = MinerTestContext::new(12, true);
    let mut pool = MockPoolController::new();
    pool.expect_add_local_transaction().never();
    let (mut manager, controller) =
        start_miner_worker(test_config(), context.channels(pool), context.keypair.clone());
    std::thread::sleep(Duration::from_millis(200));
    let stats = controller.get_stats();
    manager.stop();
    assert_eq!(stats.current_block_num, 0);
    assert_eq!(stats.solved_blocks_count, 0);
}

#[test]
fn test_disabled_miner_serves_queries() {
    let context = MinerTestContext::new(12, true);
    let config = MinerConfig {
        enabled: false,
        ..test_config()
    };
    let (mut manager, controller) = start_miner_worker(
        config,
        context.channels(MockPoolController::new()),
        context.keypair.clone(),
    );
    assert_eq!(controller.get_stats().thread_count, 0);
    let candidate = controller.get_mining_block_candidate(BlockSearchMode::LowestDifficulty);
    assert_eq!(candidate.map(|block| block.block_num), Some(2));
    manager.stop();
}

#[test]
fn test_public_key_left_out_once_known() {
    let context = MinerTestContext::new(12, true);
    let core = context.core(test_config(), MockPoolController::new());
    let nonce = encode_nonce(&[7u8; 64]);

    let solution = core.build_solution(5, &nonce).unwrap();
    assert_matches!(solution.content.sender, TransactionSender::PublicKey(_));

    context
        .wallet_state
        .set_public_key(&context.address(), context.keypair.get_public_key(), false);
    let solution = core.build_solution(5, &nonce).unwrap();
    assert_matches!(solution.content.sender, TransactionSender::Address(ref address) if *address == context.address());
    assert_eq!(solution.pow_solution(), Some((5, nonce.as_str())));
}

#[test]
fn test_submit_mining_solution() {
    let context = MinerTestContext::new(12, true);
    let mut pool = MockPoolController::new();
    let mut accept = true;
    pool.expect_add_local_transaction().times(2).returning(move |_| {
        let accepted = accept;
        accept = false;
        accepted
    });
    let config = MinerConfig {
        enabled: false,
        ..test_config()
    };
    let (mut manager, controller) =
        start_miner_worker(config, context.channels(pool), context.keypair.clone());

    assert!(!controller.submit_mining_solution("not hex", 5));
    assert!(!controller.submit_mining_solution("", 5));
    let nonce = encode_nonce(&[1u8; 64]);
    assert!(controller.submit_mining_solution(&nonce, 5));
    assert!(!controller.submit_mining_solution(&nonce, 6));
    manager.stop();
}

#[test]
fn test_verify_mining_solution() {
    let context = MinerTestContext::new(12, true);
    let core = context.core(test_config(), MockPoolController::new());
    let nonce = encode_nonce(&[3u8; 64]);
    let solver = context.address();

    assert!(core.verify_solution(&nonce, 4, &solver, 4000));
    assert!(!core.verify_solution(&nonce, 40, &solver, 4000));
    assert!(!core.verify_solution(&"0".repeat(130), 4, &solver, 4000));

    context.hasher.set_solving(false);
    assert!(!core.verify_solution(&nonce, 4, &solver, 4000));
}

#[test]
fn test_active_block_dropped_once_solved() {
    let context = MinerTestContext::new(12, false);
    let config = MinerConfig {
        search_mode: BlockSearchMode::LatestBlock,
        ..test_config()
    };
    let core = context.core(config, MockPoolController::new());

    assert!(core.search_for_block());
    assert_eq!(core.active_block().map(|block| block.block_num), Some(12));
    assert_eq!(core.stats().current_block_difficulty, 12_000);

    core.check_active_block_solved();
    assert!(core.active_block().is_some());

    context.block_store.set_pow_field(12, Some(13));
    core.check_active_block_solved();
    assert!(core.active_block().is_none());

    assert!(core.search_for_block());
    assert_eq!(core.active_block().map(|block| block.block_num), Some(11));
    core.force_search_for_block();
    assert!(core.active_block().is_none());
}

#[test]
fn test_solved_blocks_are_skipped() {
    let context = MinerTestContext::new(4, true);
    let mut pool = MockPoolController::new();
    pool.expect_add_local_transaction().returning(|_| true);
    let config = MinerConfig {
        search_mode: BlockSearchMode::LowestDifficulty,
        ..test_config()
    };
    let core = context.core(config, pool);
    let mut worker_context = ixian_pow::MinerWorkerContext::new();

    // blocks 2 to 4 are candidates, the oldest retained block is left out
    for expected in [2, 3, 4] {
        assert!(core.search_for_block());
        let active = core.active_block().unwrap();
        assert_eq!(active.block_num, expected);
        core.compute_once(&active, &mut worker_context);
        assert!(core.active_block().is_none());
    }
    assert!(!core.search_for_block());
    assert_eq!(core.stats().solved_blocks_count, 3);

    // a solution applied by the network frees the solved list
    context.block_store.set_pow_field(3, Some(5));
    assert!(!core.search_for_block());
    assert_eq!(
        core.get_mining_block_candidate(BlockSearchMode::LowestDifficulty),
        None
    );
}

#[test]
fn test_block_counts() {
    let context = MinerTestContext::new(20, false);
    for block_num in [3, 7, 11] {
        context.block_store.set_pow_field(block_num, Some(block_num + 1));
    }
    let config = MinerConfig {
        redacted_window_size: 15,
        ..test_config()
    };
    let core = context.core(config, MockPoolController::new());
    let stats = core.stats();
    assert_eq!(stats.full_blocks, 2);
    assert_eq!(stats.empty_blocks, 13);
    assert_eq!(stats.thread_count, 1);
    assert!(!stats.paused);

    core.set_paused(true);
    assert!(core.stats().paused);
}
