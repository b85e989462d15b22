// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! # Pool scenarios
//! Each test starts a pool on an in-memory chain, submits transactions through
//! the controller and applies blocks including them.

use assert_matches::assert_matches;
use ixian_ledger_exports::WalletStateStore;
use ixian_models::{Amount, MultisigOperation, Wallet, WalletType};
use ixian_pool_exports::{BlockRejected, PoolConfig};
use ixian_pow::calculate_reward_for_block;
use ixian_protocol_exports::MockPeerTransport;
use ixian_signature::KeyPair;
use ixian_storage_exports::{BlockStore, TransactionStorage};

use crate::tests::tools::{
    address_of, co_signature, genesis, multisig_change, multisig_spend, permissive_transport,
    pool_test, pow_solution, staking, test_config, transfer, FEE,
};

const NONCE: &str = "00112233445566778899aabbccddeeff";

/// Genesis funds are credited by block #1, later genesis transactions are refused
#[test]
fn test_genesis_block() {
    pool_test(
        test_config(),
        0,
        permissive_transport(),
        |mut manager, controller, context| {
            let receiver = address_of(&KeyPair::generate());
            let amount = Amount::from_raw(1_000_000);
            let tx = genesis(&receiver, amount, 1);
            assert!(controller.add_transaction(tx.clone(), false, true));

            let block = context.next_block(&[&tx]);
            assert_eq!(block.block_num, 1);
            controller
                .apply_transactions_from_block(&block, false)
                .unwrap();
            context.block_store.append_block(block, true).unwrap();
            assert_eq!(context.balance(&receiver), amount);
            assert_eq!(
                controller.get_transaction(&tx.id, None, false).unwrap().applied,
                1
            );

            let late = genesis(&receiver, amount, 2);
            assert!(!controller.add_transaction(late.clone(), false, true));
            assert!(controller.add_transaction(late.clone(), true, false));
            let block = context.next_block(&[&late]);
            assert_matches!(
                controller.apply_transactions_from_block(&block, false),
                Err(BlockRejected::FailedTransactions(1))
            );
            assert_eq!(context.balance(&receiver), amount);
            assert!(!controller.has_transaction(&late.id));
            manager.stop();
        },
    );
}

/// A transfer must pay the minimum fee, then moves the whole balance
#[test]
fn test_transfer_fee_and_reapply() {
    pool_test(
        test_config(),
        20,
        permissive_transport(),
        |mut manager, controller, context| {
            let sender = KeyPair::generate();
            let receiver = address_of(&KeyPair::generate());
            let balance = Amount::from_raw(1_000_000);
            context.fund(&address_of(&sender), balance);

            let free = transfer(&sender, &receiver, balance, Amount::zero(), 20);
            assert!(!controller.verify_transaction(&free));
            assert!(!controller.add_transaction(free, false, true));

            let amount = balance.checked_sub(FEE).unwrap();
            let tx = transfer(&sender, &receiver, amount, FEE, 20);
            assert!(controller.add_transaction(tx.clone(), false, true));

            let block = context.next_block(&[&tx]);
            controller
                .apply_transactions_from_block(&block, false)
                .unwrap();
            assert_eq!(context.balance(&address_of(&sender)), Amount::zero());
            assert_eq!(context.balance(&receiver), amount);
            assert_eq!(
                context
                    .storage
                    .get_transaction(&tx.id, Some(block.block_num))
                    .unwrap()
                    .applied,
                block.block_num
            );

            // applying the same block again changes nothing
            controller
                .apply_transactions_from_block(&block, false)
                .unwrap();
            assert_eq!(context.balance(&receiver), amount);
            assert_eq!(controller.get_applied_transactions().len(), 1);
            assert!(controller.get_unapplied_transactions().is_empty());
            manager.stop();
        },
    );
}

/// A rejected block leaves the wallet state untouched
#[test]
fn test_failed_transaction_reverts_block() {
    pool_test(
        test_config(),
        20,
        permissive_transport(),
        |mut manager, controller, context| {
            let sender = KeyPair::generate();
            let receiver = address_of(&KeyPair::generate());
            context.fund(&address_of(&sender), Amount::from_raw(100_000));

            let paid = transfer(&sender, &receiver, Amount::from_raw(50_000), FEE, 20);
            let overspent = transfer(&sender, &receiver, Amount::from_raw(90_000), FEE, 20);
            assert!(controller.add_transaction(paid.clone(), false, true));
            assert!(controller.add_transaction(overspent.clone(), false, true));

            let block = context.next_block(&[&paid, &overspent]);
            assert_matches!(
                controller.apply_transactions_from_block(&block, false),
                Err(BlockRejected::FailedTransactions(1))
            );
            assert_eq!(context.balance(&receiver), Amount::zero());
            assert_eq!(
                context.balance(&address_of(&sender)),
                Amount::from_raw(100_000)
            );
            assert!(controller.has_transaction(&paid.id));
            assert!(!controller.has_transaction(&overspent.id));
            assert_eq!(
                controller.get_transaction(&paid.id, None, false).unwrap().applied,
                0
            );

            let block = context.next_block(&[&paid]);
            controller
                .apply_transactions_from_block(&block, false)
                .unwrap();
            assert_eq!(context.balance(&receiver), Amount::from_raw(50_000));
            manager.stop();
        },
    );
}

/// Declared heights are accepted down to the start of the redacted window
#[test]
fn test_block_height_window() {
    let config = PoolConfig {
        redacted_window_size: 10,
        ..test_config()
    };
    pool_test(config, 30, permissive_transport(), |mut manager, controller, context| {
        let sender = KeyPair::generate();
        let receiver = address_of(&KeyPair::generate());
        context.fund(&address_of(&sender), Amount::from_raw(1_000_000));

        let oldest = transfer(&sender, &receiver, Amount::from_raw(10), FEE, 20);
        let stale = transfer(&sender, &receiver, Amount::from_raw(10), FEE, 19);
        let ahead = transfer(&sender, &receiver, Amount::from_raw(10), FEE, 35);
        let too_far = transfer(&sender, &receiver, Amount::from_raw(10), FEE, 36);
        assert!(controller.verify_transaction(&oldest));
        assert!(!controller.verify_transaction(&stale));
        assert!(controller.verify_transaction(&ahead));
        assert!(!controller.verify_transaction(&too_far));

        context.status.raise_highest_network_block(40);
        assert!(controller.verify_transaction(&too_far));
        manager.stop();
    });
}

/// Submitting a transaction twice broadcasts and notifies once
#[test]
fn test_duplicate_submission() {
    let mut transport = MockPeerTransport::new();
    transport
        .expect_broadcast_transaction()
        .times(1)
        .returning(|_, _| true);
    pool_test(test_config(), 20, transport, |mut manager, controller, context| {
        let mut receiver = context.channels.transaction_sender.subscribe();
        let sender = KeyPair::generate();
        context.fund(&address_of(&sender), Amount::from_raw(1_000_000));
        let tx = transfer(
            &sender,
            &address_of(&KeyPair::generate()),
            Amount::from_raw(10),
            FEE,
            20,
        );

        assert!(controller.add_transaction(tx.clone(), false, true));
        assert!(!controller.add_transaction(tx.clone(), false, true));
        assert!(!controller.add_transaction(tx.clone(), false, false));
        assert_eq!(receiver.try_recv().unwrap().id, tx.id);
        assert!(receiver.try_recv().is_err());
        assert_eq!(controller.transaction_count(), 1);
        manager.stop();
    });
}

/// Nothing is relayed while the node is synchronizing
#[test]
fn test_no_broadcast_while_synchronizing() {
    let mut transport = MockPeerTransport::new();
    transport.expect_broadcast_transaction().never();
    pool_test(test_config(), 20, transport, |mut manager, controller, context| {
        context.status.set_synchronizing(true);
        let sender = KeyPair::generate();
        // balances are not checked while synchronizing
        let tx = transfer(
            &sender,
            &address_of(&KeyPair::generate()),
            Amount::from_raw(10),
            FEE,
            20,
        );
        assert!(controller.add_transaction(tx, false, true));
        manager.stop();
    });
}

/// Multisig spends execute once enough distinct signers co-signed
#[test]
fn test_multisig_threshold() {
    pool_test(
        test_config(),
        20,
        permissive_transport(),
        |mut manager, controller, context| {
            let owner = KeyPair::generate();
            let cosigner = KeyPair::generate();
            let wallet_address = address_of(&owner);
            let receiver = address_of(&KeyPair::generate());
            let mut wallet = Wallet::new(wallet_address.clone());
            wallet.balance = Amount::from_raw(1_000_000);
            wallet.wallet_type = WalletType::Multisig;
            wallet.required_sigs = 2;
            wallet.allowed_signers = vec![address_of(&cosigner)];
            context.wallet_state.set_wallet(wallet, false);

            let origin = multisig_spend(
                &wallet_address,
                &owner,
                &receiver,
                Amount::from_raw(100_000),
                20,
            );
            assert!(controller.add_transaction(origin.clone(), false, true));

            // the owner cannot count twice
            let repeated = co_signature(&wallet_address, &owner, &origin.id, 20);
            assert!(controller.add_transaction(repeated.clone(), false, true));
            let block = context.next_block(&[&origin, &repeated]);
            assert_matches!(
                controller.apply_transactions_from_block(&block, false),
                Err(BlockRejected::MultisigNotExecuted(id)) if id == origin.id
            );
            assert!(!controller.has_transaction(&repeated.id));
            assert_eq!(context.balance(&receiver), Amount::zero());

            let signed = co_signature(&wallet_address, &cosigner, &origin.id, 20);
            assert!(controller.add_transaction(signed.clone(), false, true));
            assert_eq!(
                controller.get_related_multisig_transactions(&origin.id, None),
                vec![(signed.id.clone(), address_of(&cosigner))]
            );
            let block = context.next_block(&[&origin, &signed]);
            controller
                .apply_transactions_from_block(&block, false)
                .unwrap();
            assert_eq!(context.balance(&receiver), Amount::from_raw(100_000));
            assert_eq!(
                context.balance(&wallet_address),
                Amount::from_raw(1_000_000 - 100_000 - 2 * FEE.to_raw())
            );
            for id in [&origin.id, &signed.id] {
                assert_eq!(
                    controller.get_transaction(id, None, false).unwrap().applied,
                    block.block_num
                );
            }
            manager.stop();
        },
    );
}

/// Adding and removing signers reshapes the wallet
#[test]
fn test_multisig_reconfiguration() {
    pool_test(
        test_config(),
        20,
        permissive_transport(),
        |mut manager, controller, context| {
            let owner = KeyPair::generate();
            let cosigner = address_of(&KeyPair::generate());
            let wallet_address = address_of(&owner);
            context.fund(&wallet_address, Amount::from_raw(1_000_000));

            let add = multisig_change(
                &wallet_address,
                &owner,
                MultisigOperation::AddSigner {
                    address: cosigner.clone(),
                },
                20,
            );
            assert!(controller.add_transaction(add.clone(), false, true));
            let block = context.next_block(&[&add]);
            controller
                .apply_transactions_from_block(&block, false)
                .unwrap();
            context.block_store.append_block(block, true).unwrap();
            let wallet = context.wallet_state.get_wallet(&wallet_address, false);
            assert_eq!(wallet.wallet_type, WalletType::Multisig);
            assert_eq!(wallet.allowed_signers, vec![cosigner.clone()]);

            // the owner cannot be removed
            let remove_owner = multisig_change(
                &wallet_address,
                &owner,
                MultisigOperation::DelSigner {
                    address: wallet_address.clone(),
                },
                21,
            );
            assert!(controller.add_transaction(remove_owner.clone(), true, false));
            let block = context.next_block(&[&remove_owner]);
            assert_matches!(
                controller.apply_transactions_from_block(&block, false),
                Err(BlockRejected::FailedTransactions(1))
            );

            let remove = multisig_change(
                &wallet_address,
                &owner,
                MultisigOperation::DelSigner {
                    address: cosigner.clone(),
                },
                21,
            );
            assert!(controller.add_transaction(remove.clone(), false, true));
            let block = context.next_block(&[&remove]);
            controller
                .apply_transactions_from_block(&block, false)
                .unwrap();
            let wallet = context.wallet_state.get_wallet(&wallet_address, false);
            assert_eq!(wallet.wallet_type, WalletType::Normal);
            assert!(wallet.allowed_signers.is_empty());
            assert_eq!(wallet.required_sigs, 1);
            manager.stop();
        },
    );
}

/// PoW solutions of solved blocks and invalid nonces are refused,
/// valid ones share the block reward
#[test]
fn test_pow_solutions() {
    pool_test(
        test_config(),
        20,
        permissive_transport(),
        |mut manager, controller, context| {
            let first_miner = KeyPair::generate();
            let second_miner = KeyPair::generate();

            context.block_store.set_pow_field(4, Some(9));
            let late = pow_solution(&first_miner, 4, NONCE, 20);
            assert!(!controller.add_transaction(late, false, true));

            context.hasher.set_solving(false);
            let invalid = pow_solution(&first_miner, 5, NONCE, 20);
            assert!(!controller.add_transaction(invalid.clone(), false, true));
            assert!(controller.add_transaction(invalid.clone(), true, false));
            let block = context.next_block(&[&invalid]);
            assert_matches!(
                controller.apply_transactions_from_block(&block, false),
                Err(BlockRejected::FailedTransactions(1))
            );
            assert!(!controller.has_transaction(&invalid.id));

            context.hasher.set_solving(true);
            let first = pow_solution(&first_miner, 5, NONCE, 20);
            let second = pow_solution(&second_miner, 5, NONCE, 20);
            assert!(controller.add_transaction(first.clone(), false, true));
            assert!(controller.add_transaction(second.clone(), false, true));
            let block = context.next_block(&[&first, &second]);
            controller
                .apply_transactions_from_block(&block, false)
                .unwrap();

            let part = calculate_reward_for_block(5).checked_div_u64(2).unwrap();
            assert_eq!(context.balance(&address_of(&first_miner)), part);
            assert_eq!(context.balance(&address_of(&second_miner)), part);
            assert_eq!(
                context.block_store.get_block(5, true).unwrap().pow_field,
                Some(block.block_num)
            );
            manager.stop();
        },
    );
}

/// Staking rewards go to the signers of the block six heights below
#[test]
fn test_staking_rewards() {
    pool_test(
        test_config(),
        10,
        permissive_transport(),
        |mut manager, controller, context| {
            let validator = KeyPair::generate();
            context.extend_chain(10, &[&validator]);
            let reward = Amount::from_raw(42_000);

            let outsider = staking(
                vec![(address_of(&KeyPair::generate()), reward)],
                15,
                20,
            );
            assert!(controller.add_transaction(outsider.clone(), true, true));
            let block = context.next_block(&[&outsider]);
            assert_matches!(
                controller.apply_transactions_from_block(&block, false),
                Err(BlockRejected::StakingFailed(id)) if id == outsider.id
            );
            assert!(!controller.has_transaction(&outsider.id));

            let missing = staking(vec![(address_of(&validator), reward)], 15, 20);
            let block = context.next_block(&[&missing]);
            assert_matches!(
                controller.apply_transactions_from_block(&block, false),
                Err(BlockRejected::MissingStaking(_))
            );

            assert!(controller.add_transaction(missing.clone(), true, true));
            controller
                .apply_transactions_from_block(&block, true)
                .unwrap();
            context.wallet_state.revert_snapshot();
            assert_eq!(context.balance(&address_of(&validator)), Amount::zero());
            assert_eq!(
                controller
                    .get_transaction(&missing.id, None, false)
                    .unwrap()
                    .applied,
                0
            );

            controller
                .apply_transactions_from_block(&block, false)
                .unwrap();
            assert_eq!(context.balance(&address_of(&validator)), reward);
            manager.stop();
        },
    );
}

/// Pruning drops stale transactions and solutions of solved blocks
#[test]
fn test_prune_and_compact() {
    let config = PoolConfig {
        redacted_window_size: 10,
        ..test_config()
    };
    pool_test(config, 30, permissive_transport(), |mut manager, controller, context| {
        let sender = KeyPair::generate();
        context.fund(&address_of(&sender), Amount::from_raw(1_000_000));
        let receiver = address_of(&KeyPair::generate());
        let old = transfer(&sender, &receiver, Amount::from_raw(10), FEE, 20);
        let fresh = transfer(&sender, &receiver, Amount::from_raw(10), FEE, 29);
        let solution = pow_solution(&KeyPair::generate(), 25, NONCE, 29);
        assert!(controller.add_transaction(old.clone(), false, true));
        assert!(controller.add_transaction(fresh.clone(), false, true));
        // too deep in a short window to pass verification
        assert!(controller.add_transaction(solution.clone(), true, false));

        context.extend_chain(2, &[]);
        context.block_store.set_pow_field(25, Some(31));
        assert_eq!(controller.prune(), 2);
        assert!(controller.has_transaction(&fresh.id));

        let block = context.next_block(&[&fresh]);
        controller
            .apply_transactions_from_block(&block, false)
            .unwrap();
        controller.compact(&block);
        assert!(controller.has_transaction(&fresh.id));
        assert_eq!(
            controller
                .get_transaction(&fresh.id, None, false)
                .unwrap()
                .applied,
            block.block_num
        );
        assert_eq!(controller.get_full_block_transactions(&block).len(), 1);
        assert_eq!(
            controller.get_total_transactions_value_in_block(&block),
            Amount::from_raw(10)
        );
        manager.stop();
    });
}
