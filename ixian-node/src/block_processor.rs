// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::collections::BTreeSet;
use std::sync::Arc;

use ixian_ledger_exports::WalletStateStore;
use ixian_models::config::{MAX_BLOCK_VERSION, SIGNATURE_FREEZE_OFFSET};
use ixian_models::{Block, NodeStatus};
use ixian_pool_exports::PoolController;
use ixian_storage_exports::BlockStore;
use ixian_sync_exports::{BlockProcessor, BlockVerifyStatus};
use ixian_time::IxianTime;
use tracing::{debug, warn};

/// Block processor of a node running without peers.
///
/// Only checks the structure of the blocks and how they chain; the wallet
/// state checksum is checked by applying the block on a wallet state snapshot.
pub struct StandaloneBlockProcessor {
    block_store: Arc<dyn BlockStore>,
    wallet_state: Arc<dyn WalletStateStore>,
    pool: Box<dyn PoolController>,
    status: Arc<NodeStatus>,
}

impl StandaloneBlockProcessor {
    pub fn new(
        block_store: Arc<dyn BlockStore>,
        wallet_state: Arc<dyn WalletStateStore>,
        pool: Box<dyn PoolController>,
        status: Arc<NodeStatus>,
    ) -> Self {
        StandaloneBlockProcessor {
            block_store,
            wallet_state,
            pool,
            status,
        }
    }

    fn chains_on_local_block(&self, block: &Block) -> bool {
        if block.block_num <= 1 {
            return true;
        }
        match self.block_store.get_block(block.block_num - 1, true) {
            Some(previous) => previous.checksum == block.last_block_checksum,
            // first block after a wallet state sync, or below the redacted window
            None => {
                self.block_store.count() == 0
                    || block.block_num <= self.block_store.get_lowest_block_num()
            }
        }
    }
}

impl BlockProcessor for StandaloneBlockProcessor {
    fn verify_block(&self, block: &Block, ignore_wallet_state: bool) -> BlockVerifyStatus {
        let status = self.verify_block_basic(block);
        if status != BlockVerifyStatus::Valid
            || ignore_wallet_state
            || block.skips_wallet_state_checksum()
        {
            return status;
        }

        let status = match self.pool.apply_transactions_from_block(block, true) {
            Ok(()) if self.wallet_state.checksum(true) == block.wallet_state_checksum => {
                BlockVerifyStatus::Valid
            }
            Ok(()) => {
                warn!(
                    "block #{} declares wallet state checksum {}, applying it gives {}",
                    block.block_num,
                    block.wallet_state_checksum,
                    self.wallet_state.checksum(true)
                );
                BlockVerifyStatus::Invalid
            }
            Err(err) => {
                warn!("block #{} does not apply: {}", block.block_num, err);
                BlockVerifyStatus::Invalid
            }
        };
        self.wallet_state.revert_snapshot();
        status
    }

    fn verify_block_basic(&self, block: &Block) -> BlockVerifyStatus {
        if block.version > MAX_BLOCK_VERSION {
            warn!(
                "block #{} has version {}, this node understands up to {}",
                block.block_num, block.version, MAX_BLOCK_VERSION
            );
            return BlockVerifyStatus::Invalid;
        }
        if block.compute_checksum() != block.checksum {
            warn!("block #{} has an invalid checksum", block.block_num);
            return BlockVerifyStatus::Invalid;
        }
        if !self.chains_on_local_block(block) {
            warn!(
                "block #{} does not chain on the local block #{}",
                block.block_num,
                block.block_num - 1
            );
            return BlockVerifyStatus::Invalid;
        }

        let missing = block
            .transactions
            .iter()
            .filter(|id| {
                self.pool
                    .get_transaction(id, Some(block.block_num), true)
                    .is_none()
            })
            .count();
        if missing > 0 {
            debug!(
                "block #{} is waiting for {} transactions",
                block.block_num, missing
            );
            return BlockVerifyStatus::Indeterminate;
        }
        BlockVerifyStatus::Valid
    }

    fn verify_block_signatures(&self, block: &Block) -> bool {
        let mut signers = BTreeSet::new();
        let unique = block
            .signatures
            .iter()
            .all(|sig| signers.insert(sig.signer.to_bytes()));
        unique && block.verify_signatures()
    }

    fn verify_signature_freeze_checksum(&self, block: &Block) -> bool {
        if block.block_num <= SIGNATURE_FREEZE_OFFSET {
            return true;
        }
        let Some(frozen) = self
            .block_store
            .get_block(block.block_num - SIGNATURE_FREEZE_OFFSET, true)
        else {
            return true;
        };
        match block.signature_freeze_checksum {
            Some(checksum) => checksum == frozen.compute_signatures_checksum(),
            None => frozen.signatures.is_empty(),
        }
    }

    fn apply_accepted_block(&self, block: &Block) -> bool {
        if let Err(err) = self.pool.apply_transactions_from_block(block, false) {
            warn!("could not apply block #{}: {}", block.block_num, err);
            return false;
        }
        match IxianTime::now() {
            Ok(now) => self.status.set_last_block_time(now),
            Err(err) => warn!("could not read the clock: {}", err),
        }
        true
    }

    fn resume_operation(&self) {
        self.status.set_operating(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ixian_hash::Hash;
    use ixian_ledger_exports::LedgerConfig;
    use ixian_ledger_worker::WalletState;
    use ixian_models::{Address, Amount, TransactionId};
    use ixian_pool_exports::{BlockRejected, MockPoolController};
    use ixian_signature::KeyPair;
    use ixian_storage_exports::InMemoryBlockStore;

    struct Context {
        block_store: Arc<InMemoryBlockStore>,
        wallet_state: Arc<WalletState>,
        status: Arc<NodeStatus>,
    }

    impl Context {
        fn new(len: u64) -> Self {
            let context = Context {
                block_store: Arc::new(InMemoryBlockStore::new()),
                wallet_state: Arc::new(WalletState::new(LedgerConfig {
                    redacted_window_size: 1000,
                    max_saved_states: 2,
                })),
                status: Arc::new(NodeStatus::new()),
            };
            for _ in 0..len {
                let block = context.next_block(Vec::new());
                context.block_store.append_block(block, true).unwrap();
            }
            context
        }

        fn next_block(&self, transactions: Vec<TransactionId>) -> Block {
            let last = self.block_store.get_last_block();
            Block::new(
                last.as_ref().map_or(1, |block| block.block_num + 1),
                3,
                last.map_or(Hash::ZERO, |block| block.checksum),
                self.wallet_state.checksum(false),
                transactions,
                0x0000_ffff_ffff_ffff,
                IxianTime::from_secs(30),
            )
        }

        fn processor(&self, pool: MockPoolController) -> StandaloneBlockProcessor {
            StandaloneBlockProcessor::new(
                self.block_store.clone(),
                self.wallet_state.clone(),
                Box::new(pool),
                self.status.clone(),
            )
        }
    }

    #[test]
    fn test_basic_checks() {
        let context = Context::new(3);
        let processor = context.processor(MockPoolController::new());

        let block = context.next_block(Vec::new());
        assert_eq!(processor.verify_block_basic(&block), BlockVerifyStatus::Valid);

        let mut tampered = block.clone();
        tampered.difficulty += 1;
        assert_eq!(
            processor.verify_block_basic(&tampered),
            BlockVerifyStatus::Invalid
        );

        let mut unchained = block.clone();
        unchained.last_block_checksum = Hash::compute_from(b"elsewhere");
        unchained.update_checksum();
        assert_eq!(
            processor.verify_block_basic(&unchained),
            BlockVerifyStatus::Invalid
        );

        let mut upgraded = block;
        upgraded.version = MAX_BLOCK_VERSION + 1;
        upgraded.update_checksum();
        assert_eq!(
            processor.verify_block_basic(&upgraded),
            BlockVerifyStatus::Invalid
        );
    }

    #[test]
    fn test_missing_transaction_is_indeterminate() {
        let context = Context::new(3);
        let mut pool = MockPoolController::new();
        pool.expect_get_transaction().returning(|_, _, _| None);
        let processor = context.processor(pool);

        let block = context.next_block(vec![TransactionId::from("1-missing")]);
        assert_eq!(
            processor.verify_block_basic(&block),
            BlockVerifyStatus::Indeterminate
        );
    }

    #[test]
    fn test_wallet_state_checksum_checked_on_snapshot() {
        let context = Context::new(3);
        let mut pool = MockPoolController::new();
        pool.expect_apply_transactions_from_block()
            .returning(|_, snapshot| {
                assert!(snapshot);
                Ok(())
            });
        let processor = context.processor(pool);

        let block = context.next_block(Vec::new());
        assert_eq!(processor.verify_block(&block, false), BlockVerifyStatus::Valid);

        let address = Address::from_public_key(&KeyPair::generate().get_public_key());
        context
            .wallet_state
            .set_balance(&address, Amount::from_raw(10), false);
        assert_eq!(
            processor.verify_block(&block, false),
            BlockVerifyStatus::Invalid
        );
        assert_eq!(processor.verify_block(&block, true), BlockVerifyStatus::Valid);
    }

    #[test]
    fn test_signatures_and_freeze() {
        let context = Context::new(0);
        let signer = KeyPair::generate();
        for _ in 0..6 {
            let mut block = context.next_block(Vec::new());
            block.add_signature(&signer);
            context.block_store.append_block(block, true).unwrap();
        }
        let processor = context.processor(MockPoolController::new());

        let frozen = context.block_store.get_block(2, true).unwrap();
        let mut block = context.next_block(Vec::new());
        assert!(!processor.verify_signature_freeze_checksum(&block));
        block.signature_freeze_checksum = Some(frozen.compute_signatures_checksum());
        block.update_checksum();
        assert!(processor.verify_signature_freeze_checksum(&block));

        assert!(block.add_signature(&signer));
        assert!(processor.verify_block_signatures(&block));
        let duplicate = block.signatures[0].clone();
        block.signatures.push(duplicate);
        assert!(!processor.verify_block_signatures(&block));
    }

    #[test]
    fn test_apply_and_resume() {
        let context = Context::new(3);
        let mut pool = MockPoolController::new();
        pool.expect_apply_transactions_from_block()
            .returning(|block, _| {
                if block.transactions.is_empty() {
                    Ok(())
                } else {
                    Err(BlockRejected::MissingTransaction(block.transactions[0].clone()))
                }
            });
        let processor = context.processor(pool);

        assert!(processor.apply_accepted_block(&context.next_block(Vec::new())));
        assert!(context.status.last_block_time() > IxianTime::from_secs(0));
        assert!(!processor.apply_accepted_block(
            &context.next_block(vec![TransactionId::from("1-missing")])
        ));

        assert!(!context.status.is_operating());
        processor.resume_operation();
        assert!(context.status.is_operating());
    }
}
