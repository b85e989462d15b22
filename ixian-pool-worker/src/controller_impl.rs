// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Pool controller implementation

use std::sync::Arc;

use ixian_models::{Address, Amount, Block, Transaction, TransactionId};
use ixian_pool_exports::{BlockRejected, PoolController};

use crate::pool::TransactionPool;

/// Controller shared by the components using the pool
#[derive(Clone)]
pub struct PoolControllerImpl {
    pub(crate) pool: Arc<TransactionPool>,
}

impl PoolController for PoolControllerImpl {
    fn add_transaction(
        &self,
        transaction: Transaction,
        skip_broadcast: bool,
        verify: bool,
    ) -> bool {
        self.pool
            .add_transaction(transaction, skip_broadcast, verify)
    }

    fn add_local_transaction(&self, transaction: Transaction) -> bool {
        self.pool.add_local_transaction(transaction)
    }

    fn verify_transaction(&self, transaction: &Transaction) -> bool {
        self.pool.verify_transaction(transaction)
    }

    fn get_transaction(
        &self,
        id: &TransactionId,
        block_num: Option<u64>,
        search_storage: bool,
    ) -> Option<Transaction> {
        self.pool.get_transaction(id, block_num, search_storage)
    }

    fn has_transaction(&self, id: &TransactionId) -> bool {
        self.pool.has_transaction(id)
    }

    fn remove_transaction(&self, id: &TransactionId) -> bool {
        self.pool.remove_transaction(id)
    }

    fn apply_transactions_from_block(
        &self,
        block: &Block,
        snapshot: bool,
    ) -> Result<(), BlockRejected> {
        self.pool.apply_transactions_from_block(block, snapshot)
    }

    fn set_applied_flags_from_block(&self, block: &Block) -> bool {
        self.pool.set_applied_flags_from_block(block)
    }

    fn get_related_multisig_transactions(
        &self,
        orig_tx_id: &TransactionId,
        block: Option<Block>,
    ) -> Vec<(TransactionId, Address)> {
        self.pool
            .get_related_multisig_transactions(orig_tx_id, block.as_ref())
    }

    fn compact(&self, block: &Block) {
        self.pool.compact(block)
    }

    fn prune(&self) -> usize {
        self.pool.prune()
    }

    fn get_applied_transactions(&self) -> Vec<Transaction> {
        self.pool.get_applied_transactions()
    }

    fn get_unapplied_transactions(&self) -> Vec<Transaction> {
        self.pool.get_unapplied_transactions()
    }

    fn get_last_transactions(&self, count: usize) -> Vec<Transaction> {
        self.pool.get_last_transactions(count)
    }

    fn get_full_block_transactions(&self, block: &Block) -> Vec<Transaction> {
        self.pool.get_full_block_transactions(block)
    }

    fn get_total_transactions_value_in_block(&self, block: &Block) -> Amount {
        self.pool.get_total_transactions_value_in_block(block)
    }

    fn transaction_count(&self) -> usize {
        self.pool.transaction_count()
    }

    fn clear(&self) {
        self.pool.clear()
    }

    fn clone_box(&self) -> Box<dyn PoolController> {
        Box::new(self.clone())
    }
}
