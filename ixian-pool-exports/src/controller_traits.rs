// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::BlockRejected;
use ixian_models::{Address, Amount, Block, Transaction, TransactionId};

/// Interface of the transaction pool, shared by the sync engine, the miner and the API
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait PoolController: Send + Sync {
    /// Adds a transaction, verifying it first if `verify`.
    /// It is relayed to peers unless `skip_broadcast` or the node is synchronizing.
    fn add_transaction(&self, transaction: Transaction, skip_broadcast: bool, verify: bool)
        -> bool;

    /// Adds a transaction created by this node and tracks it until it is applied
    fn add_local_transaction(&self, transaction: Transaction) -> bool;

    /// Checks a transaction against the ledger rules without adding it
    fn verify_transaction(&self, transaction: &Transaction) -> bool;

    /// Looks a transaction up in memory, then in storage if `search_storage`
    /// or if only its compacted entry is left in memory
    fn get_transaction(
        &self,
        id: &TransactionId,
        block_num: Option<u64>,
        search_storage: bool,
    ) -> Option<Transaction>;

    /// Returns true if the pool knows `id`, compacted or not
    fn has_transaction(&self, id: &TransactionId) -> bool;

    /// Forgets `id`
    fn remove_transaction(&self, id: &TransactionId) -> bool;

    /// Applies every transaction of `block` to the wallet state.
    /// With `snapshot` the changes only go to a fresh wallet state snapshot
    /// and no transaction is stamped as applied.
    fn apply_transactions_from_block(&self, block: &Block, snapshot: bool)
        -> Result<(), BlockRejected>;

    /// Stamps the transactions of a block whose effect is already part of the wallet state
    fn set_applied_flags_from_block(&self, block: &Block) -> bool;

    /// Co-signatures of `orig_tx_id` with their signer, searched in `block` or in the whole pool
    fn get_related_multisig_transactions(
        &self,
        orig_tx_id: &TransactionId,
        block: Option<Block>,
    ) -> Vec<(TransactionId, Address)>;

    /// Keeps only the ids of the transactions of `block` in memory
    fn compact(&self, block: &Block);

    /// Drops expired transactions and PoW solutions of solved blocks, returns how many
    fn prune(&self) -> usize;

    /// Transactions stamped as applied
    fn get_applied_transactions(&self) -> Vec<Transaction>;

    /// Transactions not applied yet
    fn get_unapplied_transactions(&self) -> Vec<Transaction>;

    /// Up to `count` transactions, most recent first
    fn get_last_transactions(&self, count: usize) -> Vec<Transaction>;

    /// Known transactions of `block`
    fn get_full_block_transactions(&self, block: &Block) -> Vec<Transaction>;

    /// Sum of the amounts of the known transactions of `block`
    fn get_total_transactions_value_in_block(&self, block: &Block) -> Amount;

    /// Number of known transactions, compacted ones included
    fn transaction_count(&self) -> usize;

    /// Forgets every transaction
    fn clear(&self);

    /// Returns a boxed clone of self.
    /// Allows cloning `Box<dyn PoolController>`.
    fn clone_box(&self) -> Box<dyn PoolController>;
}

/// Allow cloning `Box<dyn PoolController>`
/// Uses `PoolController::clone_box` internally
impl Clone for Box<dyn PoolController> {
    fn clone(&self) -> Box<dyn PoolController> {
        self.clone_box()
    }
}

/// Pool manager used to stop the pool thread
pub trait PoolManager {
    /// Stop the pool thread
    fn stop(&mut self);
}
