// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_models::{Transaction, TransactionId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Archive of the transactions of stored blocks
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait TransactionStorage: Send + Sync {
    /// Transaction `id`, optionally narrowed to the block that applied it
    fn get_transaction(&self, id: &TransactionId, block_num: Option<u64>) -> Option<Transaction>;

    /// Archives `transaction`, replacing a previous copy
    fn insert_transaction(&self, transaction: Transaction);

    /// Ids of the archived transactions applied by `block_num`
    fn get_transactions_in_block(&self, block_num: u64) -> Vec<TransactionId>;
}

/// `TransactionStorage` keeping everything in memory
#[derive(Default)]
pub struct InMemoryTransactionStorage {
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
}

impl InMemoryTransactionStorage {
    /// Empty archive
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStorage for InMemoryTransactionStorage {
    fn get_transaction(&self, id: &TransactionId, block_num: Option<u64>) -> Option<Transaction> {
        let transactions = self.transactions.read();
        let mut transaction = transactions.get(id)?.clone();
        if let Some(block_num) = block_num {
            if transaction.applied != block_num {
                return None;
            }
        }
        transaction.from_local_storage = true;
        Some(transaction)
    }

    fn insert_transaction(&self, transaction: Transaction) {
        self.transactions
            .write()
            .insert(transaction.id.clone(), transaction);
    }

    fn get_transactions_in_block(&self, block_num: u64) -> Vec<TransactionId> {
        let mut ids: Vec<TransactionId> = self
            .transactions
            .read()
            .values()
            .filter(|tx| tx.applied == block_num)
            .map(|tx| tx.id.clone())
            .collect();
        ids.sort();
        ids
    }
}
