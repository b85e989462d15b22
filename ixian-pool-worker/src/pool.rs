// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::collections::BTreeSet;
use std::sync::Arc;

use ixian_logging::ixian_trace;
use ixian_models::config::MINING_REWARD_END_HEIGHT;
use ixian_models::{Address, Amount, Block, Transaction, TransactionId, TransactionType};
use ixian_pool_exports::{BlockRejected, PoolChannels};
use ixian_protocol_exports::PeerTransport;
use ixian_storage_exports::TransactionStorage;
use ixian_time::IxianTime;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace, warn};

use crate::apply::{evict, lookup, related_multisig_transactions, BlockApplication};
use crate::ledger_rules::{LedgerRules, TransactionMap};

/// Transaction submitted by this node, tracked until a block applies it
#[derive(Debug, Clone)]
pub(crate) struct PendingTransaction {
    pub transaction: Transaction,
    pub added: IxianTime,
    pub last_broadcast: IxianTime,
    pub inquired: bool,
}

/// Registry of the known transactions.
///
/// Lock order: `transactions` is never held while `pending` is being locked.
pub(crate) struct TransactionPool {
    pub rules: LedgerRules,
    pub storage: Arc<dyn TransactionStorage>,
    pub transport: Arc<dyn PeerTransport>,
    pub channels: PoolChannels,
    transactions: RwLock<TransactionMap>,
    pending: Mutex<Vec<PendingTransaction>>,
}

impl TransactionPool {
    pub fn new(
        rules: LedgerRules,
        storage: Arc<dyn TransactionStorage>,
        transport: Arc<dyn PeerTransport>,
        channels: PoolChannels,
    ) -> Self {
        TransactionPool {
            rules,
            storage,
            transport,
            channels,
            transactions: RwLock::new(TransactionMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn add_transaction(
        &self,
        mut transaction: Transaction,
        skip_broadcast: bool,
        verify: bool,
    ) -> bool {
        let synchronizing = self.rules.status.is_synchronizing();
        {
            let mut transactions = self.transactions.write();
            if verify {
                if let Err(err) = self.rules.verify_transaction(&transaction, &transactions) {
                    warn!("rejected transaction {}: {}", transaction.id, err);
                    return false;
                }
                if transaction.content.tx_type == TransactionType::PoWSolution && !synchronizing
                {
                    transaction.pow_verified = true;
                }
            } else if !transaction.verify_checksum() {
                warn!("rejected transaction {}: checksum mismatch", transaction.id);
                return false;
            }
            if transactions.contains_key(&transaction.id) {
                warn!("transaction {} is already in the pool", transaction.id);
                return false;
            }
            transactions.insert(transaction.id.clone(), Some(transaction.clone()));
        }
        ixian_trace!("pool.add_transaction", {
            "id": transaction.id.as_str(),
            "block_height": transaction.content.block_height
        });

        if synchronizing || skip_broadcast {
            return true;
        }
        if !self.transport.broadcast_transaction(&transaction, None) {
            debug!("could not broadcast transaction {}", transaction.id);
        }
        if let Err(err) = self.channels.transaction_sender.send(transaction) {
            trace!("no subscriber for new transactions: {}", err);
        }
        true
    }

    pub fn add_local_transaction(&self, transaction: Transaction) -> bool {
        if !self.add_transaction(transaction.clone(), false, true) {
            return false;
        }
        match IxianTime::now() {
            Ok(now) => self.pending.lock().push(PendingTransaction {
                transaction,
                added: now,
                last_broadcast: now,
                inquired: false,
            }),
            Err(err) => warn!("could not track pending transaction: {}", err),
        }
        true
    }

    pub fn verify_transaction(&self, transaction: &Transaction) -> bool {
        let transactions = self.transactions.read();
        match self.rules.verify_transaction(transaction, &transactions) {
            Ok(()) => true,
            Err(err) => {
                debug!("transaction {} is invalid: {}", transaction.id, err);
                false
            }
        }
    }

    pub fn get_transaction(
        &self,
        id: &TransactionId,
        block_num: Option<u64>,
        search_storage: bool,
    ) -> Option<Transaction> {
        match self.transactions.read().get(id) {
            Some(Some(transaction)) => return Some(transaction.clone()),
            Some(None) => {}
            None if search_storage => {}
            None => return None,
        }
        self.storage.get_transaction(id, block_num)
    }

    pub fn has_transaction(&self, id: &TransactionId) -> bool {
        self.transactions.read().contains_key(id)
    }

    pub fn remove_transaction(&self, id: &TransactionId) -> bool {
        let removed = self.transactions.write().remove(id).is_some();
        self.pending
            .lock()
            .retain(|entry| &entry.transaction.id != id);
        removed
    }

    pub fn apply_transactions_from_block(
        &self,
        block: &Block,
        snapshot: bool,
    ) -> Result<(), BlockRejected> {
        let block_num = block.block_num;
        let wallet_state = &self.rules.wallet_state;
        let mut transactions = self.transactions.write();
        if snapshot {
            wallet_state.begin_snapshot();
        } else {
            wallet_state.begin_transaction(block_num);
        }

        let applied = match BlockApplication::new(
            &self.rules,
            self.storage.as_ref(),
            &mut transactions,
            block,
            snapshot,
        )
        .run()
        {
            Ok(applied) => applied,
            Err(err) => {
                if !snapshot {
                    wallet_state.revert_transaction();
                }
                warn!("block #{} rejected: {}", block_num, err);
                return Err(err);
            }
        };
        if snapshot {
            return Ok(());
        }

        let archive = !(self.rules.status.is_synchronizing() && self.rules.config.recover_from_file);
        let mut stamped = Vec::with_capacity(applied.stamped.len());
        for id in applied.stamped.iter() {
            if let Some(Some(transaction)) = transactions.get_mut(id) {
                transaction.applied = block_num;
                if archive {
                    self.storage.insert_transaction(transaction.clone());
                }
                stamped.push(transaction.clone());
            }
        }
        for target in applied.rewarded_blocks.iter() {
            if !self.rules.block_store.set_pow_field(*target, Some(block_num)) {
                warn!("could not mark block #{} as solved", target);
            }
        }
        wallet_state.commit_transaction();
        drop(transactions);

        self.pending
            .lock()
            .retain(|entry| !applied.stamped.contains(&entry.transaction.id));
        ixian_trace!("pool.apply_block", {
            "block_num": block_num,
            "applied": stamped.len()
        });
        for transaction in stamped {
            if let Err(err) = self.channels.applied_sender.send(transaction) {
                trace!("no subscriber for applied transactions: {}", err);
            }
        }
        Ok(())
    }

    pub fn set_applied_flags_from_block(&self, block: &Block) -> bool {
        let block_num = block.block_num;
        let mut transactions = self.transactions.write();
        let mut solved_blocks = BTreeSet::new();
        for id in block.transactions.iter() {
            let Some(transaction) = lookup(&transactions, self.storage.as_ref(), id) else {
                warn!("transaction {} of block #{} is missing", id, block_num);
                return false;
            };
            if let Some((target, _)) = transaction.pow_solution() {
                if !transaction.from_local_storage {
                    if let Err(err) =
                        self.rules
                            .verify_pow(&transaction, Some(block.version), true)
                    {
                        warn!("transaction {} of block #{}: {}", id, block_num, err);
                        return false;
                    }
                }
                solved_blocks.insert(target);
            }
            if let Some(Some(known)) = transactions.get_mut(id) {
                known.applied = block_num;
                if !known.from_local_storage {
                    self.storage.insert_transaction(known.clone());
                }
            }
        }
        for target in solved_blocks {
            if target < MINING_REWARD_END_HEIGHT
                && self.rules.block_store.get_block(target, true).is_some()
            {
                self.rules.block_store.set_pow_field(target, Some(block_num));
            }
        }
        true
    }

    pub fn get_related_multisig_transactions(
        &self,
        orig_tx_id: &TransactionId,
        block: Option<&Block>,
    ) -> Vec<(TransactionId, Address)> {
        let mut transactions = self.transactions.write();
        related_multisig_transactions(
            &self.rules,
            &mut transactions,
            self.storage.as_ref(),
            orig_tx_id,
            block,
            false,
        )
    }

    pub fn compact(&self, block: &Block) {
        let mut transactions = self.transactions.write();
        for id in block.transactions.iter() {
            if let Some(entry) = transactions.get_mut(id) {
                if entry.as_ref().map_or(false, |transaction| transaction.applied != 0) {
                    *entry = None;
                }
            }
        }
    }

    pub fn prune(&self) -> usize {
        if self.rules.status.is_synchronizing() {
            return 0;
        }
        let last_block_num = self.rules.block_store.get_last_block_num();
        let min_height = std::cmp::max(1, self.rules.min_block_height(last_block_num));
        let mut transactions = self.transactions.write();
        let stale: Vec<TransactionId> = transactions
            .values()
            .flatten()
            .filter(|transaction| transaction.applied == 0)
            .filter(|transaction| {
                if let Some((target, _)) = transaction.pow_solution() {
                    let solvable = self
                        .rules
                        .block_store
                        .get_block(target, true)
                        .map_or(false, |block| !block.is_solved());
                    if !solvable {
                        return true;
                    }
                }
                transaction.content.block_height < min_height
            })
            .map(|transaction| transaction.id.clone())
            .collect();
        for id in stale.iter() {
            evict(&mut transactions, id);
        }
        if !stale.is_empty() {
            info!("pruned {} transactions", stale.len());
        }
        stale.len()
    }

    /// Rebroadcasts, inquires about or forgets the transactions sent by this node
    pub fn process_pending_transactions(&self, now: IxianTime) {
        let config = &self.rules.config;
        let last_block_num = self.rules.block_store.get_last_block_num();
        let window = config.redacted_window_size;
        let mut inquiries = Vec::new();
        let mut rebroadcasts = Vec::new();
        {
            let mut pending = self.pending.lock();
            let transactions = self.transactions.read();
            pending.retain_mut(|entry| {
                let transaction = &entry.transaction;
                match transactions.get(&transaction.id) {
                    Some(Some(known)) if known.applied != 0 => return false,
                    Some(None) => return false,
                    _ => {}
                }
                let height = transaction.content.block_height;
                if last_block_num > window && height < last_block_num - window {
                    debug!("pending transaction {} expired", transaction.id);
                    return false;
                }
                if now.saturating_sub(entry.added) > config.pending_expiry {
                    debug!("pending transaction {} timed out", transaction.id);
                    return false;
                }
                if let Some((target, _)) = transaction.pow_solution() {
                    let solvable = self
                        .rules
                        .block_store
                        .get_block(target, true)
                        .map_or(false, |block| !block.is_solved());
                    if !solvable {
                        return false;
                    }
                } else if !transactions.contains_key(&transaction.id) {
                    if let Err(err) = self.rules.verify_transaction(transaction, &transactions) {
                        debug!("pending transaction {} dropped: {}", transaction.id, err);
                        return false;
                    }
                }
                if !entry.inquired && now.saturating_sub(entry.added) > config.pending_inquiry_delay
                {
                    entry.inquired = true;
                    inquiries.push((transaction.id.clone(), height));
                }
                if now.saturating_sub(entry.last_broadcast) > config.pending_resend_delay {
                    entry.last_broadcast = now;
                    rebroadcasts.push(transaction.clone());
                }
                true
            });
        }
        for (id, height) in inquiries {
            self.transport.broadcast_get_transaction(&id, height);
        }
        for transaction in rebroadcasts {
            debug!("rebroadcasting pending transaction {}", transaction.id);
            self.transport.broadcast_transaction(&transaction, None);
        }
    }

    pub fn get_applied_transactions(&self) -> Vec<Transaction> {
        let transactions = self.transactions.read();
        transactions
            .iter()
            .filter_map(|(id, entry)| match entry {
                Some(transaction) if transaction.applied != 0 => Some(transaction.clone()),
                Some(_) => None,
                None => self.storage.get_transaction(id, None),
            })
            .collect()
    }

    pub fn get_unapplied_transactions(&self) -> Vec<Transaction> {
        self.transactions
            .read()
            .values()
            .flatten()
            .filter(|transaction| transaction.applied == 0)
            .cloned()
            .collect()
    }

    pub fn get_last_transactions(&self, count: usize) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> =
            self.transactions.read().values().flatten().cloned().collect();
        transactions.sort_by(|a, b| b.content.timestamp.cmp(&a.content.timestamp));
        transactions.truncate(count);
        transactions
    }

    pub fn get_full_block_transactions(&self, block: &Block) -> Vec<Transaction> {
        let transactions = self.transactions.read();
        block
            .transactions
            .iter()
            .filter_map(|id| {
                lookup(&transactions, self.storage.as_ref(), id)
                    .or_else(|| self.storage.get_transaction(id, Some(block.block_num)))
            })
            .collect()
    }

    pub fn get_total_transactions_value_in_block(&self, block: &Block) -> Amount {
        self.get_full_block_transactions(block)
            .iter()
            .fold(Amount::zero(), |total, transaction| {
                total.saturating_add(transaction.content.amount)
            })
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.read().len()
    }

    pub fn clear(&self) {
        self.transactions.write().clear();
        self.pending.lock().clear();
    }
}
