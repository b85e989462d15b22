// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Application of the transactions of a block to the wallet state.
//!
//! Staking rewards go first and any failure among them rejects the block.
//! The other transactions are routed by type. A failing transaction is
//! collected and evicted, and rejects the block as a whole once every
//! transaction was routed. Nothing is stamped as applied here: the stamps are
//! returned to the pool which commits them with the wallet state.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use ixian_models::config::{
    BLOCK_VERSION_2, BLOCK_VERSION_3, MINING_REWARD_END_HEIGHT, STAKING_BLOCK_OFFSET,
};
use ixian_models::{
    Address, Amount, Block, MultisigOperation, Transaction, TransactionId, TransactionType,
    WalletType,
};
use ixian_pool_exports::BlockRejected;
use ixian_pow::calculate_reward_for_block;
use ixian_storage_exports::TransactionStorage;
use tracing::{debug, error, warn};

use crate::ledger_rules::{LedgerRules, TransactionMap};

/// Outcome of a successful application, to be committed by the pool
#[derive(Debug, Default)]
pub(crate) struct AppliedBlock {
    /// transactions to stamp with the block number
    pub stamped: BTreeSet<TransactionId>,
    /// solved blocks whose miners were rewarded
    pub rewarded_blocks: Vec<u64>,
}

/// Looks `id` up in the pool, in storage for a compacted entry
pub(crate) fn lookup(
    transactions: &TransactionMap,
    storage: &dyn TransactionStorage,
    id: &TransactionId,
) -> Option<Transaction> {
    match transactions.get(id)? {
        Some(transaction) => Some(transaction.clone()),
        None => storage.get_transaction(id, None),
    }
}

/// Forgets `id` unless it was already applied
pub(crate) fn evict(transactions: &mut TransactionMap, id: &TransactionId) {
    match transactions.get(id) {
        Some(Some(transaction)) if transaction.applied != 0 => {
            error!(
                "transaction {} failed but is already applied in block #{}",
                id, transaction.applied
            );
        }
        Some(_) => {
            transactions.remove(id);
            debug!("evicted transaction {}", id);
        }
        None => {}
    }
}

/// Co-signatures of `orig_tx_id` with their signer.
///
/// The candidates are the ids of `block` if given, the whole pool otherwise.
/// A co-signature repeating a signer or whose origin is unknown is evicted.
pub(crate) fn related_multisig_transactions(
    rules: &LedgerRules,
    transactions: &mut TransactionMap,
    storage: &dyn TransactionStorage,
    orig_tx_id: &TransactionId,
    block: Option<&Block>,
    snapshot: bool,
) -> Vec<(TransactionId, Address)> {
    let candidates: Vec<TransactionId> = match block {
        Some(block) => block.transactions.clone(),
        None => transactions.keys().cloned().collect(),
    };
    let origin_signer = lookup(transactions, storage, orig_tx_id)
        .and_then(|origin| origin.multisig().map(|payload| payload.signer_address()));

    let mut signers: Vec<Address> = origin_signer.iter().cloned().collect();
    let mut related = Vec::new();
    let mut failed = Vec::new();
    for id in candidates {
        let Some(Some(transaction)) = transactions.get(&id) else {
            continue;
        };
        if transaction.content.tx_type != TransactionType::MultisigAddTxSignature {
            continue;
        }
        let Some(payload) = transaction.multisig() else {
            continue;
        };
        if payload.orig_tx_id() != Some(orig_tx_id) {
            continue;
        }
        if origin_signer.is_none() {
            warn!("co-signature {} references unknown transaction {}", id, orig_tx_id);
            failed.push(id);
            continue;
        }
        let signer = payload.signer_address();
        if signers.contains(&signer) {
            warn!("co-signature {} repeats signer {}", id, signer);
            failed.push(id);
            continue;
        }
        let allowed = transaction
            .from_addresses()
            .first()
            .map(|(address, _)| {
                rules
                    .wallet_state
                    .get_wallet(address, snapshot)
                    .is_valid_signer(&signer)
            })
            .unwrap_or(false);
        if !allowed {
            debug!("co-signature {} is signed by foreign signer {}", id, signer);
            continue;
        }
        signers.push(signer.clone());
        related.push((id, signer));
    }
    for id in failed {
        evict(transactions, &id);
    }
    related
}

/// Single-use context applying one block
pub(crate) struct BlockApplication<'a> {
    rules: &'a LedgerRules,
    storage: &'a dyn TransactionStorage,
    transactions: &'a mut TransactionMap,
    block: &'a Block,
    snapshot: bool,
    stamped: BTreeSet<TransactionId>,
    failed: Vec<TransactionId>,
    /// solved block number => (miner, nonce)
    solvers: BTreeMap<u64, Vec<(Address, String)>>,
}

impl<'a> BlockApplication<'a> {
    pub fn new(
        rules: &'a LedgerRules,
        storage: &'a dyn TransactionStorage,
        transactions: &'a mut TransactionMap,
        block: &'a Block,
        snapshot: bool,
    ) -> Self {
        BlockApplication {
            rules,
            storage,
            transactions,
            block,
            snapshot,
            stamped: BTreeSet::new(),
            failed: Vec::new(),
            solvers: BTreeMap::new(),
        }
    }

    /// Applies the block to the wallet state. The caller owns the wallet state
    /// transaction or snapshot the changes go to.
    pub fn run(mut self) -> Result<AppliedBlock, BlockRejected> {
        self.apply_staking()?;

        let block = self.block;
        let block_num = block.block_num;
        for id in block.transactions.iter() {
            if id.is_staking() {
                continue;
            }
            let Some(transaction) = self.lookup(id) else {
                warn!("transaction {} of block #{} is missing", id, block_num);
                return Err(BlockRejected::MissingTransaction(id.clone()));
            };
            if transaction.content.tx_type == TransactionType::StakingReward {
                continue;
            }
            if transaction.applied == block_num || self.stamped.contains(id) {
                continue;
            }
            if transaction.applied != 0 {
                return Err(BlockRejected::AlreadyApplied {
                    id: id.clone(),
                    applied: transaction.applied,
                });
            }
            self.route(&transaction)?;
        }

        let rewarded_blocks = self.reward_miners();

        if !self.failed.is_empty() {
            let failed = std::mem::take(&mut self.failed);
            warn!(
                "{} transactions failed in block #{}: {:?}",
                failed.len(),
                block_num,
                failed
            );
            for id in failed.iter() {
                evict(self.transactions, id);
            }
            return Err(BlockRejected::FailedTransactions(failed.len()));
        }

        if !self.snapshot {
            for id in block.transactions.iter() {
                let applied = self.stamped.contains(id)
                    || self
                        .lookup(id)
                        .map_or(false, |transaction| transaction.applied == block_num);
                if !applied {
                    error!("transaction {} is unapplied after block #{}", id, block_num);
                    return Err(BlockRejected::Unapplied(id.clone()));
                }
            }
        }

        Ok(AppliedBlock {
            stamped: self.stamped,
            rewarded_blocks,
        })
    }

    fn lookup(&self, id: &TransactionId) -> Option<Transaction> {
        lookup(self.transactions, self.storage, id)
    }

    fn fail(&mut self, transaction: &Transaction, reason: &str) {
        warn!(
            "transaction {} failed in block #{}: {}",
            transaction.id, self.block.block_num, reason
        );
        self.failed.push(transaction.id.clone());
    }

    fn balance(&self, address: &Address) -> Amount {
        self.rules
            .wallet_state
            .get_wallet(address, self.snapshot)
            .balance
    }

    fn set_balance(&self, address: &Address, balance: Amount) {
        self.rules
            .wallet_state
            .set_balance(address, balance, self.snapshot);
    }

    fn credit(&self, address: &Address, amount: Amount) -> bool {
        match self.balance(address).checked_add(amount) {
            Some(balance) => {
                self.set_balance(address, balance);
                true
            }
            None => false,
        }
    }

    fn debit(&self, address: &Address, amount: Amount) -> bool {
        match self.balance(address).checked_sub(amount) {
            Some(balance) => {
                self.set_balance(address, balance);
                true
            }
            None => false,
        }
    }

    fn set_public_key(&self, transaction: &Transaction) {
        let Some(public_key) = transaction.content.sender.public_key() else {
            return;
        };
        let primary = transaction.primary_address();
        let wallet = self.rules.wallet_state.get_wallet(&primary, self.snapshot);
        if wallet.public_key.is_none() {
            self.rules
                .wallet_state
                .set_public_key(&primary, *public_key, self.snapshot);
        }
    }

    /// Pays the staking rewards of the block, all or nothing
    fn apply_staking(&mut self) -> Result<(), BlockRejected> {
        let block_num = self.block.block_num;
        let mut remaining: BTreeSet<TransactionId> = self
            .block
            .transactions
            .iter()
            .filter(|id| id.is_staking())
            .cloned()
            .collect();
        let mut candidates: Vec<Transaction> = self
            .transactions
            .values()
            .flatten()
            .filter(|transaction| {
                transaction.content.tx_type == TransactionType::StakingReward
                    && transaction.applied == 0
            })
            .cloned()
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        let mut stakers = HashSet::new();
        for transaction in candidates {
            if !remaining.contains(&transaction.id) {
                if !self.snapshot {
                    debug!(
                        "dropping staking transaction {} left out of block #{}",
                        transaction.id, block_num
                    );
                    self.transactions.remove(&transaction.id);
                }
                continue;
            }
            let target = transaction.staking_target().unwrap_or(0);
            if Some(target) != block_num.checked_sub(STAKING_BLOCK_OFFSET) {
                return Err(BlockRejected::StakingTarget {
                    id: transaction.id.clone(),
                    target,
                });
            }
            if let Err(reason) = self.apply_staking_transaction(&transaction, &mut stakers) {
                warn!(
                    "staking transaction {} failed in block #{}: {}",
                    transaction.id, block_num, reason
                );
                evict(self.transactions, &transaction.id);
                return Err(BlockRejected::StakingFailed(transaction.id.clone()));
            }
            remaining.remove(&transaction.id);
            self.stamped.insert(transaction.id.clone());
        }

        let missing: Vec<TransactionId> = remaining
            .into_iter()
            .filter(|id| {
                self.lookup(id)
                    .map_or(true, |transaction| transaction.applied != block_num)
            })
            .collect();
        if !missing.is_empty() {
            return Err(BlockRejected::MissingStaking(missing));
        }
        Ok(())
    }

    fn apply_staking_transaction(
        &self,
        transaction: &Transaction,
        stakers: &mut HashSet<Address>,
    ) -> Result<(), String> {
        let target = transaction.staking_target().unwrap_or(0);
        let target_block = self
            .rules
            .block_store
            .get_block(target, true)
            .ok_or_else(|| format!("target block #{} is unknown", target))?;
        let signers = target_block.signature_wallet_addresses();
        for (address, amount) in transaction.content.to_list.iter() {
            if !stakers.insert(address.clone()) {
                return Err(format!("{} is rewarded twice", address));
            }
            if amount.is_zero() {
                return Err(format!("empty reward for {}", address));
            }
            if !signers.contains(address) {
                return Err(format!("{} did not sign block #{}", address, target));
            }
            if !self.credit(address, *amount) {
                return Err(format!("balance overflow for {}", address));
            }
        }
        Ok(())
    }

    fn route(&mut self, transaction: &Transaction) -> Result<(), BlockRejected> {
        let tx_type = transaction.content.tx_type;
        if tx_type == TransactionType::Genesis {
            self.apply_genesis(transaction);
            return Ok(());
        }
        if self.block.version >= BLOCK_VERSION_3 {
            self.set_public_key(transaction);
        }
        if tx_type == TransactionType::PoWSolution {
            self.apply_pow(transaction);
            return Ok(());
        }
        if transaction.content.amount.is_zero() && !tx_type.allows_zero_amount() {
            self.fail(transaction, "zero amount");
            return Ok(());
        }
        if self.block.version < BLOCK_VERSION_3 {
            self.set_public_key(transaction);
        }
        match tx_type {
            TransactionType::MultisigTX => self.apply_multisig(transaction)?,
            TransactionType::ChangeMultisigWallet => self.apply_multisig_change(transaction)?,
            // executed along with their origin
            TransactionType::MultisigAddTxSignature => {}
            _ => {
                if let Err(reason) = self.apply_normal(transaction) {
                    self.fail(transaction, &reason);
                }
            }
        }
        Ok(())
    }

    fn apply_genesis(&mut self, transaction: &Transaction) {
        if self.block.block_num > 1 {
            self.fail(transaction, "genesis transaction after block #1");
            return;
        }
        for (address, amount) in transaction.content.to_list.iter() {
            self.set_balance(address, *amount);
        }
        self.stamped.insert(transaction.id.clone());
    }

    fn apply_pow(&mut self, transaction: &Transaction) {
        let block_num = self.block.block_num;
        if !self.rules.is_height_valid_for(transaction, block_num) {
            self.fail(transaction, "declared height out of window");
            return;
        }
        let Some((target, nonce)) = transaction.pow_solution() else {
            self.fail(transaction, "missing solution payload");
            return;
        };
        self.stamped.insert(transaction.id.clone());
        if let Err(err) = self
            .rules
            .verify_pow(transaction, Some(self.block.version), true)
        {
            self.stamped.remove(&transaction.id);
            self.fail(transaction, &err.to_string());
            return;
        }
        if let Some(Some(known)) = self.transactions.get_mut(&transaction.id) {
            known.pow_verified = true;
        }
        let solver = (transaction.primary_address(), nonce.to_string());
        let solvers = self.solvers.entry(target).or_default();
        if self.block.version >= BLOCK_VERSION_2 && solvers.contains(&solver) {
            self.stamped.remove(&transaction.id);
            self.fail(transaction, "duplicate solution");
            return;
        }
        solvers.push(solver);
    }

    /// Debits the inputs, credits the outputs and stamps the transaction
    fn apply_normal(&mut self, transaction: &Transaction) -> Result<(), String> {
        let content = &transaction.content;
        if !self
            .rules
            .is_height_valid_for(transaction, self.block.block_num)
        {
            return Err("declared height out of window".to_string());
        }
        self.rules
            .check_premine(transaction, self.snapshot)
            .map_err(|err| err.to_string())?;
        let minimum = transaction.minimum_fee(self.rules.config.transaction_price);
        if content.fee < minimum {
            return Err(format!("fee {} is below {}", content.fee, minimum));
        }
        if content.amount.checked_add(content.fee) != transaction.total_from() {
            return Err("inputs do not match amount plus fee".to_string());
        }
        if transaction.total_to() != Some(content.amount) {
            return Err("outputs do not match amount".to_string());
        }
        for (address, value) in transaction.from_addresses() {
            if !self.debit(&address, value) {
                return Err(format!("insufficient balance on {}", address));
            }
        }
        for (address, value) in content.to_list.iter() {
            if !self.credit(address, *value) {
                return Err(format!("balance overflow for {}", address));
            }
        }
        self.stamped.insert(transaction.id.clone());
        Ok(())
    }

    /// Runs the shared checks of the multisig origins.
    /// Returns the co-signatures, or `None` if the transaction failed.
    fn multisig_preamble(
        &mut self,
        transaction: &Transaction,
    ) -> Result<Option<Vec<(TransactionId, Address)>>, BlockRejected> {
        if !self
            .rules
            .is_height_valid_for(transaction, self.block.block_num)
        {
            self.fail(transaction, "declared height out of window");
            return Ok(None);
        }
        if transaction.content.from_list.len() != 1 || transaction.multisig().is_none() {
            self.fail(transaction, "malformed multisig transaction");
            return Ok(None);
        }
        let related = related_multisig_transactions(
            self.rules,
            self.transactions,
            self.storage,
            &transaction.id,
            Some(self.block),
            self.snapshot,
        );
        Ok(Some(related))
    }

    fn check_threshold(
        &self,
        transaction: &Transaction,
        required_sigs: u8,
        related: &[(TransactionId, Address)],
    ) -> Result<(), BlockRejected> {
        if related.len() + 1 < required_sigs as usize {
            warn!(
                "multisig transaction {} has {} of {} signatures",
                transaction.id,
                related.len() + 1,
                required_sigs
            );
            return Err(BlockRejected::MultisigNotExecuted(transaction.id.clone()));
        }
        Ok(())
    }

    fn apply_multisig(&mut self, transaction: &Transaction) -> Result<(), BlockRejected> {
        let Some(related) = self.multisig_preamble(transaction)? else {
            return Ok(());
        };
        let Some((address, _)) = transaction.from_addresses().into_iter().next() else {
            return Ok(());
        };
        let wallet = self.rules.wallet_state.get_wallet(&address, self.snapshot);
        if wallet.wallet_type != WalletType::Multisig {
            self.fail(transaction, "source wallet is not a multisig wallet");
            return Ok(());
        }
        self.check_threshold(transaction, wallet.required_sigs, &related)?;
        let signer_valid = transaction
            .multisig()
            .map_or(false, |payload| wallet.is_valid_signer(&payload.signer_address()));
        if !signer_valid {
            self.fail(transaction, "signer is not allowed");
            return Ok(());
        }
        if let Err(reason) = self.apply_normal(transaction) {
            self.fail(transaction, &reason);
            return Ok(());
        }
        self.apply_co_signatures(transaction, &related);
        Ok(())
    }

    fn apply_multisig_change(&mut self, transaction: &Transaction) -> Result<(), BlockRejected> {
        let Some(related) = self.multisig_preamble(transaction)? else {
            return Ok(());
        };
        let Some(payload) = transaction.multisig() else {
            return Ok(());
        };
        let Some((address, _)) = transaction.from_addresses().into_iter().next() else {
            return Ok(());
        };
        let mut wallet = self.rules.wallet_state.get_wallet(&address, self.snapshot);
        self.check_threshold(transaction, wallet.required_sigs, &related)?;

        let signer = payload.signer_address();
        if !wallet.is_valid_signer(&signer) {
            self.fail(transaction, "signer is not allowed");
            return Ok(());
        }
        let outcome = match &payload.operation {
            MultisigOperation::AddSigner { address: new_signer } => {
                if wallet.add_valid_signer(new_signer.clone()) {
                    wallet.wallet_type = WalletType::Multisig;
                    Ok(())
                } else {
                    Err(format!("{} is already a signer", new_signer))
                }
            }
            MultisigOperation::DelSigner { address: old_signer } => {
                if wallet.wallet_type != WalletType::Multisig {
                    Err("not a multisig wallet".to_string())
                } else if old_signer == &wallet.id {
                    Err("the owner cannot be removed".to_string())
                } else if !wallet.del_valid_signer(old_signer) {
                    Err(format!("{} is not a signer", old_signer))
                } else {
                    let signers = wallet.count_allowed_signers();
                    if signers == 0 {
                        wallet.wallet_type = WalletType::Normal;
                        wallet.required_sigs = 1;
                    } else if wallet.required_sigs as usize > signers + 1 {
                        wallet.required_sigs = (signers + 1) as u8;
                    }
                    Ok(())
                }
            }
            MultisigOperation::ChangeRequiredSigs { required } => {
                if wallet.wallet_type != WalletType::Multisig {
                    Err("not a multisig wallet".to_string())
                } else if *required == 0
                    || *required as usize > wallet.count_allowed_signers() + 1
                {
                    Err(format!("{} required signatures cannot be met", required))
                } else {
                    wallet.required_sigs = *required;
                    Ok(())
                }
            }
            MultisigOperation::Transaction { .. } => Err("not a wallet change".to_string()),
        };
        if let Err(reason) = outcome {
            self.fail(transaction, &reason);
            return Ok(());
        }
        let Some(total) = transaction.total_from() else {
            self.fail(transaction, "input overflow");
            return Ok(());
        };
        match wallet.balance.checked_sub(total) {
            Some(balance) => wallet.balance = balance,
            None => {
                self.fail(transaction, "insufficient balance");
                return Ok(());
            }
        }
        self.rules.wallet_state.set_wallet(wallet, self.snapshot);
        self.stamped.insert(transaction.id.clone());
        self.apply_co_signatures(transaction, &related);
        Ok(())
    }

    /// Debits the fees of the co-signatures of an executed origin
    fn apply_co_signatures(
        &mut self,
        origin: &Transaction,
        related: &[(TransactionId, Address)],
    ) {
        for (id, _) in related {
            let Some(co_signature) = self.lookup(id) else {
                warn!("co-signature {} of {} vanished", id, origin.id);
                continue;
            };
            if co_signature.content.tx_type != TransactionType::MultisigAddTxSignature
                || co_signature.content.from_list.len() != 1
                || !self
                    .rules
                    .is_height_valid_for(&co_signature, self.block.block_num)
            {
                self.fail(&co_signature, "invalid co-signature");
                continue;
            }
            let debited = co_signature
                .from_addresses()
                .into_iter()
                .all(|(address, value)| self.debit(&address, value));
            if !debited {
                self.fail(&co_signature, "insufficient balance");
                continue;
            }
            self.stamped.insert(id.clone());
        }
    }

    /// Splits the reward of each solved block between its solvers
    fn reward_miners(&mut self) -> Vec<u64> {
        let mut rewarded = Vec::new();
        let solvers = std::mem::take(&mut self.solvers);
        for (target, miners) in solvers {
            if target >= MINING_REWARD_END_HEIGHT || miners.is_empty() {
                continue;
            }
            if self.rules.block_store.get_block(target, true).is_none() {
                warn!("cannot reward miners of unknown block #{}", target);
                continue;
            }
            let part = calculate_reward_for_block(target)
                .checked_div_u64(miners.len() as u64)
                .unwrap_or_else(Amount::zero);
            for (miner, _) in miners.iter() {
                if !self.credit(miner, part) {
                    warn!("could not reward miner {} of block #{}", miner, target);
                }
            }
            rewarded.push(target);
        }
        rewarded
    }
}
