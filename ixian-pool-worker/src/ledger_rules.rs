// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Validation rules of a transaction entering the pool.
//!
//! The checks run against the last block of the chain and the committed wallet
//! state. While the node is synchronizing the wallet state lags behind the
//! network, so balance, wallet type and PoW checks are left to block application.

use std::collections::HashMap;
use std::sync::Arc;

use ixian_ledger_exports::WalletStateStore;
use ixian_models::config::{
    BLOCK_VERSION_3, MAX_ADDRESS_NONCE_LENGTH, MAX_ORIGIN_TRANSACTION_ID_LENGTH,
    MIN_ORIGIN_TRANSACTION_ID_LENGTH, MIN_TRANSACTION_CHAIN_HEIGHT, POW_SOLUTION_WINDOW_MARGIN,
    PREMINE_ADDRESSES, PREMINE_VESTING_END_HEIGHT, PREMINE_VESTING_SCHEDULE,
    TRANSACTION_FUTURE_HEIGHT_TOLERANCE,
};
use ixian_models::{
    Amount, MultisigOperation, NodeStatus, Transaction, TransactionId, TransactionType,
    WalletType,
};
use ixian_pool_exports::{PoolConfig, PoolError, PoolResult};
use ixian_pow::{verify_nonce, PowHasher, PowVersion};
use ixian_storage_exports::BlockStore;

/// Known transactions. `None` marks a compacted entry whose body lives in storage.
pub(crate) type TransactionMap = HashMap<TransactionId, Option<Transaction>>;

/// Collaborators the ledger rules read from
pub(crate) struct LedgerRules {
    pub config: PoolConfig,
    pub block_store: Arc<dyn BlockStore>,
    pub wallet_state: Arc<dyn WalletStateStore>,
    pub status: Arc<NodeStatus>,
    pub hasher: Arc<dyn PowHasher>,
}

impl LedgerRules {
    /// Lowest block height a transaction may declare when included at `block_num`
    pub fn min_block_height(&self, block_num: u64) -> u64 {
        block_num.saturating_sub(self.config.redacted_window_size)
    }

    /// Declared height of `transaction` is within the window of a block at `block_num`
    pub fn is_height_valid_for(&self, transaction: &Transaction, block_num: u64) -> bool {
        let height = transaction.content.block_height;
        self.min_block_height(block_num) <= height && height <= block_num
    }

    /// Checks `transaction` against the ledger rules. `transactions` is the pool content.
    pub fn verify_transaction(
        &self,
        transaction: &Transaction,
        transactions: &TransactionMap,
    ) -> PoolResult<()> {
        let content = &transaction.content;
        let last_block_num = self.block_store.get_last_block_num();
        let synchronizing = self.status.is_synchronizing();

        if last_block_num < 1 && content.tx_type == TransactionType::Genesis {
            return Ok(());
        }
        if last_block_num < MIN_TRANSACTION_CHAIN_HEIGHT {
            return Err(PoolError::ChainTooShort(last_block_num));
        }
        if content.tx_type == TransactionType::Genesis {
            return Err(PoolError::GenesisRefused(last_block_num));
        }

        if content.version > self.config.max_transaction_version {
            return Err(PoolError::UnsupportedVersion(content.version));
        }
        if content.version < 2 && self.block_store.get_last_block_version() >= BLOCK_VERSION_3 {
            return Err(PoolError::UnsupportedVersion(content.version));
        }

        let min_height = self.min_block_height(last_block_num);
        let max_height = std::cmp::max(
            last_block_num + TRANSACTION_FUTURE_HEIGHT_TOLERANCE,
            self.status.highest_network_block() + TRANSACTION_FUTURE_HEIGHT_TOLERANCE,
        );
        if content.block_height == 0
            || content.block_height < min_height
            || content.block_height > max_height
        {
            return Err(PoolError::InvalidBlockHeight {
                height: content.block_height,
                min: min_height,
                max: max_height,
            });
        }

        if content.amount.is_zero() && !content.tx_type.allows_zero_amount() {
            return Err(PoolError::ZeroAmount);
        }

        if content.tx_type.is_multisig() {
            self.verify_multisig(transaction, transactions)?;
        }

        if transactions.contains_key(&transaction.id) {
            return Err(PoolError::Duplicate(transaction.id.clone()));
        }
        if !transaction.verify_checksum() {
            return Err(PoolError::ChecksumMismatch);
        }

        for ((nonce, _), (address, value)) in content
            .from_list
            .iter()
            .zip(transaction.from_addresses())
        {
            if nonce.as_slice() != [0u8] && nonce.len() != MAX_ADDRESS_NONCE_LENGTH {
                return Err(PoolError::InvalidNonce);
            }
            if synchronizing || content.tx_type.is_network_generated() {
                continue;
            }
            if !matches!(
                content.tx_type,
                TransactionType::ChangeMultisigWallet | TransactionType::MultisigAddTxSignature
            ) && content.to_list.iter().any(|(to, _)| to == &address)
            {
                return Err(PoolError::SameAddress(address));
            }
            let wallet = self.wallet_state.get_wallet(&address, false);
            let adds_signer = matches!(
                transaction.multisig().map(|payload| &payload.operation),
                Some(MultisigOperation::AddSigner { .. })
            );
            let expected_type = if content.tx_type.is_multisig() && !adds_signer {
                Some(WalletType::Multisig)
            } else if content.tx_type.is_multisig() {
                None
            } else {
                Some(WalletType::Normal)
            };
            if expected_type.map_or(false, |expected| wallet.wallet_type != expected) {
                return Err(PoolError::WrongWalletType(address));
            }
            if wallet.balance < value {
                return Err(PoolError::InsufficientBalance(address, value));
            }
        }

        let total_from = transaction.total_from().ok_or(PoolError::InputMismatch)?;
        if content.amount.checked_add(content.fee) != Some(total_from) {
            return Err(PoolError::InputMismatch);
        }
        if let Some((address, _)) = content
            .to_list
            .iter()
            .find(|(address, _)| !address.validate_checksum())
        {
            return Err(PoolError::InvalidRecipient(address.clone()));
        }
        if transaction.total_to() != Some(content.amount) {
            return Err(PoolError::OutputMismatch);
        }

        match content.tx_type {
            TransactionType::PoWSolution => {
                if !synchronizing {
                    self.verify_pow(transaction, None, true)?;
                }
            }
            TransactionType::Genesis | TransactionType::StakingReward => {}
            _ => {
                let minimum = transaction.minimum_fee(self.config.transaction_price);
                if content.fee < minimum {
                    return Err(PoolError::FeeTooLow {
                        fee: content.fee,
                        minimum,
                    });
                }
            }
        }
        if matches!(
            content.tx_type,
            TransactionType::Genesis | TransactionType::StakingReward
        ) {
            return Ok(());
        }

        let public_key = match transaction.multisig() {
            Some(payload) => {
                if payload.signer_nonce.len() > MAX_ADDRESS_NONCE_LENGTH {
                    return Err(PoolError::InvalidMultisig(
                        "signer nonce too long".to_string(),
                    ));
                }
                payload.signer_pub_key
            }
            None => {
                let primary = transaction.primary_address();
                match self.wallet_state.get_wallet(&primary, false).public_key {
                    Some(key) => key,
                    None => *content
                        .sender
                        .public_key()
                        .ok_or(PoolError::MissingPublicKey)?,
                }
            }
        };
        if !transaction.verify_signature(&public_key) {
            return Err(PoolError::InvalidSignature);
        }

        self.check_premine(transaction, false)
    }

    /// Structural and signer checks of the multisig transaction types
    fn verify_multisig(
        &self,
        transaction: &Transaction,
        transactions: &TransactionMap,
    ) -> PoolResult<()> {
        let content = &transaction.content;
        if content.from_list.len() != 1 {
            return Err(PoolError::InvalidMultisig(
                "exactly one input is expected".to_string(),
            ));
        }
        let payload = transaction
            .multisig()
            .ok_or_else(|| PoolError::InvalidMultisig("missing payload".to_string()))?;

        if content.tx_type == TransactionType::MultisigAddTxSignature {
            let orig_tx_id = payload
                .orig_tx_id()
                .ok_or_else(|| PoolError::InvalidMultisig("missing origin".to_string()))?;
            let length = orig_tx_id.as_str().len();
            if !(MIN_ORIGIN_TRANSACTION_ID_LENGTH..=MAX_ORIGIN_TRANSACTION_ID_LENGTH)
                .contains(&length)
            {
                return Err(PoolError::InvalidMultisig(format!(
                    "invalid origin id {}",
                    orig_tx_id
                )));
            }
            match transactions.get(orig_tx_id) {
                Some(Some(origin))
                    if origin.applied == 0
                        && matches!(
                            origin.content.tx_type,
                            TransactionType::MultisigTX | TransactionType::ChangeMultisigWallet
                        ) => {}
                _ => {
                    return Err(PoolError::InvalidMultisig(format!(
                        "origin {} is unknown, applied or not a multisig transaction",
                        orig_tx_id
                    )))
                }
            }
        }

        if self.status.is_synchronizing() {
            return Ok(());
        }
        let Some((address, _)) = transaction.from_addresses().into_iter().next() else {
            return Err(PoolError::InvalidMultisig("missing input".to_string()));
        };
        let wallet = self.wallet_state.get_wallet(&address, false);
        if let MultisigOperation::AddSigner { address: new_signer } = &payload.operation {
            if wallet.is_valid_signer(new_signer) {
                return Err(PoolError::InvalidMultisig(format!(
                    "{} is already a signer of {}",
                    new_signer, address
                )));
            }
        }
        let signer = payload.signer_address();
        if !wallet.is_valid_signer(&signer) {
            return Err(PoolError::InvalidMultisig(format!(
                "{} cannot sign for {}",
                signer, address
            )));
        }
        let adds_signer = matches!(payload.operation, MultisigOperation::AddSigner { .. });
        if wallet.wallet_type != WalletType::Multisig && !adds_signer {
            return Err(PoolError::WrongWalletType(address));
        }
        Ok(())
    }

    /// Premine addresses may not spend below their vesting cap
    pub fn check_premine(&self, transaction: &Transaction, snapshot: bool) -> PoolResult<()> {
        let last_block_num = self.block_store.get_last_block_num();
        if last_block_num > PREMINE_VESTING_END_HEIGHT {
            return Ok(());
        }
        let primary = transaction.primary_address();
        if !PREMINE_ADDRESSES.contains(&primary) {
            return Ok(());
        }
        let locked = PREMINE_VESTING_SCHEDULE
            .iter()
            .find(|(limit, _)| last_block_num < *limit)
            .and_then(|(_, units)| Amount::from_units(*units))
            .unwrap_or_else(Amount::zero);
        let needed = transaction
            .content
            .amount
            .checked_add(transaction.content.fee)
            .and_then(|spent| spent.checked_add(locked))
            .ok_or(PoolError::PremineLocked)?;
        if self.wallet_state.get_wallet(&primary, snapshot).balance < needed {
            return Err(PoolError::PremineLocked);
        }
        Ok(())
    }

    /// Checks a PoW solution against the block it solves.
    ///
    /// `block_version` is the version of the block including the solution, the
    /// last block of the chain if `None`. With `verify` false, or if the
    /// solution is already known to be valid, the nonce itself is not hashed.
    pub fn verify_pow(
        &self,
        transaction: &Transaction,
        block_version: Option<u32>,
        verify: bool,
    ) -> PoolResult<()> {
        let Some((target, nonce)) = transaction.pow_solution() else {
            return Err(PoolError::InvalidPow("missing solution payload".to_string()));
        };
        let last_block_num = self.block_store.get_last_block_num();
        if target > last_block_num {
            return Err(PoolError::InvalidPow(format!(
                "block #{} is ahead of the chain",
                target
            )));
        }
        let block_version =
            block_version.unwrap_or_else(|| self.block_store.get_last_block_version());
        if block_version >= BLOCK_VERSION_3
            && target + self.config.redacted_window_size
                < last_block_num + POW_SOLUTION_WINDOW_MARGIN
        {
            return Err(PoolError::InvalidPow(format!(
                "block #{} is too old to be solved",
                target
            )));
        }
        let block = self
            .block_store
            .get_block(target, true)
            .ok_or_else(|| PoolError::InvalidPow(format!("block #{} is unknown", target)))?;
        if block.is_solved() {
            return Err(PoolError::InvalidPow(format!(
                "block #{} is already solved",
                target
            )));
        }

        let trusted = !verify
            || transaction.pow_verified
            || (transaction.from_local_storage && !self.config.full_storage_data_verification);
        if trusted {
            return Ok(());
        }
        if !verify_nonce(
            self.hasher.as_ref(),
            nonce,
            &block.checksum,
            &transaction.primary_address(),
            block.difficulty,
            PowVersion::for_block_version(block.version),
        ) {
            return Err(PoolError::InvalidPow(format!(
                "nonce does not solve block #{}",
                target
            )));
        }
        Ok(())
    }
}
