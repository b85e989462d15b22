// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use ixian_models::{Address, Amount, TransactionId};
use thiserror::Error;

/// pool result
pub type PoolResult<T, E = PoolError> = core::result::Result<T, E>;

/// Reason a transaction was refused by the pool
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// no transaction accepted below block #{0}
    ChainTooShort(u64),
    /// genesis transaction refused at block #{0}
    GenesisRefused(u64),
    /// unsupported transaction version {0}
    UnsupportedVersion(u32),
    /// block height {height} outside of [{min}, {max}]
    InvalidBlockHeight {
        /// declared height
        height: u64,
        /// lowest accepted height
        min: u64,
        /// highest accepted height
        max: u64,
    },
    /// zero amount
    ZeroAmount,
    /// invalid multisig transaction: {0}
    InvalidMultisig(String),
    /// transaction {0} is already in the pool
    Duplicate(TransactionId),
    /// checksum mismatch
    ChecksumMismatch,
    /// invalid input nonce
    InvalidNonce,
    /// {0} is both sender and recipient
    SameAddress(Address),
    /// wallet {0} cannot send this transaction type
    WrongWalletType(Address),
    /// wallet {0} cannot cover {1}
    InsufficientBalance(Address, Amount),
    /// inputs do not sum up to amount plus fee
    InputMismatch,
    /// outputs do not sum up to amount
    OutputMismatch,
    /// invalid recipient address {0}
    InvalidRecipient(Address),
    /// invalid pow solution: {0}
    InvalidPow(String),
    /// fee {fee} is below the minimum {minimum}
    FeeTooLow {
        /// paid fee
        fee: Amount,
        /// required fee
        minimum: Amount,
    },
    /// missing public key
    MissingPublicKey,
    /// invalid signature
    InvalidSignature,
    /// premine vesting cap reached
    PremineLocked,
}

/// Reason a whole block was rejected by the ledger rules
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockRejected {
    /// transaction {0} is missing
    MissingTransaction(TransactionId),
    /// transaction {id} was already applied in block #{applied}
    AlreadyApplied {
        /// transaction
        id: TransactionId,
        /// block that applied it
        applied: u64,
    },
    /// staking transaction {id} targets block #{target}
    StakingTarget {
        /// transaction
        id: TransactionId,
        /// referenced block
        target: u64,
    },
    /// staking transaction {0} failed
    StakingFailed(TransactionId),
    /// staking transactions {0:?} are not in the pool
    MissingStaking(Vec<TransactionId>),
    /// multisig transaction {0} could not be executed
    MultisigNotExecuted(TransactionId),
    /// {0} transactions failed
    FailedTransactions(usize),
    /// transaction {0} is still unapplied
    Unapplied(TransactionId),
}
