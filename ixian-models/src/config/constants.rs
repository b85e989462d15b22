// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Consensus values shared with the rest of the network.
//!
//! Changing any of these is a breaking change: the peers apply the same rules
//! and a diverging value forks the node off the network.
//! Worker configs take their defaults from here, so tests can shrink windows
//! without touching these.

use crate::address::Address;
use std::str::FromStr;

/// Fixed-point factor of `Amount`: 8 decimals
pub const AMOUNT_DECIMAL_FACTOR: u64 = 100_000_000;

/// Number of most recent blocks a node retains
pub const REDACTED_WINDOW_SIZE: u64 = 43_200;

/// Highest block version this build understands
pub const MAX_BLOCK_VERSION: u32 = 5;
/// Block version from which the wallet-state checksum may be deferred to superblocks
/// and from which PoW solutions use the expanded nonce
pub const SUPERBLOCK_BLOCK_VERSION: u32 = 5;
/// Block version from which wallet public keys are set before PoW handling
/// and transactions older than version 2 are refused
pub const BLOCK_VERSION_3: u32 = 3;
/// Block version from which duplicate PoW claims are rejected
pub const BLOCK_VERSION_2: u32 = 2;

/// Highest transaction version this build understands
pub const MAX_TRANSACTION_VERSION: u32 = 3;

/// Minimal chain height before non genesis transactions are accepted
pub const MIN_TRANSACTION_CHAIN_HEIGHT: u64 = 10;
/// How many blocks ahead of the known tip a transaction may declare
pub const TRANSACTION_FUTURE_HEIGHT_TOLERANCE: u64 = 5;
/// The oldest blocks of the redacted window that no longer accept PoW solutions
pub const POW_SOLUTION_WINDOW_MARGIN: u64 = 100;

/// Staking rewards are paid for the block this many heights below the including block
pub const STAKING_BLOCK_OFFSET: u64 = 6;
/// The signature freeze of a block is carried this many blocks later
pub const SIGNATURE_FREEZE_OFFSET: u64 = 5;
/// Prefix of staking reward transaction ids
pub const STAKING_TRANSACTION_ID_PREFIX: &str = "stk";

/// Mining rewards stop for blocks at or above this height
pub const MINING_REWARD_END_HEIGHT: u64 = 5_256_000;
/// Premine vesting caps are lifted above this height
pub const PREMINE_VESTING_END_HEIGHT: u64 = 5_256_000;
/// (exclusive height limit, locked whole units) of the premine vesting schedule,
/// the last entry applies to every height up to `PREMINE_VESTING_END_HEIGHT`
pub const PREMINE_VESTING_SCHEDULE: [(u64, u64); 5] = [
    (1_051_200, 900_000_000),
    (2_102_400, 800_000_000),
    (3_153_600, 600_000_000),
    (4_204_800, 400_000_000),
    (u64::MAX, 200_000_000),
];

/// Bounds of a hex encoded PoW nonce
pub const MIN_NONCE_HEX_LENGTH: usize = 1;
/// Bounds of a hex encoded PoW nonce
pub const MAX_NONCE_HEX_LENGTH: usize = 128;

/// Bounds of a multisig signer public key
pub const MIN_SIGNER_PUBLIC_KEY_LENGTH: usize = 32;
/// Bounds of a multisig signer public key
pub const MAX_SIGNER_PUBLIC_KEY_LENGTH: usize = 2500;
/// Largest accepted address nonce
pub const MAX_ADDRESS_NONCE_LENGTH: usize = 16;
/// Bounds of the origin transaction id referenced by a multisig signature
pub const MIN_ORIGIN_TRANSACTION_ID_LENGTH: usize = 10;
/// Bounds of the origin transaction id referenced by a multisig signature
pub const MAX_ORIGIN_TRANSACTION_ID_LENGTH: usize = 100;

/// Recipient of PoW solution transactions
pub const INFINIMINE_ADDRESS: &str = "1ixianinfinimine234234234234234234234234234242HP";

lazy_static::lazy_static! {
    /// Addresses whose spendable balance is capped by `PREMINE_VESTING_SCHEDULE`
    pub static ref PREMINE_ADDRESSES: [Address; 2] = [
        Address::from_str("13fiCRZHPqcCFvQvuggKEjDvFsVLmwoavaBw1ng5PdSKvCUGp")
            .expect("invalid hard-coded premine address"),
        Address::from_str("16LUmwUnU9M4Wn92nrvCStj83LDCRwvAaSio6Xtb3yvqqqCCz")
            .expect("invalid hard-coded premine address"),
    ];

    /// Parsed `INFINIMINE_ADDRESS`
    pub static ref INFINIMINE: Address =
        Address::from_str(INFINIMINE_ADDRESS).expect("invalid hard-coded infinimine address");
}
