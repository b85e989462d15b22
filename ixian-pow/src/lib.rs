// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Proof of work primitives.
//!
//! A block is solved by finding a nonce whose Argon2id hash, keyed by the
//! block checksum and the solver address, falls under the ceiling derived
//! from the block difficulty. This crate holds the difficulty arithmetic,
//! the nonce handling of the mining threads, the hashing itself and the
//! mining reward schedule.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

pub use error::{PowError, PowResult};
pub use hash_target::{
    ceiling_from_difficulty, difficulty_for_expected_hashes, expected_hashes_for_difficulty,
    full_ceiling, max_hash_value, validate_hash, HASH_CEILING_SIZE_BYTES,
};
pub use hasher::{Argon2PowHasher, PowHasher, POW_HASH_SIZE_BYTES};
pub use nonce::{
    decode_nonce, encode_nonce, MinerWorkerContext, NonceExpander, MINING_NONCE_SIZE_BYTES,
};
pub use proof_of_work::{
    challenge, verify_nonce, PowCost, PowVersion, EXPANDED_NONCE_SIZE_BYTES,
};
pub use reward::calculate_reward_for_block;

mod error;
mod hash_target;
mod hasher;
mod nonce;
mod proof_of_work;
mod reward;
