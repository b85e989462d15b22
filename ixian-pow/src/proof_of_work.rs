// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::hash_target::{ceiling_from_difficulty, validate_hash};
use crate::hasher::PowHasher;
use crate::nonce::{decode_nonce, NonceExpander};
use ixian_hash::Hash;
use ixian_models::config::SUPERBLOCK_BLOCK_VERSION;
use ixian_models::Address;
use tracing::debug;

/// Length nonces are expanded to under `PowVersion::V3`
pub const EXPANDED_NONCE_SIZE_BYTES: usize = 234_236;

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowCost {
    /// passes over memory
    pub iterations: u32,
    /// memory size in KiB
    pub memory_kib: u32,
    /// lanes
    pub parallelism: u32,
}

/// Proof of work rules, selected by the version of the block being solved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowVersion {
    /// raw nonce, light cost
    V2,
    /// expanded nonce, doubled cost
    V3,
}

impl PowVersion {
    /// Rules applying to blocks of `block_version`
    pub fn for_block_version(block_version: u32) -> Self {
        if block_version < SUPERBLOCK_BLOCK_VERSION {
            PowVersion::V2
        } else {
            PowVersion::V3
        }
    }

    /// Argon2 cost of this version
    pub fn cost(&self) -> PowCost {
        match self {
            PowVersion::V2 => PowCost {
                iterations: 1,
                memory_kib: 1024,
                parallelism: 2,
            },
            PowVersion::V3 => PowCost {
                iterations: 2,
                memory_kib: 2048,
                parallelism: 2,
            },
        }
    }

    /// Length the nonce is expanded to before hashing, if any
    pub fn expanded_nonce_length(&self) -> Option<usize> {
        match self {
            PowVersion::V2 => None,
            PowVersion::V3 => Some(EXPANDED_NONCE_SIZE_BYTES),
        }
    }
}

/// Hashed data of a solution: the block checksum followed by the solver address
pub fn challenge(block_checksum: &Hash, solver_address: &Address) -> Vec<u8> {
    let mut challenge =
        Vec::with_capacity(block_checksum.to_bytes().len() + solver_address.to_bytes().len());
    challenge.extend_from_slice(block_checksum.to_bytes());
    challenge.extend_from_slice(solver_address.to_bytes());
    challenge
}

/// Checks that `nonce` solves the block of checksum `block_checksum` for `solver_address`.
///
/// The caller looks the block up: a missing block is a rejection it handles.
pub fn verify_nonce(
    hasher: &dyn PowHasher,
    nonce: &str,
    block_checksum: &Hash,
    solver_address: &Address,
    difficulty: u64,
    version: PowVersion,
) -> bool {
    let nonce_bytes = match decode_nonce(nonce) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("rejected pow nonce: {}", err);
            return false;
        }
    };
    let challenge = challenge(block_checksum, solver_address);
    let mut expander = NonceExpander::new();
    let salt = match version.expanded_nonce_length() {
        Some(length) => expander.expand(&nonce_bytes, length),
        None => nonce_bytes.as_slice(),
    };
    match hasher.hash(&challenge, salt, version.cost()) {
        Ok(hash) => validate_hash(&hash, &ceiling_from_difficulty(difficulty)),
        Err(err) => {
            debug!("could not hash pow nonce {}: {}", nonce, err);
            false
        }
    }
}
