// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::PowResult;
use crate::proof_of_work::PowCost;
use argon2::{Algorithm, Argon2, ParamsBuilder, Version};

/// Size of a proof of work hash
pub const POW_HASH_SIZE_BYTES: usize = 32;

/// Memory hard hash function the proof of work is computed with
pub trait PowHasher: Send + Sync {
    /// Hashes `password` salted with `salt` under the given cost
    fn hash(
        &self,
        password: &[u8],
        salt: &[u8],
        cost: PowCost,
    ) -> PowResult<[u8; POW_HASH_SIZE_BYTES]>;
}

/// Argon2id, version 0x13
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2PowHasher;

impl PowHasher for Argon2PowHasher {
    fn hash(
        &self,
        password: &[u8],
        salt: &[u8],
        cost: PowCost,
    ) -> PowResult<[u8; POW_HASH_SIZE_BYTES]> {
        let params = ParamsBuilder::new()
            .m_cost(cost.memory_kib)
            .t_cost(cost.iterations)
            .p_cost(cost.parallelism)
            .output_len(POW_HASH_SIZE_BYTES)
            .build()?;
        let argon2 = Argon2::new_with_secret(&[], Algorithm::Argon2id, Version::V0x13, params)?;
        let mut out = [0u8; POW_HASH_SIZE_BYTES];
        argon2.hash_password_into(password, salt, &mut out)?;
        Ok(out)
    }
}
