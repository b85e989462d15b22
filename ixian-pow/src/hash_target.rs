// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::hasher::POW_HASH_SIZE_BYTES;
use num::{BigUint, Zero};

/// Number of meaningful leading bytes of a hash ceiling, the rest is `0xFF`
pub const HASH_CEILING_SIZE_BYTES: usize = 10;

/// Position of the difficulty bytes in a little-endian 32 byte ceiling
const DIFFICULTY_OFFSET_LE: usize = 22;

/// Difficulty target used when the expected hash count is unknown
const DEFAULT_EXPECTED_HASHES: u64 = 1000;

/// Largest 256 bit value, `2^256 - 1`
pub fn max_hash_value() -> BigUint {
    BigUint::from_bytes_be(&[0xff; POW_HASH_SIZE_BYTES])
}

/// Converts a difficulty into the leading bytes of the highest passing hash.
///
/// Two zero bytes followed by the bitwise inverse of the difficulty, most significant byte first.
/// ```
/// # use ixian_pow::ceiling_from_difficulty;
/// assert_eq!(
///     ceiling_from_difficulty(0x0102030405060708),
///     [0, 0, 0xfe, 0xfd, 0xfc, 0xfb, 0xfa, 0xf9, 0xf8, 0xf7]
/// );
/// ```
pub fn ceiling_from_difficulty(difficulty: u64) -> [u8; HASH_CEILING_SIZE_BYTES] {
    let mut ceiling = [0u8; HASH_CEILING_SIZE_BYTES];
    for (i, byte) in difficulty.to_be_bytes().iter().enumerate() {
        ceiling[i + 2] = !byte;
    }
    ceiling
}

/// Full 32 byte ceiling, big-endian: the ceiling prefix followed by `0xFF` bytes
pub fn full_ceiling(difficulty: u64) -> [u8; POW_HASH_SIZE_BYTES] {
    let mut full = [0xffu8; POW_HASH_SIZE_BYTES];
    full[..HASH_CEILING_SIZE_BYTES].copy_from_slice(&ceiling_from_difficulty(difficulty));
    full
}

/// Number of hashes a miner is expected to compute before finding a solution
pub fn expected_hashes_for_difficulty(difficulty: u64) -> BigUint {
    let ceiling = BigUint::from_bytes_be(&full_ceiling(difficulty));
    max_hash_value() / ceiling
}

/// Difficulty at which a solution is expected every `hashes` hashes.
///
/// Inverse of `expected_hashes_for_difficulty`, up to one unit of rounding.
/// Zero is treated as a thousand hashes.
pub fn difficulty_for_expected_hashes(hashes: &BigUint) -> u64 {
    let divisor = if hashes.is_zero() {
        BigUint::from(DEFAULT_EXPECTED_HASHES)
    } else {
        hashes.clone()
    };
    let target_ceiling = max_hash_value() / divisor;
    let mut bytes = target_ceiling.to_bytes_le();
    bytes.resize(POW_HASH_SIZE_BYTES, 0);

    let mut difficulty = [0u8; 8];
    for (dst, src) in difficulty
        .iter_mut()
        .zip(&bytes[DIFFICULTY_OFFSET_LE..DIFFICULTY_OFFSET_LE + 8])
    {
        *dst = !src;
    }
    u64::from_le_bytes(difficulty)
}

/// Returns true if `hash` is lower than or equal to the ceiling.
///
/// Hash bytes beyond the ceiling prefix are compared against `0xFF`.
/// Hashes shorter than 32 bytes never pass.
pub fn validate_hash(hash: &[u8], ceiling: &[u8; HASH_CEILING_SIZE_BYTES]) -> bool {
    if hash.len() < POW_HASH_SIZE_BYTES {
        return false;
    }
    for (i, byte) in hash.iter().enumerate() {
        let ceiling_byte = ceiling.get(i).copied().unwrap_or(0xff);
        if ceiling_byte > *byte {
            return true;
        }
        if ceiling_byte < *byte {
            return false;
        }
    }
    true
}
