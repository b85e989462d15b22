// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::{PowError, PowResult};
use ixian_models::config::{MAX_NONCE_HEX_LENGTH, MIN_NONCE_HEX_LENGTH};
use rand::RngCore;

/// Size of the nonces produced by the mining threads
pub const MINING_NONCE_SIZE_BYTES: usize = 64;

/// Filler byte of expanded nonces
const EXPANDED_NONCE_FILLER: u8 = 0x23;

/// Renders nonce bytes the way they travel in solution transactions: lowercase hex
pub fn encode_nonce(nonce: &[u8]) -> String {
    hex::encode(nonce)
}

/// Parses a hex nonce, enforcing the accepted length bounds
pub fn decode_nonce(nonce: &str) -> PowResult<Vec<u8>> {
    if nonce.len() < MIN_NONCE_HEX_LENGTH || nonce.len() > MAX_NONCE_HEX_LENGTH {
        return Err(PowError::InvalidNonce(format!(
            "nonce length {} out of bounds",
            nonce.len()
        )));
    }
    hex::decode(nonce).map_err(|err| PowError::InvalidNonce(err.to_string()))
}

/// Reusable buffer padding short nonces up to a fixed length with a filler byte
#[derive(Debug, Default)]
pub struct NonceExpander {
    buffer: Vec<u8>,
    last_nonce_length: usize,
}

impl NonceExpander {
    /// Empty expander, the buffer is allocated on first use
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `nonce` at the start of a `length` byte buffer filled with `0x23`.
    ///
    /// Only the bytes written by the previous call are reset.
    pub fn expand(&mut self, nonce: &[u8], length: usize) -> &[u8] {
        if self.buffer.len() != length {
            self.buffer = vec![EXPANDED_NONCE_FILLER; length];
            self.last_nonce_length = 0;
        }
        let nonce = &nonce[..nonce.len().min(length)];
        self.buffer[..nonce.len()].copy_from_slice(nonce);
        if self.last_nonce_length > nonce.len() {
            self.buffer[nonce.len()..self.last_nonce_length].fill(EXPANDED_NONCE_FILLER);
        }
        self.last_nonce_length = nonce.len();
        &self.buffer
    }
}

/// Scratch state owned by a single mining thread
#[derive(Debug, Default)]
pub struct MinerWorkerContext {
    current_nonce: Option<Vec<u8>>,
    /// expansion buffer of the thread
    pub expander: NonceExpander,
}

impl MinerWorkerContext {
    /// Fresh context, the nonce sequence is seeded on first use
    pub fn new() -> Self {
        Self::default()
    }

    /// Next nonce of this thread's sequence.
    ///
    /// The sequence starts at random bytes and is then incremented as a big-endian
    /// counter. The carry stops before the leftmost byte so the counter never wraps
    /// into another thread's range.
    pub fn next_nonce(&mut self) -> &[u8] {
        let nonce = self.current_nonce.get_or_insert_with(|| {
            let mut seed = vec![0u8; MINING_NONCE_SIZE_BYTES];
            rand::thread_rng().fill_bytes(&mut seed);
            seed
        });
        for pos in (1..nonce.len()).rev() {
            if nonce[pos] < 0xff {
                nonce[pos] += 1;
                break;
            }
            nonce[pos] = 0;
        }
        nonce
    }

    #[cfg(test)]
    fn seed(&mut self, nonce: Vec<u8>) {
        self.current_nonce = Some(nonce);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_hex_bounds() {
        assert_eq!(decode_nonce("0aff").unwrap(), vec![0x0a, 0xff]);
        assert!(decode_nonce("").is_err());
        assert!(decode_nonce("abc").is_err());
        assert!(decode_nonce("zz").is_err());
        assert!(decode_nonce(&"00".repeat(64)).is_ok());
        assert!(decode_nonce(&"00".repeat(65)).is_err());
        assert_eq!(encode_nonce(&[0x0a, 0xff]), "0aff");
    }

    #[test]
    fn test_next_nonce_increments_big_endian() {
        let mut context = MinerWorkerContext::new();
        context.seed(vec![5, 0, 0xff]);
        assert_eq!(context.next_nonce(), &[5, 1, 0]);
        assert_eq!(context.next_nonce(), &[5, 1, 1]);

        context.seed(vec![5, 0xff, 0xff]);
        assert_eq!(context.next_nonce(), &[5, 0, 0]);
    }

    #[test]
    fn test_random_seed_length() {
        let mut context = MinerWorkerContext::new();
        let first = context.next_nonce().to_vec();
        assert_eq!(first.len(), MINING_NONCE_SIZE_BYTES);
        assert_ne!(context.next_nonce(), first.as_slice());
    }

    #[test]
    fn test_expand_clears_previous_nonce() {
        let mut expander = NonceExpander::new();
        let expanded = expander.expand(&[1, 2, 3, 4], 8).to_vec();
        assert_eq!(expanded, vec![1, 2, 3, 4, 0x23, 0x23, 0x23, 0x23]);
        let expanded = expander.expand(&[9], 8).to_vec();
        assert_eq!(expanded, vec![9, 0x23, 0x23, 0x23, 0x23, 0x23, 0x23, 0x23]);
    }
}
