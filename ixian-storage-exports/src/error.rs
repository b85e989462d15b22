// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// storage result
pub type StorageResult<T, E = StorageError> = core::result::Result<T, E>;

/// storage error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// block #{got} does not follow the last block #{expected_after}
    NotNextBlock {
        /// last block of the chain
        expected_after: u64,
        /// offered block
        got: u64,
    },
    /// block #{0} does not chain with the last block checksum
    ChecksumMismatch(u64),
}
