// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// ledger result
pub type LedgerResult<T, E = LedgerError> = core::result::Result<T, E>;

/// ledger error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// no wallet state saved at or below block #{0}
    NoSavedState(u64),
    /// invalid wallet state chunk: {0}
    InvalidChunk(String),
}
