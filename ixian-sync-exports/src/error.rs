// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use ixian_ledger_exports::LedgerError;
use ixian_storage_exports::StorageError;
use ixian_time::TimeError;
use thiserror::Error;

/// sync result
pub type SyncResult<T, E = SyncError> = core::result::Result<T, E>;

/// sync error
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum SyncError {
    /// storage error: {0}
    StorageError(#[from] StorageError),
    /// ledger error: {0}
    LedgerError(#[from] LedgerError),
    /// time error: {0}
    TimeError(#[from] TimeError),
    /// block #{0} was rejected while rolling forward
    BlockRejected(u64),
}
