// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use ixian_models::ModelsError;
use ixian_pow::PowError;
use ixian_time::TimeError;
use thiserror::Error;

/// miner result
pub type MinerResult<T, E = MinerError> = core::result::Result<T, E>;

/// miner error
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum MinerError {
    /// models error: {0}
    ModelsError(#[from] ModelsError),
    /// pow error: {0}
    PowError(#[from] PowError),
    /// time error: {0}
    TimeError(#[from] TimeError),
    /// block #{0} not found
    BlockNotFound(u64),
    /// the pool refused the solution for block #{0}
    SolutionRefused(u64),
}
