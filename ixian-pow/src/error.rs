// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// pow result
pub type PowResult<T, E = PowError> = core::result::Result<T, E>;

/// pow error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum PowError {
    /// invalid nonce: {0}
    InvalidNonce(String),
    /// hashing error: {0}
    HashingError(String),
}

impl From<argon2::Error> for PowError {
    fn from(err: argon2::Error) -> Self {
        PowError::HashingError(err.to_string())
    }
}
