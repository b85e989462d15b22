// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// protocol result
pub type ProtocolResult<T, E = ProtocolError> = core::result::Result<T, E>;

/// protocol error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// invalid hello data: {0}
    InvalidHello(String),
    /// serialization error: {0}
    SerializeError(String),
}

impl From<ixian_serialization::SerializeError> for ProtocolError {
    fn from(err: ixian_serialization::SerializeError) -> Self {
        ProtocolError::SerializeError(err.to_string())
    }
}
