// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// models result
pub type ModelsResult<T, E = ModelsError> = core::result::Result<T, E>;

/// models error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum ModelsError {
    /// Serialization error: {0}
    SerializeError(String),
    /// Deserialization error: {0}
    DeserializeError(String),
    /// ixian_hash error: {0}
    HashError(#[from] ixian_hash::IxianHashError),
    /// ixian_signature error: {0}
    SignatureError(#[from] ixian_signature::IxianSignatureError),
    /// amount parse error: {0}
    AmountParseError(String),
    /// address parse error: {0}
    AddressParseError(String),
    /// checked operation error: {0}
    CheckedOperationError(String),
    /// payload does not match transaction type {0}: {1}
    InvalidPayload(String, String),
    /// Amount overflow
    AmountOverflowError,
    /// duplicate {0} entry
    DuplicateEntry(String),
}

impl From<ixian_serialization::SerializeError> for ModelsError {
    fn from(err: ixian_serialization::SerializeError) -> Self {
        ModelsError::SerializeError(err.to_string())
    }
}
