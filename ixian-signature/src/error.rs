// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// errors related to keys and signatures
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum IxianSignatureError {
    /// parsing error : {0}
    ParsingError(String),
    /// signature error : {0}
    SignatureError(String),
}
