// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// hash related errors
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum IxianHashError {
    /// parsing error : {0}
    ParsingError(String),
}
