// Copyright (c) 2022 MASSA LABS <info@massa.net>

/// hard-coded consensus values
pub mod constants;

pub use constants::*;
