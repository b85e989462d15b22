// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Content hashes used for block, transaction and wallet-state checksums.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

pub use error::IxianHashError;
pub use hash::{sha512_sq_trunc, Hash, HashDeserializer, HashSerializer, HASH_SIZE_BYTES};

mod error;
mod hash;
