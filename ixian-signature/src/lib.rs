// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! ed25519 keys and signatures over content hashes
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod error;
mod signature_impl;

pub use error::IxianSignatureError;
pub use signature_impl::{
    KeyPair, PublicKey, Signature, PUBLIC_KEY_SIZE_BYTES, SECRET_KEY_SIZE_BYTES,
    SIGNATURE_SIZE_BYTES,
};
