// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Data model of the node: amounts, addresses, transactions, blocks and wallets.

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

pub use address::Address;
pub use amount::Amount;
pub use block::{Block, BlockSignature};
pub use error::{ModelsError, ModelsResult};
pub use status::NodeStatus;
pub use transaction::{
    MultisigOperation, MultisigPayload, Transaction, TransactionContent, TransactionId,
    TransactionPayload, TransactionSender, TransactionType,
};
pub use wallet::{Wallet, WalletStateChunk, WalletType};

/// wallet addresses
pub mod address;
/// fixed-point coin amounts
pub mod amount;
/// blocks and their signatures
pub mod block;
/// hard-coded consensus values
pub mod config;
/// models error
pub mod error;
/// flags shared between the node components
pub mod status;
/// transactions and their payloads
pub mod transaction;
/// wallet state entries
pub mod wallet;
