// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Wallet state interface: the address to wallet mapping rebuilt by replaying blocks.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod config;
mod controller;
mod error;

pub use config::LedgerConfig;
pub use controller::WalletStateStore;
pub use error::{LedgerError, LedgerResult};

#[cfg(any(test, feature = "test-exports"))]
pub use controller::MockWalletStateStore;
