// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Transaction pool: the registry of known transactions and the ledger rules
//! deciding which of them may change the wallet state.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod channels;
mod config;
mod controller_traits;
mod error;

pub use channels::PoolChannels;
pub use config::PoolConfig;
pub use controller_traits::{PoolController, PoolManager};
pub use error::{BlockRejected, PoolError, PoolResult};

#[cfg(any(test, feature = "test-exports"))]
pub use controller_traits::MockPoolController;

/// Test utils
#[cfg(feature = "test-exports")]
pub mod test_exports;
