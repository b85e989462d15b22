// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Miner interface.
//!
//! The miner picks unsolved blocks of the retained window, searches nonces for
//! them on a configurable number of threads and submits the solutions it finds
//! to the pool as `PoWSolution` transactions.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod config;
mod controller_traits;
mod error;
mod types;

pub use config::MinerConfig;
pub use controller_traits::{MinerController, MinerManager};
pub use error::{MinerError, MinerResult};
pub use types::{BlockSearchMode, MinerChannels, MinerStats};

#[cfg(any(test, feature = "test-exports"))]
pub use controller_traits::MockMinerController;

/// Test utils
#[cfg(feature = "test-exports")]
pub mod test_exports;
