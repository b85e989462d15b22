// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Chain synchronization interface.
//!
//! The sync engine catches the local chain up with the height announced by
//! the peers: it requests the missing blocks, rolls them forward in order
//! through the `BlockProcessor`, downloads the wallet state in chunks when the
//! node does not keep the full history, and rolls back to a saved wallet state
//! when progress stalls.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod block_processor;
mod config;
mod controller_traits;
mod error;
mod types;

pub use block_processor::BlockProcessor;
pub use config::SyncConfig;
pub use controller_traits::{SyncController, SyncManager};
pub use error::{SyncError, SyncResult};
pub use types::{
    BlockVerifyStatus, DltStatus, SyncChannels, SyncProgress, SyncState, WalletStateHeader,
};

#[cfg(any(test, feature = "test-exports"))]
pub use block_processor::MockBlockProcessor;
#[cfg(any(test, feature = "test-exports"))]
pub use controller_traits::MockSyncController;

/// Test utils
#[cfg(feature = "test-exports")]
pub mod test_exports;
