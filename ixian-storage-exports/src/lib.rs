// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Block and transaction storage seen by the node core.
//!
//! The chain keeps the most recent blocks in memory and archives every block
//! and applied transaction. Only the traits are consumed by the workers, the
//! in-memory implementations back the standalone node and the tests.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod block_store;
mod error;
mod transaction_storage;

pub use block_store::{BlockStore, InMemoryBlockStore};
pub use error::{StorageError, StorageResult};
pub use transaction_storage::{InMemoryTransactionStorage, TransactionStorage};

#[cfg(any(test, feature = "test-exports"))]
pub use block_store::MockBlockStore;
#[cfg(any(test, feature = "test-exports"))]
pub use transaction_storage::MockTransactionStorage;
