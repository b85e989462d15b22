// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::LedgerResult;
use ixian_hash::Hash;
use ixian_models::{Address, Amount, Wallet, WalletStateChunk};
use ixian_signature::PublicKey;

/// Address to wallet mapping at the height of the last applied block.
///
/// Every accessor takes a `snapshot` flag: snapshot reads and writes go to a
/// scratch overlay that is discarded by `revert_snapshot`, so speculative block
/// application never touches the committed state.
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait WalletStateStore: Send + Sync {
    /// Wallet of `address`, an empty normal wallet if unknown
    fn get_wallet(&self, address: &Address, snapshot: bool) -> Wallet;

    /// Replaces the wallet stored at `wallet.id`
    fn set_wallet(&self, wallet: Wallet, snapshot: bool);

    /// Sets the balance of `address`
    fn set_balance(&self, address: &Address, balance: Amount, snapshot: bool);

    /// Records the owner key of `address`
    fn set_public_key(&self, address: &Address, public_key: PublicKey, snapshot: bool);

    /// Order independent checksum of the whole state
    fn checksum(&self, snapshot: bool) -> Hash;

    /// Starts a fresh snapshot overlay
    fn begin_snapshot(&self);

    /// Discards the snapshot overlay
    fn revert_snapshot(&self);

    /// Starts journaling committed writes so that a rejected block can be undone
    fn begin_transaction(&self, block_num: u64);

    /// Keeps the writes journaled since `begin_transaction`
    fn commit_transaction(&self);

    /// Undoes the writes journaled since `begin_transaction`
    fn revert_transaction(&self);

    /// Splits the state into chunks of `split` wallets, tagged with `block_num`
    fn get_chunks(&self, split: usize, block_num: u64) -> Vec<WalletStateChunk>;

    /// Bulk loads the wallets of a chunk
    fn set_chunk(&self, wallets: Vec<Wallet>) -> LedgerResult<()>;

    /// Drops every wallet
    fn clear(&self);

    /// Keeps a copy of the state as of `block_num`
    fn save_state(&self, block_num: u64);

    /// Restores the most recent copy saved at or below `block_num`, returns its height
    fn restore_state(&self, block_num: u64) -> LedgerResult<u64>;

    /// State format version
    fn version(&self) -> u32;

    /// Sets the state format version, received with wallet state chunks
    fn set_version(&self, version: u32);

    /// Number of stored wallets
    fn wallet_count(&self) -> u64;
}
