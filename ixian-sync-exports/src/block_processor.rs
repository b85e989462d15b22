// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_models::Block;

use crate::BlockVerifyStatus;

/// Block validation and application, as provided by the block processor of the node
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait BlockProcessor: Send + Sync {
    /// Full verification of a block following the local chain.
    /// The wallet state checksum is not checked if `ignore_wallet_state`.
    fn verify_block(&self, block: &Block, ignore_wallet_state: bool) -> BlockVerifyStatus;

    /// Structure and checksum chaining only
    fn verify_block_basic(&self, block: &Block) -> BlockVerifyStatus;

    /// The block carries the signatures of enough validators
    fn verify_block_signatures(&self, block: &Block) -> bool;

    /// The signature freeze carried by the block matches the signatures of the block it freezes
    fn verify_signature_freeze_checksum(&self, block: &Block) -> bool;

    /// Applies the transactions of a verified block to the wallet state.
    /// Returns false if the block was rejected.
    fn apply_accepted_block(&self, block: &Block) -> bool;

    /// Resumes normal block processing once the node is synchronized
    fn resume_operation(&self);
}
