// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::{StorageError, StorageResult};
use ixian_models::Block;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// The local chain: a gap free window of the most recent blocks,
/// backed by an archive holding every block ever stored.
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait BlockStore: Send + Sync {
    /// Block at `block_num`, looked up in the archive as well if `allow_storage_read`
    fn get_block(&self, block_num: u64, allow_storage_read: bool) -> Option<Block>;

    /// Tip of the chain
    fn get_last_block(&self) -> Option<Block>;

    /// Height of the tip, 0 for an empty chain
    fn get_last_block_num(&self) -> u64;

    /// Version of the tip, 0 for an empty chain
    fn get_last_block_version(&self) -> u32;

    /// Oldest block kept in the window, 0 for an empty chain
    fn get_lowest_block_num(&self) -> u64;

    /// Number of blocks in the window
    fn count(&self) -> u64;

    /// Up to `count` blocks of the window, starting `offset` blocks above the oldest one
    fn get_blocks(&self, offset: u64, count: u64) -> Vec<Block>;

    /// Appends `block` on top of the chain, archiving it if `add_to_storage`
    fn append_block(&self, block: Block, add_to_storage: bool) -> StorageResult<()>;

    /// Removes the tip if it is `block_num`, from the archive too if `remove_from_storage`
    fn remove_block(&self, block_num: u64, remove_from_storage: bool) -> bool;

    /// Records which block paid the reward of `block_num`
    fn set_pow_field(&self, block_num: u64, pow_field: Option<u64>) -> bool;

    /// Merges the signatures of `block` into the stored copy of the same block.
    /// Signatures that did not come through the sync path are checked first.
    /// Returns true if a signature was added.
    fn refresh_signatures(&self, block: &Block, from_sync: bool) -> bool;

    /// Highest archived block, 0 if the archive is empty
    fn get_last_storage_block_num(&self) -> u64;

    /// Drops the blocks that fell out of a `window` sized window, returns how many
    fn redact(&self, window: u64) -> u64;
}

#[derive(Default)]
struct ChainState {
    blocks: BTreeMap<u64, Block>,
    archive: BTreeMap<u64, Block>,
}

/// `BlockStore` keeping everything in memory
#[derive(Default)]
pub struct InMemoryBlockStore {
    state: RwLock<ChainState>,
}

impl InMemoryBlockStore {
    /// Empty chain and archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Archives blocks without putting them on the chain, as a node restarting from disk would find them
    pub fn with_archive(blocks: impl IntoIterator<Item = Block>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write();
            for mut block in blocks {
                block.from_local_storage = true;
                state.archive.insert(block.block_num, block);
            }
        }
        store
    }
}

impl BlockStore for InMemoryBlockStore {
    fn get_block(&self, block_num: u64, allow_storage_read: bool) -> Option<Block> {
        let state = self.state.read();
        if let Some(block) = state.blocks.get(&block_num) {
            return Some(block.clone());
        }
        if allow_storage_read {
            return state.archive.get(&block_num).map(|block| {
                let mut block = block.clone();
                block.from_local_storage = true;
                block
            });
        }
        None
    }

    fn get_last_block(&self) -> Option<Block> {
        self.state
            .read()
            .blocks
            .last_key_value()
            .map(|(_, block)| block.clone())
    }

    fn get_last_block_num(&self) -> u64 {
        self.state
            .read()
            .blocks
            .last_key_value()
            .map_or(0, |(num, _)| *num)
    }

    fn get_last_block_version(&self) -> u32 {
        self.state
            .read()
            .blocks
            .last_key_value()
            .map_or(0, |(_, block)| block.version)
    }

    fn get_lowest_block_num(&self) -> u64 {
        self.state
            .read()
            .blocks
            .first_key_value()
            .map_or(0, |(num, _)| *num)
    }

    fn count(&self) -> u64 {
        self.state.read().blocks.len() as u64
    }

    fn get_blocks(&self, offset: u64, count: u64) -> Vec<Block> {
        self.state
            .read()
            .blocks
            .values()
            .skip(offset as usize)
            .take(count as usize)
            .cloned()
            .collect()
    }

    fn append_block(&self, block: Block, add_to_storage: bool) -> StorageResult<()> {
        let mut state = self.state.write();
        if let Some((last_num, last)) = state.blocks.last_key_value() {
            if block.block_num != last_num + 1 {
                return Err(StorageError::NotNextBlock {
                    expected_after: *last_num,
                    got: block.block_num,
                });
            }
            if block.last_block_checksum != last.checksum {
                return Err(StorageError::ChecksumMismatch(block.block_num));
            }
        }
        if add_to_storage {
            state.archive.insert(block.block_num, block.clone());
        }
        state.blocks.insert(block.block_num, block);
        Ok(())
    }

    fn remove_block(&self, block_num: u64, remove_from_storage: bool) -> bool {
        let mut state = self.state.write();
        match state.blocks.last_key_value() {
            Some((last_num, _)) if *last_num == block_num => {}
            _ => return false,
        }
        state.blocks.remove(&block_num);
        if remove_from_storage {
            state.archive.remove(&block_num);
        }
        true
    }

    fn set_pow_field(&self, block_num: u64, pow_field: Option<u64>) -> bool {
        let mut state = self.state.write();
        let mut found = false;
        if let Some(block) = state.blocks.get_mut(&block_num) {
            block.pow_field = pow_field;
            found = true;
        }
        if let Some(block) = state.archive.get_mut(&block_num) {
            block.pow_field = pow_field;
            found = true;
        }
        found
    }

    fn refresh_signatures(&self, block: &Block, from_sync: bool) -> bool {
        let mut state = self.state.write();
        let Some(local) = state.blocks.get_mut(&block.block_num) else {
            return false;
        };
        if local.checksum != block.checksum {
            return false;
        }
        let mut added = false;
        for signature in &block.signatures {
            if local.signatures.iter().any(|sig| sig.signer == signature.signer) {
                continue;
            }
            if !from_sync
                && signature
                    .signer
                    .verify_signature(&local.checksum, &signature.signature)
                    .is_err()
            {
                debug!(
                    "ignoring invalid signature of {} on block #{}",
                    signature.signer_address(),
                    block.block_num
                );
                continue;
            }
            local.signatures.push(signature.clone());
            added = true;
        }
        if added {
            let refreshed = local.clone();
            if let Some(archived) = state.archive.get_mut(&block.block_num) {
                archived.signatures = refreshed.signatures;
            }
        }
        added
    }

    fn get_last_storage_block_num(&self) -> u64 {
        self.state
            .read()
            .archive
            .last_key_value()
            .map_or(0, |(num, _)| *num)
    }

    fn redact(&self, window: u64) -> u64 {
        let mut state = self.state.write();
        let mut removed = 0;
        while state.blocks.len() as u64 > window {
            if state.blocks.pop_first().is_none() {
                break;
            }
            removed += 1;
        }
        removed
    }
}
