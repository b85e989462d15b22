// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_miner_exports::BlockSearchMode;
use ixian_models::Block;
use rand::seq::SliceRandom;
use rand::Rng;

/// Oldest blocks of a full window left out of the search
const FULL_WINDOW_BLOCK_OFFSET: u64 = 1000;

/// Upper bound of the easiest blocks skipped by `RandomLowestDifficulty`
const RANDOM_SKIP_RANGE: usize = 500;

/// Number of the oldest retained blocks not considered for mining
pub(crate) fn candidate_offset(block_count: u64, redacted_window_size: u64) -> u64 {
    if block_count >= redacted_window_size {
        FULL_WINDOW_BLOCK_OFFSET
    } else {
        1
    }
}

/// Picks the block to solve among `blocks`, skipping solved ones and the ones in `solved`
pub(crate) fn select_block<R: Rng>(
    mut blocks: Vec<Block>,
    search_mode: BlockSearchMode,
    solved: &[u64],
    rng: &mut R,
) -> Option<Block> {
    blocks.retain(|block| !block.is_solved());
    match search_mode {
        BlockSearchMode::LowestDifficulty => blocks.sort_by_key(|block| block.difficulty),
        BlockSearchMode::RandomLowestDifficulty => {
            blocks.sort_by_key(|block| block.difficulty);
            let skip = rng.gen_range(0..RANDOM_SKIP_RANGE).min(blocks.len());
            blocks.drain(..skip);
        }
        BlockSearchMode::LatestBlock => {
            blocks.sort_by(|left, right| right.block_num.cmp(&left.block_num))
        }
        BlockSearchMode::Random => blocks.shuffle(rng),
    }
    blocks
        .into_iter()
        .find(|block| !solved.contains(&block.block_num))
}
