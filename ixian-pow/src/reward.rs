// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_models::Amount;

const YEAR: u64 = 1_051_200;

/// Mining reward paid for solving block `block_num`, shared by all its solvers.
///
/// The reward grows during the first, third and fifth years of the chain, is flat
/// during the second and grows slowly during the fourth. It is halved to account
/// for about half of the blocks being solved, and a base reward of 10 coins is added.
pub fn calculate_reward_for_block(block_num: u64) -> Amount {
    let units = if block_num < YEAR {
        block_num * 9 + 9
    } else if block_num < 2 * YEAR {
        YEAR * 9
    } else if block_num < 3 * YEAR {
        YEAR * 9 + (block_num - 2 * YEAR) * 9 + 9
    } else if block_num < 4 * YEAR {
        2 * YEAR * 9 + (block_num - 3 * YEAR) * 2 + 2
    } else if block_num < 5 * YEAR + 1 {
        2 * YEAR * 9 + YEAR * 2 + (block_num - 4 * YEAR) * 9 + 9
    } else {
        (3 * YEAR * 9 + YEAR * 2) / 2
    };
    Amount::from_raw((units / 2 + 10_000) * 100_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_reward_schedule() {
        assert_eq!(
            calculate_reward_for_block(0),
            Amount::from_str("10.004").unwrap()
        );
        assert_eq!(
            calculate_reward_for_block(YEAR),
            calculate_reward_for_block(2 * YEAR - 1)
        );
        assert_eq!(
            calculate_reward_for_block(YEAR).to_raw(),
            (YEAR * 9 / 2 + 10_000) * 100_000
        );
        assert_eq!(
            calculate_reward_for_block(3 * YEAR + 1).to_raw()
                - calculate_reward_for_block(3 * YEAR).to_raw(),
            100_000
        );
        assert_eq!(
            calculate_reward_for_block(5 * YEAR + 1),
            calculate_reward_for_block(u64::MAX)
        );
    }
}
