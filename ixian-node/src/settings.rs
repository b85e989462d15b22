// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_ledger_exports::LedgerConfig;
use ixian_miner_exports::{BlockSearchMode, MinerConfig};
use ixian_models::Amount;
use ixian_pool_exports::PoolConfig;
use ixian_sync_exports::SyncConfig;
use ixian_time::IxianTime;
use serde::Deserialize;

const BASE_CONFIG_PATH: &str = "base_config/config.toml";
const OVERRIDE_CONFIG_PATH: &str = "config/config.toml";

lazy_static::lazy_static! {
    pub static ref SETTINGS: Settings = load_settings()
        .unwrap_or_else(|err| panic!("could not load the node settings: {}", err));
}

/// Reads the base config, then the optional override file, then `IXIAN_` prefixed environment variables
fn load_settings() -> Result<Settings, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(BASE_CONFIG_PATH))
        .add_source(config::File::with_name(OVERRIDE_CONFIG_PATH).required(false))
        .add_source(
            config::Environment::with_prefix("IXIAN")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LoggingSettings {
    pub level: usize,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LedgerSettings {
    pub redacted_window_size: u64,
    pub max_saved_states: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoolSettings {
    pub transaction_price: Amount,
    pub max_transaction_version: u32,
    pub pending_resend_delay: IxianTime,
    pub pending_inquiry_delay: IxianTime,
    pub pending_expiry: IxianTime,
    pub prune_interval: IxianTime,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MinerSettings {
    pub enabled: bool,
    pub thread_count: usize,
    pub search_mode: BlockSearchMode,
    pub stats_interval: IxianTime,
    pub block_processor_poll_interval: IxianTime,
    pub min_chain_height: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncSettings {
    pub max_block_requests: u64,
    pub block_request_timeout: IxianTime,
    pub watchdog_timeout: IxianTime,
    pub chunk_request_cooldown: IxianTime,
    pub wallet_state_chunk_split: usize,
    pub store_full_history: bool,
    pub recover_from_file: bool,
    pub full_storage_data_verification: bool,
    pub no_network_sync: bool,
    pub save_wallet_state_every_block: u64,
    pub master_node: bool,
    pub long_time_no_block: IxianTime,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub ledger: LedgerSettings,
    pub pool: PoolSettings,
    pub miner: MinerSettings,
    pub sync: SyncSettings,
}

impl Settings {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            redacted_window_size: self.ledger.redacted_window_size,
            max_saved_states: self.ledger.max_saved_states,
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            transaction_price: self.pool.transaction_price,
            max_transaction_version: self.pool.max_transaction_version,
            redacted_window_size: self.ledger.redacted_window_size,
            pending_resend_delay: self.pool.pending_resend_delay,
            pending_inquiry_delay: self.pool.pending_inquiry_delay,
            pending_expiry: self.pool.pending_expiry,
            prune_interval: self.pool.prune_interval,
            recover_from_file: self.sync.recover_from_file,
            full_storage_data_verification: self.sync.full_storage_data_verification,
        }
    }

    pub fn miner_config(&self) -> MinerConfig {
        MinerConfig {
            enabled: self.miner.enabled,
            thread_count: self.miner.thread_count,
            search_mode: self.miner.search_mode,
            stats_interval: self.miner.stats_interval,
            block_processor_poll_interval: self.miner.block_processor_poll_interval,
            redacted_window_size: self.ledger.redacted_window_size,
            min_chain_height: self.miner.min_chain_height,
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_block_requests: self.sync.max_block_requests,
            block_request_timeout: self.sync.block_request_timeout,
            watchdog_timeout: self.sync.watchdog_timeout,
            chunk_request_cooldown: self.sync.chunk_request_cooldown,
            wallet_state_chunk_split: self.sync.wallet_state_chunk_split,
            redacted_window_size: self.ledger.redacted_window_size,
            store_full_history: self.sync.store_full_history,
            recover_from_file: self.sync.recover_from_file,
            full_storage_data_verification: self.sync.full_storage_data_verification,
            no_network_sync: self.sync.no_network_sync,
            save_wallet_state_every_block: self.sync.save_wallet_state_every_block,
            master_node: self.sync.master_node,
            long_time_no_block: self.sync.long_time_no_block,
        }
    }
}
