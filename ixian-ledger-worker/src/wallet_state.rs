// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_hash::Hash;
use ixian_ledger_exports::{LedgerConfig, LedgerError, LedgerResult, WalletStateStore};
use ixian_models::{Address, Amount, Wallet, WalletStateChunk};
use ixian_signature::PublicKey;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

type Wallets = BTreeMap<Address, Wallet>;

#[derive(Default)]
struct WalletStateInner {
    wallets: Wallets,
    /// speculative writes, shadowing `wallets` for snapshot reads
    snapshot: Option<Wallets>,
    /// block being applied and the value each touched wallet had before it
    journal: Option<(u64, BTreeMap<Address, Option<Wallet>>)>,
    saved: BTreeMap<u64, Wallets>,
    version: u32,
}

impl WalletStateInner {
    fn read(&self, address: &Address, snapshot: bool) -> Wallet {
        if snapshot {
            if let Some(wallet) = self.snapshot.as_ref().and_then(|s| s.get(address)) {
                return wallet.clone();
            }
        }
        self.wallets
            .get(address)
            .cloned()
            .unwrap_or_else(|| Wallet::new(address.clone()))
    }

    fn write(&mut self, wallet: Wallet, snapshot: bool) {
        if snapshot {
            self.snapshot
                .get_or_insert_with(BTreeMap::new)
                .insert(wallet.id.clone(), wallet);
            return;
        }
        if let Some((_, journal)) = self.journal.as_mut() {
            if !journal.contains_key(&wallet.id) {
                journal.insert(wallet.id.clone(), self.wallets.get(&wallet.id).cloned());
            }
        }
        if wallet.is_empty() {
            self.wallets.remove(&wallet.id);
        } else {
            self.wallets.insert(wallet.id.clone(), wallet);
        }
    }
}

/// In-memory `WalletStateStore`
pub struct WalletState {
    config: LedgerConfig,
    inner: RwLock<WalletStateInner>,
}

impl WalletState {
    /// Empty wallet state
    pub fn new(config: LedgerConfig) -> Self {
        WalletState {
            config,
            inner: RwLock::new(WalletStateInner::default()),
        }
    }
}

impl WalletStateStore for WalletState {
    fn get_wallet(&self, address: &Address, snapshot: bool) -> Wallet {
        self.inner.read().read(address, snapshot)
    }

    fn set_wallet(&self, wallet: Wallet, snapshot: bool) {
        self.inner.write().write(wallet, snapshot);
    }

    fn set_balance(&self, address: &Address, balance: Amount, snapshot: bool) {
        let mut inner = self.inner.write();
        let mut wallet = inner.read(address, snapshot);
        wallet.balance = balance;
        inner.write(wallet, snapshot);
    }

    fn set_public_key(&self, address: &Address, public_key: PublicKey, snapshot: bool) {
        let mut inner = self.inner.write();
        let mut wallet = inner.read(address, snapshot);
        wallet.public_key = Some(public_key);
        inner.write(wallet, snapshot);
    }

    fn checksum(&self, snapshot: bool) -> Hash {
        let inner = self.inner.read();
        let mut data = inner.version.to_le_bytes().to_vec();
        let overlay = inner.snapshot.as_ref().filter(|_| snapshot);
        match overlay {
            Some(overlay) => {
                let mut merged: BTreeMap<&Address, &Wallet> = inner.wallets.iter().collect();
                merged.extend(overlay.iter());
                for wallet in merged.values().filter(|wallet| !wallet.is_empty()) {
                    data.extend(wallet.checksum_bytes());
                }
            }
            None => {
                for wallet in inner.wallets.values() {
                    data.extend(wallet.checksum_bytes());
                }
            }
        }
        Hash::compute_from(&data)
    }

    fn begin_snapshot(&self) {
        self.inner.write().snapshot = Some(BTreeMap::new());
    }

    fn revert_snapshot(&self) {
        self.inner.write().snapshot = None;
    }

    fn begin_transaction(&self, block_num: u64) {
        let mut inner = self.inner.write();
        if let Some((pending, _)) = &inner.journal {
            warn!(
                "wallet state transaction of block #{} replaced by block #{}",
                pending, block_num
            );
        }
        inner.journal = Some((block_num, BTreeMap::new()));
    }

    fn commit_transaction(&self) {
        self.inner.write().journal = None;
    }

    fn revert_transaction(&self) {
        let mut inner = self.inner.write();
        let Some((block_num, journal)) = inner.journal.take() else {
            return;
        };
        debug!(
            "reverting {} wallets changed by block #{}",
            journal.len(),
            block_num
        );
        for (address, previous) in journal {
            match previous {
                Some(wallet) => {
                    inner.wallets.insert(address, wallet);
                }
                None => {
                    inner.wallets.remove(&address);
                }
            }
        }
    }

    fn get_chunks(&self, split: usize, block_num: u64) -> Vec<WalletStateChunk> {
        let inner = self.inner.read();
        let wallets: Vec<Wallet> = inner.wallets.values().cloned().collect();
        wallets
            .chunks(split.max(1))
            .enumerate()
            .map(|(index, chunk)| WalletStateChunk {
                chunk_num: index as u64,
                block_num,
                wallets: chunk.to_vec(),
            })
            .collect()
    }

    fn set_chunk(&self, wallets: Vec<Wallet>) -> LedgerResult<()> {
        if let Some(invalid) = wallets.iter().find(|wallet| !wallet.id.validate_checksum()) {
            return Err(LedgerError::InvalidChunk(format!(
                "invalid address {}",
                invalid.id
            )));
        }
        let mut inner = self.inner.write();
        for wallet in wallets {
            inner.write(wallet, false);
        }
        Ok(())
    }

    fn clear(&self) {
        let mut inner = self.inner.write();
        inner.wallets.clear();
        inner.snapshot = None;
        inner.journal = None;
    }

    fn save_state(&self, block_num: u64) {
        let mut inner = self.inner.write();
        let copy = inner.wallets.clone();
        inner.saved.insert(block_num, copy);
        while inner.saved.len() > self.config.max_saved_states.max(1) {
            inner.saved.pop_first();
        }
        debug!("saved wallet state at block #{}", block_num);
    }

    fn restore_state(&self, block_num: u64) -> LedgerResult<u64> {
        let mut inner = self.inner.write();
        let (height, wallets) = inner
            .saved
            .range(..=block_num)
            .next_back()
            .map(|(height, wallets)| (*height, wallets.clone()))
            .ok_or(LedgerError::NoSavedState(block_num))?;
        inner.wallets = wallets;
        inner.saved.retain(|saved_height, _| *saved_height <= height);
        inner.snapshot = None;
        inner.journal = None;
        info!(
            "restored wallet state saved at block #{} ({} wallets)",
            height,
            inner.wallets.len()
        );
        Ok(height)
    }

    fn version(&self) -> u32 {
        self.inner.read().version
    }

    fn set_version(&self, version: u32) {
        self.inner.write().version = version;
    }

    fn wallet_count(&self) -> u64 {
        self.inner.read().wallets.len() as u64
    }
}
