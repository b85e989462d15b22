// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Block synchronization state machine.
//!
//! Locks are always taken in this order, and most of them only briefly:
//! `pending`, `missing`, `requests`, `flags`, `ws`, `watchdog`.
//! Rolling forward holds `pending` for the whole pass so the chain frontier
//! cannot move while a block is being applied.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use ixian_logging::ixian_trace;
use ixian_models::config::{MAX_BLOCK_VERSION, SIGNATURE_FREEZE_OFFSET};
use ixian_models::{Block, WalletStateChunk};
use ixian_protocol_exports::{HelloData, PeerId};
use ixian_signature::KeyPair;
use ixian_sync_exports::{
    BlockVerifyStatus, DltStatus, SyncChannels, SyncConfig, SyncError, SyncProgress, SyncResult,
    SyncState, WalletStateHeader,
};
use ixian_time::IxianTime;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use tracing::{debug, error, info, warn};

use crate::wallet_state_service::OutgoingWalletStateService;

/// wait when there is nothing to synchronize
const IDLE_WAIT: Duration = Duration::from_millis(1000);
/// wait after a round of block requests
const REQUEST_WAIT: Duration = Duration::from_millis(100);
/// wait after a failed broadcast or while blocks are missing
const RETRY_WAIT: Duration = Duration::from_millis(500);
/// wait for the missing transactions of a block
const INDETERMINATE_WAIT: Duration = Duration::from_millis(100);
/// blocks requested before the horizon check starts on an empty chain
const EMPTY_CHAIN_REQUEST_ALLOWANCE: u64 = 10;
/// chain length below which blocks are accepted without signature checks
const TRUSTED_CHAIN_DEPTH: u64 = 16;
/// wallet state is rolled back this many blocks by the watchdog
const WATCHDOG_ROLLBACK_DEPTH: u64 = 100;
/// blocks below this height are never signed while syncing
const MIN_SIGNING_HEIGHT: u64 = 12;

#[derive(Default)]
struct SyncFlags {
    synchronizing: bool,
    done: bool,
    target: u64,
    received_all_missing: bool,
    last_block_to_read_from_storage: u64,
    /// sync was started without a peer, completion waits for one
    no_network_sync: bool,
}

#[derive(Default)]
struct WalletStateSync {
    confirmed_block_num: u64,
    confirmed_version: u32,
    synced: bool,
    can_perform: bool,
    peer: Option<PeerId>,
    missing_chunks: BTreeSet<u64>,
    received: Vec<WalletStateChunk>,
}

#[derive(Default)]
struct Watchdog {
    block_num: u64,
    time: IxianTime,
}

/// Result of one block of a rollforward pass
enum RollStep {
    /// committed, continue with the next height
    Applied,
    /// stop the pass and wait before the next one
    Stop(Duration),
}

/// Catches the local chain up with the network
pub(crate) struct ChainSyncEngine {
    pub(crate) config: SyncConfig,
    channels: SyncChannels,
    keypair: Option<KeyPair>,
    pending: Mutex<BTreeMap<u64, Block>>,
    /// lazily computed on the first request round
    missing: Mutex<Option<BTreeSet<u64>>>,
    requests: Mutex<BTreeMap<u64, IxianTime>>,
    flags: Mutex<SyncFlags>,
    ws: Mutex<WalletStateSync>,
    watchdog: Mutex<Watchdog>,
    outgoing: OutgoingWalletStateService,
}

impl ChainSyncEngine {
    pub fn new(config: SyncConfig, channels: SyncChannels, keypair: Option<KeyPair>) -> Self {
        ChainSyncEngine {
            config,
            channels,
            keypair,
            pending: Mutex::new(BTreeMap::new()),
            missing: Mutex::new(None),
            requests: Mutex::new(BTreeMap::new()),
            flags: Mutex::new(SyncFlags::default()),
            ws: Mutex::new(WalletStateSync::default()),
            watchdog: Mutex::new(Watchdog::default()),
            outgoing: OutgoingWalletStateService::new(),
        }
    }

    /// One iteration of the sync loop, returns how long to wait before the next one
    pub fn update(&self, now: IxianTime) -> Duration {
        let (synchronizing, done, target, received_all_missing) = {
            let flags = self.flags.lock();
            (
                flags.synchronizing,
                flags.done,
                flags.target,
                flags.received_all_missing,
            )
        };
        // no target means no peer has said hello yet
        if !synchronizing || done || target == 0 {
            return IDLE_WAIT;
        }

        let (confirmed, ws_synced, can_perform) = {
            let ws = self.ws.lock();
            (ws.confirmed_block_num, ws.synced, ws.can_perform)
        };
        let keeps_history = self.config.store_full_history || self.config.recover_from_file;
        if !keeps_history && confirmed == 0 {
            self.start_wallet_state_sync();
            return IDLE_WAIT;
        }

        let mut wait = Duration::ZERO;
        if (keeps_history || (confirmed > 0 && ws_synced)) && !received_all_missing {
            wait = self.roll_forward(now);
            if self.flags.lock().done {
                return Duration::ZERO;
            }
            let (requested, backoff) = self.request_missing_blocks(now);
            if requested {
                return backoff.max(REQUEST_WAIT);
            }
            wait = wait.max(backoff);
        }

        if can_perform {
            self.perform_wallet_state_sync();
            wait.max(IDLE_WAIT)
        } else {
            wait.max(self.roll_forward(now))
        }
    }

    /// Lowest height the chain is rebuilt from
    fn lowest_block_num(&self) -> u64 {
        if self.config.full_storage_data_verification {
            return 1;
        }
        let confirmed = self.ws.lock().confirmed_block_num;
        if confirmed > self.config.redacted_window_size {
            confirmed - self.config.redacted_window_size
        } else {
            1
        }
    }

    fn nudge_watchdog(&self, block_num: u64, now: IxianTime) {
        let mut watchdog = self.watchdog.lock();
        if watchdog.block_num > 0
            && (block_num + 4 == watchdog.block_num || block_num == watchdog.block_num + 1)
        {
            watchdog.time = now;
        }
    }

    fn reset_watchdog(&self, block_num: u64, now: IxianTime) {
        let mut watchdog = self.watchdog.lock();
        watchdog.block_num = block_num;
        watchdog.time = now;
    }

    /// Requests the missing blocks, from local storage first.
    /// Returns whether any request is in flight and how long to back off.
    pub(crate) fn request_missing_blocks(&self, now: IxianTime) -> (bool, Duration) {
        let target = {
            let flags = self.flags.lock();
            if flags.done || flags.target == 0 {
                return (false, Duration::ZERO);
            }
            flags.target
        };
        let mut backoff = Duration::ZERO;

        {
            let mut requests = self.requests.lock();
            for (block_num, requested_at) in requests.iter_mut() {
                if now.saturating_sub(*requested_at) <= self.config.block_request_timeout {
                    continue;
                }
                if self.channels.transport.broadcast_get_block(*block_num) {
                    *requested_at = now;
                } else {
                    self.nudge_watchdog(*block_num, now);
                    warn!("failed to rebroadcast the request for block #{}", block_num);
                    backoff += RETRY_WAIT;
                }
            }
        }

        let lowest = self.lowest_block_num();
        let mut pending = self.pending.lock();
        let mut missing_guard = self.missing.lock();
        let last = self.channels.block_store.get_last_block_num();
        let missing = missing_guard.get_or_insert_with(|| {
            (lowest..=target)
                .filter(|num| *num > last && !pending.contains_key(num))
                .collect()
        });

        info!(
            "{} blocks are missing before the node is synchronized",
            missing.len()
        );
        let mut requests = self.requests.lock();
        let storage_cutoff = {
            let mut flags = self.flags.lock();
            if missing.is_empty() {
                flags.received_all_missing = true;
                return (false, backoff);
            }
            flags.last_block_to_read_from_storage
        };

        let mut total = 0u64;
        let mut requested = 0u64;
        let candidates: Vec<u64> = missing.iter().copied().collect();
        for block_num in candidates {
            total += 1;
            if requests.contains_key(&block_num) {
                requested += 1;
                continue;
            }
            let from_storage = block_num <= storage_cutoff;
            if block_num > last + self.config.max_block_requests
                && (last > 0 || total > EMPTY_CHAIN_REQUEST_ALLOWANCE)
            {
                if !from_storage {
                    backoff += REQUEST_WAIT;
                }
                break;
            }

            match self.channels.block_store.get_block(block_num, from_storage) {
                Some(block) => {
                    missing.remove(&block_num);
                    pending.insert(block_num, block);
                }
                None => {
                    if from_storage {
                        warn!(
                            "expected block #{} in storage, requesting it from the network",
                            block_num
                        );
                    }
                    if self.channels.transport.broadcast_get_block(block_num) {
                        requested += 1;
                        requests.insert(block_num, now);
                    } else {
                        self.nudge_watchdog(block_num, now);
                        warn!("failed to broadcast the request for block #{}", block_num);
                        backoff += RETRY_WAIT;
                    }
                }
            }
        }
        (requested > 0, backoff)
    }

    /// Marks `block_num` missing again so that the next request round asks for it right away.
    /// Returns false if it was already missing.
    fn request_block_again(&self, block_num: u64, now: IxianTime) -> bool {
        let mut missing = self.missing.lock();
        let Some(missing) = missing.as_mut() else {
            return false;
        };
        if !missing.insert(block_num) {
            return false;
        }
        info!("requesting missing block #{} again", block_num);
        self.requests.lock().insert(
            block_num,
            now.saturating_sub(self.config.block_request_timeout),
        );
        self.flags.lock().received_all_missing = false;
        true
    }

    /// Applies the pending blocks in height order, returns how long to wait before the next pass
    pub(crate) fn roll_forward(&self, now: IxianTime) -> Duration {
        let lowest = self.lowest_block_num();
        let target = self.flags.lock().target;
        let mut wait = Duration::ZERO;

        {
            let mut pending = self.pending.lock();
            let last = self.channels.block_store.get_last_block_num();
            if self.channels.block_store.count() > SIGNATURE_FREEZE_OFFSET {
                let floor = last.saturating_sub(SIGNATURE_FREEZE_OFFSET);
                pending.retain(|num, _| *num >= floor);
            }

            loop {
                self.handle_watchdog(&mut pending, now, false);

                let next = if self.channels.block_store.count() > 0 {
                    self.channels.block_store.get_last_block_num() + 1
                } else {
                    lowest
                };
                if next > target {
                    pending.clear();
                    self.requests.lock().clear();
                    break;
                }
                let Some(mut block) = pending.get(&next).cloned() else {
                    if self.request_block_again(next, now) {
                        wait = RETRY_WAIT;
                    }
                    break;
                };

                if block.version > MAX_BLOCK_VERSION {
                    error!(
                        "block #{} has version {}, higher than this node can handle, discarding it",
                        block.block_num, block.version
                    );
                    pending.remove(&next);
                    self.channels.status.set_network_upgraded(true);
                    wait = RETRY_WAIT;
                    break;
                }
                self.channels.status.set_network_upgraded(false);

                if next > SIGNATURE_FREEZE_OFFSET {
                    self.finalize_block(&mut pending, next - SIGNATURE_FREEZE_OFFSET);
                }

                block.pow_field = None;
                match self.apply_pending_block(&mut pending, block, target, now) {
                    Ok(RollStep::Applied) => {
                        pending.remove(&next);
                    }
                    Ok(RollStep::Stop(duration)) => {
                        wait = duration;
                        break;
                    }
                    Err(err) => {
                        error!("error while syncing block #{}: {}", next, err);
                        pending.remove(&next);
                    }
                }
                if pending.is_empty() {
                    break;
                }
            }
        }

        if wait.is_zero() && self.channels.block_store.get_last_block_num() >= target {
            if self.verify_last_block(now) {
                if !self.stop_sync() {
                    wait = RETRY_WAIT;
                }
            } else {
                let mut pending = self.pending.lock();
                self.handle_watchdog(&mut pending, now, true);
                wait = RETRY_WAIT;
            }
        }
        wait
    }

    /// Merges the signatures of a pending copy of an already committed block
    fn finalize_block(&self, pending: &mut BTreeMap<u64, Block>, block_num: u64) {
        let Some(copy) = pending.remove(&block_num) else {
            return;
        };
        let Some(local) = self.channels.block_store.get_block(block_num, false) else {
            return;
        };
        if copy.checksum != local.checksum
            || self.channels.block_processor.verify_block_basic(&copy) != BlockVerifyStatus::Valid
        {
            return;
        }
        if self.channels.block_processor.verify_block_signatures(&copy) {
            self.channels.block_store.refresh_signatures(&copy, true);
        } else {
            warn!("block #{} does not have the required consensus", block_num);
        }
    }

    /// Drops a pending block and asks for it again
    fn discard(&self, pending: &mut BTreeMap<u64, Block>, block_num: u64, now: IxianTime) {
        pending.remove(&block_num);
        self.request_block_again(block_num, now);
    }

    fn apply_pending_block(
        &self,
        pending: &mut BTreeMap<u64, Block>,
        mut block: Block,
        target: u64,
        now: IxianTime,
    ) -> SyncResult<RollStep> {
        let block_num = block.block_num;
        let confirmed = self.ws.lock().confirmed_block_num;
        let full_verification = self.config.full_storage_data_verification;
        let processor = &self.channels.block_processor;
        info!("sync: applying block #{}/{}", block_num, target);

        if block.from_local_storage && !self.preload_transactions(&block) {
            return Ok(RollStep::Stop(RETRY_WAIT));
        }

        let status = if block_num > confirmed || !block.from_local_storage || full_verification {
            let ignore_wallet_state = block_num <= confirmed && !full_verification;
            processor.verify_block(&block, ignore_wallet_state)
        } else {
            processor.verify_block_basic(&block)
        };
        match status {
            BlockVerifyStatus::Valid => {}
            BlockVerifyStatus::Indeterminate => {
                info!("waiting for missing transactions of block #{}", block_num);
                return Ok(RollStep::Stop(INDETERMINATE_WAIT));
            }
            BlockVerifyStatus::Invalid => {
                warn!(
                    "block #{} {} is invalid, discarding it and requesting a new one",
                    block_num, block.checksum
                );
                self.discard(pending, block_num, now);
                return Ok(RollStep::Stop(Duration::ZERO));
            }
        }

        let chain_len = self.channels.block_store.count();
        if !processor.verify_block_signatures(&block) && chain_len > TRUSTED_CHAIN_DEPTH {
            warn!(
                "block #{} {} does not have the required consensus, discarding it and requesting a new one",
                block_num, block.checksum
            );
            self.discard(pending, block_num, now);
            return Ok(RollStep::Stop(Duration::ZERO));
        }

        let accepted = chain_len <= SIGNATURE_FREEZE_OFFSET
            || processor.verify_signature_freeze_checksum(&block);
        if !accepted {
            debug!("block #{} has an invalid signature freeze", block_num);
            pending.remove(&block_num);
            return Ok(RollStep::Stop(Duration::ZERO));
        }

        if block_num > confirmed {
            if !processor.apply_accepted_block(&block) {
                self.discard(pending, block_num, now);
                return Err(SyncError::BlockRejected(block_num));
            }
            if !block.skips_wallet_state_checksum() {
                let checksum = self.channels.wallet_state.checksum(false);
                if checksum != block.wallet_state_checksum {
                    error!(
                        "after applying block #{}, the wallet state checksum is incorrect: block has {}, actual is {}",
                        block_num, block.wallet_state_checksum, checksum
                    );
                    self.handle_watchdog(pending, now, true);
                    return Ok(RollStep::Stop(Duration::ZERO));
                }
            }
            let every = self.config.save_wallet_state_every_block;
            if every > 0 && block_num % every == 0 {
                self.channels.wallet_state.save_state(block_num);
            }
        } else {
            if block_num == target
                && !block.skips_wallet_state_checksum()
                && self.channels.wallet_state.checksum(false) != block.wallet_state_checksum
            {
                warn!(
                    "block #{} is the last one and has an invalid wallet state checksum, discarding it",
                    block_num
                );
                self.discard(pending, block_num, now);
                self.handle_watchdog(pending, now, true);
                return Ok(RollStep::Stop(Duration::ZERO));
            }
            if !self.channels.pool.set_applied_flags_from_block(&block) {
                self.discard(pending, block_num, now);
                return Ok(RollStep::Stop(Duration::ZERO));
            }
        }

        if self.config.master_node
            && block_num > MIN_SIGNING_HEIGHT
            && block_num + SIGNATURE_FREEZE_OFFSET >= self.channels.status.highest_network_block()
        {
            if let Some(keypair) = &self.keypair {
                if block.add_signature(keypair) {
                    if let Some(signature) = block.signatures.last() {
                        self.channels.transport.broadcast_new_block_signature(
                            block_num,
                            &block.checksum,
                            signature,
                        );
                    }
                }
            }
        }

        let add_to_storage = !block.from_local_storage;
        ixian_trace!("sync.roll_forward.apply", {
            "block_num": block_num,
            "from_local_storage": block.from_local_storage
        });
        self.channels
            .block_store
            .append_block(block, add_to_storage)?;
        self.reset_watchdog(block_num, now);
        if let Some(missing) = self.missing.lock().as_mut() {
            missing.retain(|num| *num > block_num);
        }
        Ok(RollStep::Applied)
    }

    /// Loads the transactions of a block read from storage into the pool.
    /// Returns false if some are missing and were requested from the network.
    fn preload_transactions(&self, block: &Block) -> bool {
        let mut complete = true;
        for id in &block.transactions {
            match self
                .channels
                .pool
                .get_transaction(id, Some(block.block_num), true)
            {
                Some(mut transaction) => {
                    transaction.applied = 0;
                    if !self.channels.pool.add_transaction(
                        transaction,
                        true,
                        self.config.full_storage_data_verification,
                    ) {
                        debug!("transaction {} from storage was not added to the pool", id);
                    }
                }
                None => {
                    self.channels
                        .transport
                        .broadcast_get_transaction(id, block.block_num);
                    complete = false;
                }
            }
        }
        complete
    }

    fn verify_last_block(&self, now: IxianTime) -> bool {
        let Some(block) = self.channels.block_store.get_last_block() else {
            return false;
        };
        if !block.skips_wallet_state_checksum() {
            let checksum = self.channels.wallet_state.checksum(false);
            if checksum != block.wallet_state_checksum {
                error!(
                    "wallet state synchronization failed, block #{} has {}, actual is {} (confirmed at #{})",
                    block.block_num,
                    block.wallet_state_checksum,
                    checksum,
                    self.ws.lock().confirmed_block_num
                );
                return false;
            }
        }
        self.reset_watchdog(0, now);
        true
    }

    /// Leaves synchronization and resumes block processing.
    /// Returns false while no peer confirmed the sync target.
    fn stop_sync(&self) -> bool {
        {
            let mut flags = self.flags.lock();
            if flags.no_network_sync {
                return false;
            }
            flags.done = true;
            flags.synchronizing = false;
        }
        self.channels.status.set_synchronizing(false);
        self.channels.block_processor.resume_operation();
        {
            let mut pending = self.pending.lock();
            let mut missing = self.missing.lock();
            let mut requests = self.requests.lock();
            requests.clear();
            pending.clear();
            *missing = None;
        }
        if !self.config.recover_from_file {
            self.channels.transport.request_unapplied_transactions();
        }
        info!(
            "synchronization finished at block #{}",
            self.channels.block_store.get_last_block_num()
        );
        true
    }

    /// Rolls the chain back to a saved wallet state when no block was committed for too long
    fn handle_watchdog(&self, pending: &mut BTreeMap<u64, Block>, now: IxianTime, force: bool) {
        if self.flags.lock().done {
            return;
        }
        if !force {
            let watchdog = self.watchdog.lock();
            if watchdog.block_num == 0
                || now.saturating_sub(watchdog.time) <= self.config.watchdog_timeout
            {
                return;
            }
        }

        let mut confirmed = 0;
        if !self.config.full_storage_data_verification {
            let last = self.channels.block_store.get_last_block_num();
            if last > WATCHDOG_ROLLBACK_DEPTH {
                info!(
                    "restoring the wallet state to block #{}",
                    last - WATCHDOG_ROLLBACK_DEPTH
                );
                match self
                    .channels
                    .wallet_state
                    .restore_state(last - WATCHDOG_ROLLBACK_DEPTH)
                {
                    Ok(height) => confirmed = height,
                    Err(err) => warn!("could not restore the wallet state: {}", err),
                }
            }
        }
        self.ws.lock().confirmed_block_num = confirmed;

        if confirmed == 0 {
            info!("resetting the sync to begin from the first block");
            self.channels.wallet_state.clear();
        } else {
            let verified = self
                .channels
                .block_store
                .get_block(confirmed, true)
                .map_or(false, |block| {
                    block.skips_wallet_state_checksum()
                        || self.channels.wallet_state.checksum(false)
                            == block.wallet_state_checksum
                });
            if !verified {
                error!("sync watchdog: wallet state mismatch at block #{}", confirmed);
                return;
            }
        }

        self.flags.lock().last_block_to_read_from_storage = confirmed;
        self.reset_watchdog(0, now);

        let mut last = self.channels.block_store.get_last_block_num();
        while last > confirmed && self.channels.block_store.remove_block(last, false) {
            last = self.channels.block_store.get_last_block_num();
        }
        self.channels.pool.clear();

        let lowest = self.lowest_block_num();
        let first = if self.channels.block_store.count() > 0 {
            self.channels.block_store.get_last_block_num() + 1
        } else {
            lowest
        };
        let target = self.flags.lock().target;
        *self.missing.lock() = Some((first..=confirmed.max(target)).collect());
        pending.clear();
        self.requests.lock().clear();
        {
            let mut flags = self.flags.lock();
            flags.received_all_missing = false;
            flags.no_network_sync = true;
        }
        warn!(
            "sync watchdog rolled the chain back to block #{}, synchronizing up to #{}",
            self.channels.block_store.get_last_block_num(),
            target
        );
    }

    /// Stores a block received while synchronizing
    pub fn on_block_received(&self, block: Block) {
        if !self.flags.lock().synchronizing {
            return;
        }
        let block_num = block.block_num;
        let mut pending = self.pending.lock();
        if let Some(missing) = self.missing.lock().as_mut() {
            missing.remove(&block_num);
        }
        self.requests.lock().remove(&block_num);
        if block_num > self.flags.lock().target {
            return;
        }
        pending.insert(block_num, block);
    }

    /// Resets the block bookkeeping and enters synchronization
    pub fn start_sync(&self) {
        let mut pending = self.pending.lock();
        let mut requests = self.requests.lock();
        let mut flags = self.flags.lock();
        pending.clear();
        requests.clear();
        flags.synchronizing = true;
        flags.done = false;
        flags.received_all_missing = false;
        self.channels.status.set_synchronizing(true);
    }

    pub fn on_hello_data(&self, hello: HelloData) {
        info!(
            "sync header: block #{} {} v{}, wallet state {}, consensus {}",
            hello.block_height,
            hello.block_checksum,
            hello.block_version,
            hello.wallet_state_checksum,
            hello.consensus
        );
        let (synchronizing, done) = {
            let flags = self.flags.lock();
            (flags.synchronizing, flags.done)
        };

        if synchronizing {
            self.extend_target(hello.block_height);
        } else if !self.channels.status.is_operating() && !done {
            self.begin_sync(&hello);
        }

        if hello.from_network {
            self.flags.lock().no_network_sync = false;
        }
    }

    /// Raises the target of an ongoing sync
    fn extend_target(&self, height: u64) {
        let (previous, no_network_sync) = {
            let flags = self.flags.lock();
            (flags.target, flags.no_network_sync)
        };
        if height <= previous {
            return;
        }
        info!("sync target increased from {} to {}", previous, height);
        self.channels.status.raise_highest_network_block(height);
        if no_network_sync
            && !self.config.store_full_history
            && !self.config.recover_from_file
            && self.ws.lock().confirmed_block_num == 0
        {
            self.start_wallet_state_sync();
        }

        let _pending = self.pending.lock();
        if let Some(missing) = self.missing.lock().as_mut() {
            missing.extend(previous + 1..=height);
        }
        let mut flags = self.flags.lock();
        flags.no_network_sync = false;
        flags.received_all_missing = false;
        flags.target = flags.target.max(height);
    }

    /// Starts the first sync of the node
    fn begin_sync(&self, hello: &HelloData) {
        let target = {
            let mut flags = self.flags.lock();
            if let Some(cutoff) = hello.last_block_to_read_from_storage.filter(|n| *n > 0) {
                flags.last_block_to_read_from_storage = cutoff;
            }
            flags.target = flags.last_block_to_read_from_storage.max(hello.block_height);
            flags.target
        };
        info!(
            "network synchronization started, target block height #{}",
            target
        );
        self.channels.status.raise_highest_network_block(target);

        if self.config.full_storage_data_verification {
            self.channels.wallet_state.clear();
            self.ws.lock().synced = true;
        } else if self.config.store_full_history {
            if let Some(block) = self
                .channels
                .block_store
                .get_block(hello.block_height, true)
            {
                if block.skips_wallet_state_checksum()
                    || self.channels.wallet_state.checksum(false) == hello.wallet_state_checksum
                {
                    let mut ws = self.ws.lock();
                    ws.confirmed_block_num = hello.block_height;
                    ws.confirmed_version = self.channels.wallet_state.version();
                    ws.synced = true;
                }
            }
        }
        self.start_sync();
        self.flags.lock().no_network_sync =
            !(self.config.recover_from_file || self.config.no_network_sync);
    }

    /// Asks a random peer for its wallet state header
    fn start_wallet_state_sync(&self) {
        let peers = self.channels.transport.get_connected_peers();
        let Some(peer) = peers.choose(&mut rand::thread_rng()).cloned() else {
            info!("no peer to synchronize the wallet state from");
            return;
        };
        info!("starting wallet state synchronization from {}", peer);
        self.ws.lock().peer = Some(peer.clone());
        self.channels.transport.sync_wallet_state_from_peer(&peer);
    }

    pub fn on_wallet_state_header(&self, header: WalletStateHeader) {
        let mut flags = self.flags.lock();
        let mut ws = self.ws.lock();
        if !flags.synchronizing || ws.confirmed_block_num != 0 {
            return;
        }
        flags.no_network_sync = false;
        let split = self.config.wallet_state_chunk_split.max(1) as u64;
        let chunks = (header.wallet_count + split - 1) / split;
        info!(
            "wallet state starting block #{}, {} wallets ({} chunks)",
            header.block_num, header.wallet_count, chunks
        );
        ws.confirmed_block_num = header.block_num;
        ws.confirmed_version = header.version;
        ws.missing_chunks = (0..chunks).collect();
        ws.received.clear();
        ws.can_perform = true;
    }

    pub fn on_wallet_state_chunk_received(&self, chunk: WalletStateChunk) {
        if !self.flags.lock().synchronizing {
            warn!("received a wallet state chunk, but we are not synchronizing");
            return;
        }
        let mut ws = self.ws.lock();
        if ws.missing_chunks.remove(&chunk.chunk_num) {
            ws.received.push(chunk);
        }
    }

    /// Requests the missing chunks, and replaces the wallet state once all arrived
    pub(crate) fn perform_wallet_state_sync(&self) {
        let confirmed = self.ws.lock().confirmed_block_num;
        if confirmed == 0 {
            info!("wallet state is already synchronized");
            return;
        }
        if !self.request_wallet_chunks() {
            return;
        }

        let _pending = self.pending.lock();
        let mut ws = self.ws.lock();
        if !ws.missing_chunks.is_empty() {
            return;
        }
        info!("all wallet state chunks received, applying them");
        self.channels.wallet_state.clear();
        self.channels.wallet_state.set_version(ws.confirmed_version);
        let mut chunks = std::mem::take(&mut ws.received);
        chunks.sort_by_key(|chunk| chunk.chunk_num);
        for chunk in chunks {
            debug!("applying wallet state chunk {}", chunk.chunk_num);
            if let Err(err) = self.channels.wallet_state.set_chunk(chunk.wallets) {
                error!("could not apply wallet state chunk {}: {}", chunk.chunk_num, err);
                self.channels.wallet_state.clear();
                ws.confirmed_block_num = 0;
                ws.can_perform = false;
                return;
            }
        }
        ws.synced = true;
        ws.can_perform = false;
        info!("wallet state synchronized as of block #{}", confirmed);
    }

    /// Returns false if a request failed and the wallet state sync was restarted
    fn request_wallet_chunks(&self) -> bool {
        let failed = {
            let ws = self.ws.lock();
            let Some(peer) = ws.peer.clone() else {
                drop(ws);
                self.start_wallet_state_sync();
                return false;
            };
            let limit = self.config.max_block_requests as usize + 1;
            ws.missing_chunks
                .iter()
                .take(limit)
                .find(|chunk_num| {
                    !self
                        .channels
                        .transport
                        .get_wallet_state_chunk_from_peer(&peer, **chunk_num)
                })
                .map(|_| peer)
        };
        match failed {
            Some(peer) => {
                warn!(
                    "failed to request a wallet state chunk from {}, restarting the wallet state synchronization",
                    peer
                );
                self.start_wallet_state_sync();
                false
            }
            None => true,
        }
    }

    pub fn start_outgoing_wallet_state_sync(
        &self,
        peer: &PeerId,
        now: IxianTime,
    ) -> Option<WalletStateHeader> {
        if self.flags.lock().synchronizing {
            warn!("unable to serve the wallet state until our own synchronization is complete");
            return None;
        }
        Some(self.outgoing.start(
            peer,
            self.channels.wallet_state.as_ref(),
            self.channels.block_store.get_last_block_num(),
            self.config.wallet_state_chunk_split,
            self.config.chunk_request_cooldown,
            now,
        ))
    }

    pub fn on_request_wallet_chunk(&self, chunk_num: u64, peer: &PeerId, now: IxianTime) {
        if self.flags.lock().synchronizing {
            warn!("a peer is requesting wallet state chunks, but we are synchronizing");
            return;
        }
        self.outgoing
            .serve_chunk(chunk_num, peer, self.channels.transport.as_ref(), now);
    }

    pub fn is_synchronizing(&self) -> bool {
        self.flags.lock().synchronizing
    }

    pub fn get_sync_progress(&self) -> SyncProgress {
        let pending_blocks = self.pending.lock().len() as u64;
        let missing_blocks = self
            .missing
            .lock()
            .as_ref()
            .map_or(0, |missing| missing.len() as u64);
        let flags = self.flags.lock();
        let ws = self.ws.lock();
        let keeps_history = self.config.store_full_history || self.config.recover_from_file;
        let state = if !flags.synchronizing {
            if flags.done {
                SyncState::Synced
            } else {
                SyncState::Idle
            }
        } else if ws.can_perform || (!keeps_history && !ws.synced) {
            SyncState::WalletStateSyncing
        } else {
            SyncState::Syncing
        };
        SyncProgress {
            state,
            synchronizing: flags.synchronizing,
            target: flags.target,
            local_height: self.channels.block_store.get_last_block_num(),
            missing_blocks,
            pending_blocks,
            wallet_state_confirmed_height: ws.confirmed_block_num,
            missing_chunks: ws.missing_chunks.len() as u64,
        }
    }

    pub fn get_dlt_status(&self, now: IxianTime) -> DltStatus {
        let status = &self.channels.status;
        if status.is_network_upgraded() {
            DltStatus::ErrorForkedViaUpgrade
        } else if status.is_synchronizing() {
            DltStatus::Synchronizing
        } else if now.saturating_sub(status.last_block_time()) > self.config.long_time_no_block {
            DltStatus::ErrorLongTimeNoBlock
        } else {
            DltStatus::Active
        }
    }
}
