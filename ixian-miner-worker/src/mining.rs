// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ixian_miner_exports::{
    BlockSearchMode, MinerChannels, MinerConfig, MinerError, MinerResult, MinerStats,
};
use ixian_models::config::{INFINIMINE, MAX_TRANSACTION_VERSION};
use ixian_models::{
    Address, Amount, Block, ModelsError, Transaction, TransactionContent, TransactionPayload,
    TransactionSender, TransactionType,
};
use ixian_pow::{
    ceiling_from_difficulty, challenge, decode_nonce, encode_nonce, validate_hash, verify_nonce,
    MinerWorkerContext, PowVersion, HASH_CEILING_SIZE_BYTES,
};
use ixian_signature::KeyPair;
use ixian_time::IxianTime;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::selection::{candidate_offset, select_block};

/// Block the mining threads are working on
pub(crate) struct ActiveBlock {
    pub block_num: u64,
    pub version: u32,
    pub difficulty: u64,
    pub ceiling: [u8; HASH_CEILING_SIZE_BYTES],
    pub challenge: Vec<u8>,
    pub pow_version: PowVersion,
}

/// Blocks solved by this node
#[derive(Default)]
struct SolvedBlocks {
    /// solved blocks whose solution is not yet applied
    pending: Vec<u64>,
    count: u64,
    last_block_num: u64,
    last_time: Option<IxianTime>,
}

struct HashRate {
    since: Instant,
    last_rate: u64,
}

/// State shared by the mining threads and the controller
pub(crate) struct MinerCore {
    pub config: MinerConfig,
    channels: MinerChannels,
    keypair: KeyPair,
    address: Address,
    thread_count: usize,
    paused: AtomicBool,
    active: RwLock<Option<Arc<ActiveBlock>>>,
    solved: Mutex<SolvedBlocks>,
    hashes: AtomicU64,
    hash_rate: Mutex<HashRate>,
}

impl MinerCore {
    pub fn new(
        config: MinerConfig,
        channels: MinerChannels,
        keypair: KeyPair,
        thread_count: usize,
    ) -> Self {
        let address = Address::from_public_key(&keypair.get_public_key());
        MinerCore {
            config,
            channels,
            keypair,
            address,
            thread_count,
            paused: AtomicBool::new(false),
            active: RwLock::new(None),
            solved: Mutex::new(SolvedBlocks::default()),
            hashes: AtomicU64::new(0),
            hash_rate: Mutex::new(HashRate {
                since: Instant::now(),
                last_rate: 0,
            }),
        }
    }

    /// The node is operating and the chain is long enough to mine
    pub fn is_ready(&self) -> bool {
        self.channels.status.is_operating()
            && self.channels.block_store.get_last_block_num() > self.config.min_chain_height
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn active_block(&self) -> Option<Arc<ActiveBlock>> {
        self.active.read().clone()
    }

    pub fn force_search_for_block(&self) {
        *self.active.write() = None;
    }

    pub fn check_active_block_solved(&self) {
        let mut active = self.active.write();
        if let Some(block_num) = active.as_ref().map(|block| block.block_num) {
            let open = self
                .channels
                .block_store
                .get_block(block_num, false)
                .map_or(false, |block| !block.is_solved());
            if !open {
                debug!("active block #{} was solved meanwhile", block_num);
                *active = None;
            }
        }
    }

    /// Unsolved block a miner using `search_mode` would pick next
    pub fn get_mining_block_candidate(&self, search_mode: BlockSearchMode) -> Option<Block> {
        let block_store = &self.channels.block_store;
        let count = block_store.count();
        let offset = candidate_offset(count, self.config.redacted_window_size);
        let blocks = block_store.get_blocks(offset, count.saturating_sub(offset));
        let solved = self.solved.lock().pending.clone();
        select_block(blocks, search_mode, &solved, &mut rand::thread_rng())
    }

    /// Selects a new active block, returns false if none is available
    pub fn search_for_block(&self) -> bool {
        {
            let block_store = &self.channels.block_store;
            let mut solved = self.solved.lock();
            solved.pending.retain(|block_num| {
                block_store
                    .get_block(*block_num, false)
                    .map_or(false, |block| !block.is_solved())
            });
        }
        let Some(block) = self.get_mining_block_candidate(self.config.search_mode) else {
            return false;
        };
        debug!("mining block #{}", block.block_num);
        *self.active.write() = Some(Arc::new(ActiveBlock {
            block_num: block.block_num,
            version: block.version,
            difficulty: block.difficulty,
            ceiling: ceiling_from_difficulty(block.difficulty),
            challenge: challenge(&block.checksum, &self.address),
            pow_version: PowVersion::for_block_version(block.version),
        }));
        true
    }

    /// Hashes the next nonce of `context` against `active`
    pub fn compute_once(&self, active: &ActiveBlock, context: &mut MinerWorkerContext) {
        let nonce = context.next_nonce().to_vec();
        let salt = match active.pow_version.expanded_nonce_length() {
            Some(length) => context.expander.expand(&nonce, length),
            None => nonce.as_slice(),
        };
        let hash = match self
            .channels
            .hasher
            .hash(&active.challenge, salt, active.pow_version.cost())
        {
            Ok(hash) => hash,
            Err(err) => {
                error!("pausing miner due to invalid hash: {}", err);
                self.set_paused(true);
                return;
            }
        };
        self.hashes.fetch_add(1, Ordering::Relaxed);
        if validate_hash(&hash, &active.ceiling) {
            self.on_solution(active.block_num, &nonce);
        }
    }

    fn on_solution(&self, block_num: u64, nonce: &[u8]) {
        {
            let mut active = self.active.write();
            // another thread already submitted a solution for this block
            if active.as_ref().map(|block| block.block_num) != Some(block_num) {
                return;
            }
            *active = None;
        }
        info!("solution found for block #{}", block_num);
        if let Err(err) = self.send_solution(block_num, &encode_nonce(nonce)) {
            error!("could not send the solution for block #{}: {}", block_num, err);
        }
        let mut solved = self.solved.lock();
        solved.pending.push(block_num);
        solved.count += 1;
        solved.last_block_num = block_num;
        solved.last_time = IxianTime::now().ok();
    }

    /// Builds the solution transaction of `nonce` for block `block_num`.
    ///
    /// The public key is left out once the wallet state knows it.
    pub fn build_solution(&self, block_num: u64, nonce: &str) -> MinerResult<Transaction> {
        let public_key = self.keypair.get_public_key();
        let known_key = self
            .channels
            .wallet_state
            .get_wallet(&self.address, false)
            .public_key;
        let sender = if known_key == Some(public_key) {
            TransactionSender::Address(self.address.clone())
        } else {
            TransactionSender::PublicKey(public_key)
        };
        let content = TransactionContent {
            version: MAX_TRANSACTION_VERSION,
            tx_type: TransactionType::PoWSolution,
            amount: Amount::zero(),
            fee: Amount::zero(),
            from_list: vec![(vec![0], Amount::zero())],
            to_list: vec![(INFINIMINE.clone(), Amount::zero())],
            data: TransactionPayload::pow_solution_data(block_num, nonce)
                .map_err(ModelsError::from)?,
            block_height: self.channels.block_store.get_last_block_num(),
            nonce: 0,
            timestamp: IxianTime::now()?,
            sender,
        };
        Ok(Transaction::new_signed(content, &self.keypair)?)
    }

    /// Submits a solution to the pool
    pub fn send_solution(&self, block_num: u64, nonce: &str) -> MinerResult<()> {
        decode_nonce(nonce)?;
        let transaction = self.build_solution(block_num, nonce)?;
        if !self.channels.pool.add_local_transaction(transaction) {
            return Err(MinerError::SolutionRefused(block_num));
        }
        Ok(())
    }

    pub fn verify_solution(
        &self,
        nonce: &str,
        block_num: u64,
        solver: &Address,
        difficulty: u64,
    ) -> bool {
        let Some(block) = self.channels.block_store.get_block(block_num, false) else {
            debug!("cannot verify a solution for unknown block #{}", block_num);
            return false;
        };
        verify_nonce(
            self.channels.hasher.as_ref(),
            nonce,
            &block.checksum,
            solver,
            difficulty,
            PowVersion::for_block_version(block.version),
        )
    }

    /// Recomputes the hash rate once per stats interval
    pub fn update_hash_rate(&self) {
        let mut rate = self.hash_rate.lock();
        let elapsed = rate.since.elapsed();
        if elapsed < self.config.stats_interval.to_duration() {
            return;
        }
        let hashes = self.hashes.swap(0, Ordering::Relaxed);
        rate.last_rate = hashes / elapsed.as_secs().max(1);
        rate.since = Instant::now();
    }

    pub fn reset_hash_rate(&self) {
        self.hashes.store(0, Ordering::Relaxed);
        let mut rate = self.hash_rate.lock();
        rate.last_rate = 0;
        rate.since = Instant::now();
    }

    pub fn stats(&self) -> MinerStats {
        let block_store = &self.channels.block_store;
        let last_block_num = block_store.get_last_block_num();
        let oldest = last_block_num.saturating_sub(self.config.redacted_window_size);
        let (mut empty_blocks, mut full_blocks) = (0, 0);
        for block_num in (oldest + 1..=last_block_num).rev() {
            match block_store.get_block(block_num, false) {
                Some(block) if block.is_solved() => full_blocks += 1,
                Some(_) => empty_blocks += 1,
                None => {}
            }
        }
        let active = self.active_block();
        let solved = self.solved.lock();
        MinerStats {
            thread_count: self.thread_count,
            paused: self.is_paused(),
            hash_rate: self.hash_rate.lock().last_rate,
            current_block_num: active.as_ref().map_or(0, |block| block.block_num),
            current_block_difficulty: active.as_ref().map_or(0, |block| block.difficulty),
            current_block_version: active.as_ref().map_or(0, |block| block.version),
            solved_blocks_count: solved.count,
            last_solved_block_num: solved.last_block_num,
            last_solved_time: solved.last_time,
            empty_blocks,
            full_blocks,
        }
    }
}
