// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use ixian_hash::Hash;
use ixian_ledger_exports::LedgerConfig;
use ixian_ledger_worker::WalletState;
use ixian_models::config::INFINIMINE;
use ixian_models::{
    Address, Amount, Block, MultisigOperation, MultisigPayload, NodeStatus, Transaction,
    TransactionContent, TransactionId, TransactionPayload, TransactionSender, TransactionType,
};
use ixian_pool_exports::{PoolChannels, PoolConfig, PoolController, PoolManager};
use ixian_pow::{PowCost, PowHasher, PowResult, POW_HASH_SIZE_BYTES};
use ixian_protocol_exports::MockPeerTransport;
use ixian_signature::KeyPair;
use ixian_storage_exports::{BlockStore, InMemoryBlockStore, InMemoryTransactionStorage};
use ixian_time::IxianTime;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::{start_pool_controller, PoolDependencies};

/// Fee paid by the test transactions, one size unit at the default price
pub const FEE: Amount = Amount::from_raw(5_000);

/// Difficulty of the test blocks
pub const DIFFICULTY: u64 = 0x0000_ffff_ffff_ffff;

/// Returns a preset hash: all zeroes solves any block, all ones none
pub struct TestHasher {
    hash: Mutex<[u8; POW_HASH_SIZE_BYTES]>,
}

impl TestHasher {
    pub fn new() -> Self {
        TestHasher {
            hash: Mutex::new([0u8; POW_HASH_SIZE_BYTES]),
        }
    }

    pub fn set_solving(&self, solving: bool) {
        *self.hash.lock() = if solving {
            [0u8; POW_HASH_SIZE_BYTES]
        } else {
            [0xffu8; POW_HASH_SIZE_BYTES]
        };
    }
}

impl PowHasher for TestHasher {
    fn hash(
        &self,
        _password: &[u8],
        _salt: &[u8],
        _cost: PowCost,
    ) -> PowResult<[u8; POW_HASH_SIZE_BYTES]> {
        Ok(*self.hash.lock())
    }
}

/// Collaborators handed to the pool
pub struct PoolTestContext {
    pub block_store: Arc<InMemoryBlockStore>,
    pub wallet_state: Arc<WalletState>,
    pub storage: Arc<InMemoryTransactionStorage>,
    pub status: Arc<NodeStatus>,
    pub hasher: Arc<TestHasher>,
    pub channels: PoolChannels,
}

impl PoolTestContext {
    /// Appends `count` blocks signed by `signers` on top of the chain
    pub fn extend_chain(&self, count: u64, signers: &[&KeyPair]) {
        for _ in 0..count {
            let last = self.block_store.get_last_block();
            let block_num = last.as_ref().map_or(1, |block| block.block_num + 1);
            let mut block = Block::new(
                block_num,
                3,
                last.map_or(Hash::ZERO, |block| block.checksum),
                Hash::ZERO,
                Vec::new(),
                DIFFICULTY,
                IxianTime::from_secs(block_num * 30),
            );
            for signer in signers {
                block.add_signature(signer);
            }
            self.block_store.append_block(block, true).unwrap();
        }
    }

    /// Next block of the chain, including `transactions`, not appended
    pub fn next_block(&self, transactions: &[&Transaction]) -> Block {
        let last = self.block_store.get_last_block();
        Block::new(
            last.as_ref().map_or(1, |block| block.block_num + 1),
            3,
            last.map_or(Hash::ZERO, |block| block.checksum),
            Hash::ZERO,
            transactions.iter().map(|tx| tx.id.clone()).collect(),
            DIFFICULTY,
            IxianTime::from_secs(0),
        )
    }

    pub fn balance(&self, address: &Address) -> Amount {
        use ixian_ledger_exports::WalletStateStore;
        self.wallet_state.get_wallet(address, false).balance
    }

    pub fn fund(&self, address: &Address, amount: Amount) {
        use ixian_ledger_exports::WalletStateStore;
        self.wallet_state.set_balance(address, amount, false);
    }
}

/// Pool config without background pruning
pub fn test_config() -> PoolConfig {
    PoolConfig {
        prune_interval: IxianTime::from_secs(3600),
        ..PoolConfig::default()
    }
}

/// Transport accepting every broadcast
pub fn permissive_transport() -> MockPeerTransport {
    let mut transport = MockPeerTransport::new();
    transport
        .expect_broadcast_transaction()
        .returning(|_, _| true);
    transport
        .expect_broadcast_get_transaction()
        .returning(|_, _| true);
    transport
}

/// Starts a pool on a chain of `chain_length` blocks and runs `test` against it
pub fn pool_test<F>(cfg: PoolConfig, chain_length: u64, transport: MockPeerTransport, test: F)
where
    F: FnOnce(Box<dyn PoolManager>, Box<dyn PoolController>, PoolTestContext),
{
    let context = PoolTestContext {
        block_store: Arc::new(InMemoryBlockStore::new()),
        wallet_state: Arc::new(WalletState::new(LedgerConfig {
            redacted_window_size: cfg.redacted_window_size,
            max_saved_states: 10,
        })),
        storage: Arc::new(InMemoryTransactionStorage::new()),
        status: Arc::new(NodeStatus::new()),
        hasher: Arc::new(TestHasher::new()),
        channels: PoolChannels {
            transaction_sender: broadcast::channel(5000).0,
            applied_sender: broadcast::channel(5000).0,
        },
    };
    context.extend_chain(chain_length, &[]);
    let (pool_manager, pool_controller) = start_pool_controller(
        cfg,
        PoolDependencies {
            block_store: context.block_store.clone(),
            wallet_state: context.wallet_state.clone(),
            storage: context.storage.clone(),
            transport: Arc::new(transport),
            status: context.status.clone(),
            hasher: context.hasher.clone(),
        },
        context.channels.clone(),
    );
    test(pool_manager, pool_controller, context)
}

fn content(
    tx_type: TransactionType,
    sender: TransactionSender,
    from_list: Vec<(Vec<u8>, Amount)>,
    to_list: Vec<(Address, Amount)>,
    fee: Amount,
    data: Vec<u8>,
    block_height: u64,
) -> TransactionContent {
    let amount = Amount::checked_sum(to_list.iter().map(|(_, amount)| *amount)).unwrap();
    TransactionContent {
        version: 3,
        tx_type,
        amount,
        fee,
        from_list,
        to_list,
        data,
        block_height,
        nonce: 0,
        timestamp: IxianTime::from_secs(block_height),
        sender,
    }
}

pub fn address_of(keypair: &KeyPair) -> Address {
    Address::from_public_key(&keypair.get_public_key())
}

/// Signed transfer of `amount` from the main address of `keypair`
pub fn transfer(
    keypair: &KeyPair,
    to: &Address,
    amount: Amount,
    fee: Amount,
    block_height: u64,
) -> Transaction {
    let content = content(
        TransactionType::Normal,
        TransactionSender::PublicKey(keypair.get_public_key()),
        vec![(vec![0], amount.checked_add(fee).unwrap())],
        vec![(to.clone(), amount)],
        fee,
        Vec::new(),
        block_height,
    );
    Transaction::new_signed(content, keypair).unwrap()
}

pub fn genesis(to: &Address, amount: Amount, block_height: u64) -> Transaction {
    let content = content(
        TransactionType::Genesis,
        TransactionSender::PublicKey(KeyPair::generate().get_public_key()),
        vec![(vec![0], amount)],
        vec![(to.clone(), amount)],
        Amount::zero(),
        Vec::new(),
        block_height,
    );
    Transaction::new(content).unwrap()
}

pub fn pow_solution(
    keypair: &KeyPair,
    solved_block: u64,
    nonce: &str,
    block_height: u64,
) -> Transaction {
    let content = content(
        TransactionType::PoWSolution,
        TransactionSender::PublicKey(keypair.get_public_key()),
        vec![(vec![0], Amount::zero())],
        vec![(INFINIMINE.clone(), Amount::zero())],
        Amount::zero(),
        TransactionPayload::pow_solution_data(solved_block, nonce).unwrap(),
        block_height,
    );
    Transaction::new_signed(content, keypair).unwrap()
}

pub fn staking(rewards: Vec<(Address, Amount)>, target_block: u64, block_height: u64) -> Transaction {
    let total = Amount::checked_sum(rewards.iter().map(|(_, amount)| *amount)).unwrap();
    let content = content(
        TransactionType::StakingReward,
        TransactionSender::PublicKey(KeyPair::generate().get_public_key()),
        vec![(vec![0], total)],
        rewards,
        Amount::zero(),
        TransactionPayload::staking_data(target_block),
        block_height,
    );
    Transaction::new(content).unwrap()
}

fn multisig(
    tx_type: TransactionType,
    wallet: &Address,
    signer: &KeyPair,
    operation: MultisigOperation,
    to_list: Vec<(Address, Amount)>,
    block_height: u64,
) -> Transaction {
    let payload = MultisigPayload {
        operation,
        signer_pub_key: signer.get_public_key(),
        signer_nonce: vec![0],
    };
    let spent = Amount::checked_sum(to_list.iter().map(|(_, amount)| *amount))
        .and_then(|amount| amount.checked_add(FEE))
        .unwrap();
    let content = content(
        tx_type,
        TransactionSender::Address(wallet.clone()),
        vec![(vec![0], spent)],
        to_list,
        FEE,
        TransactionPayload::multisig_data(&payload).unwrap(),
        block_height,
    );
    Transaction::new_signed(content, signer).unwrap()
}

/// Spend from multisig `wallet`, signed by `signer`
pub fn multisig_spend(
    wallet: &Address,
    signer: &KeyPair,
    to: &Address,
    amount: Amount,
    block_height: u64,
) -> Transaction {
    multisig(
        TransactionType::MultisigTX,
        wallet,
        signer,
        MultisigOperation::Transaction { orig_tx_id: None },
        vec![(to.clone(), amount)],
        block_height,
    )
}

/// Reconfiguration of multisig `wallet`, signed by `signer`
pub fn multisig_change(
    wallet: &Address,
    signer: &KeyPair,
    operation: MultisigOperation,
    block_height: u64,
) -> Transaction {
    multisig(
        TransactionType::ChangeMultisigWallet,
        wallet,
        signer,
        operation,
        Vec::new(),
        block_height,
    )
}

/// Co-signature of `origin` by `signer`
pub fn co_signature(
    wallet: &Address,
    signer: &KeyPair,
    origin: &TransactionId,
    block_height: u64,
) -> Transaction {
    multisig(
        TransactionType::MultisigAddTxSignature,
        wallet,
        signer,
        MultisigOperation::Transaction {
            orig_tx_id: Some(origin.clone()),
        },
        Vec::new(),
        block_height,
    )
}
