// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::address::Address;
use crate::config::SUPERBLOCK_BLOCK_VERSION;
use crate::transaction::TransactionId;
use ixian_hash::Hash;
use ixian_signature::{KeyPair, PublicKey, Signature};
use ixian_time::IxianTime;
use serde::{Deserialize, Serialize};

/// Attestation of a block by a validator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSignature {
    /// key of the validator
    pub signer: PublicKey,
    /// signature of the block checksum
    pub signature: Signature,
}

impl BlockSignature {
    /// Address of the validator
    pub fn signer_address(&self) -> Address {
        Address::from_public_key(&self.signer)
    }
}

/// A block of the chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// height, gap free once committed
    pub block_num: u64,
    /// block version, selects the validation rules
    pub version: u32,
    /// checksum of the header fields
    pub checksum: Hash,
    /// checksum of the previous block
    pub last_block_checksum: Hash,
    /// wallet state checksum after applying this block
    pub wallet_state_checksum: Hash,
    /// signatures checksum of the block `SIGNATURE_FREEZE_OFFSET` below
    pub signature_freeze_checksum: Option<Hash>,
    /// checksum of the last superblock, only carried by superblocks
    pub last_superblock_checksum: Option<Hash>,
    /// ids of the applied transactions, in application order
    pub transactions: Vec<TransactionId>,
    /// number of the block that paid the PoW reward, `None` while unsolved
    pub pow_field: Option<u64>,
    /// PoW difficulty of this block
    pub difficulty: u64,
    /// creation time
    pub timestamp: IxianTime,
    /// validator attestations
    pub signatures: Vec<BlockSignature>,
    /// read from local storage rather than received from the network
    #[serde(skip)]
    pub from_local_storage: bool,
}

impl Block {
    /// Creates an unsigned block and computes its checksum
    pub fn new(
        block_num: u64,
        version: u32,
        last_block_checksum: Hash,
        wallet_state_checksum: Hash,
        transactions: Vec<TransactionId>,
        difficulty: u64,
        timestamp: IxianTime,
    ) -> Self {
        let mut block = Block {
            block_num,
            version,
            checksum: Hash::ZERO,
            last_block_checksum,
            wallet_state_checksum,
            signature_freeze_checksum: None,
            last_superblock_checksum: None,
            transactions,
            pow_field: None,
            difficulty,
            timestamp,
            signatures: Vec::new(),
            from_local_storage: false,
        };
        block.update_checksum();
        block
    }

    /// Hash of the header fields.
    /// The PoW field and the signatures are not covered: both change after the block is created.
    pub fn compute_checksum(&self) -> Hash {
        let mut data = Vec::with_capacity(256);
        data.extend_from_slice(&self.block_num.to_le_bytes());
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(self.last_block_checksum.to_bytes());
        data.extend_from_slice(self.wallet_state_checksum.to_bytes());
        for optional in [&self.signature_freeze_checksum, &self.last_superblock_checksum] {
            match optional {
                Some(hash) => {
                    data.push(1);
                    data.extend_from_slice(hash.to_bytes());
                }
                None => data.push(0),
            }
        }
        data.extend_from_slice(&(self.transactions.len() as u64).to_le_bytes());
        for id in &self.transactions {
            data.extend_from_slice(&(id.as_str().len() as u64).to_le_bytes());
            data.extend_from_slice(id.as_str().as_bytes());
        }
        data.extend_from_slice(&self.difficulty.to_le_bytes());
        data.extend_from_slice(&self.timestamp.to_millis().to_le_bytes());
        Hash::compute_from(&data)
    }

    /// Recomputes `checksum` after a header field changed
    pub fn update_checksum(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// Checksum of the signatures, in signer address order so that arrival order does not matter
    pub fn compute_signatures_checksum(&self) -> Hash {
        let mut entries: Vec<(Address, [u8; ixian_signature::SIGNATURE_SIZE_BYTES])> = self
            .signatures
            .iter()
            .map(|sig| (sig.signer_address(), sig.signature.to_bytes()))
            .collect();
        entries.sort();
        let mut data = Vec::with_capacity(entries.len() * 112);
        for (address, signature) in entries {
            data.extend_from_slice(address.to_bytes());
            data.extend_from_slice(&signature);
        }
        Hash::compute_from(&data)
    }

    /// Signs the checksum with `keypair`, returns false if this signer already signed
    pub fn add_signature(&mut self, keypair: &KeyPair) -> bool {
        let signer = keypair.get_public_key();
        if self.signatures.iter().any(|sig| sig.signer == signer) {
            return false;
        }
        self.signatures.push(BlockSignature {
            signer,
            signature: keypair.sign(&self.checksum),
        });
        true
    }

    /// Returns true if every signature matches the checksum
    pub fn verify_signatures(&self) -> bool {
        self.signatures.iter().all(|sig| {
            sig.signer
                .verify_signature(&self.checksum, &sig.signature)
                .is_ok()
        })
    }

    /// Addresses of the validators that signed this block
    pub fn signature_wallet_addresses(&self) -> Vec<Address> {
        self.signatures
            .iter()
            .map(BlockSignature::signer_address)
            .collect()
    }

    /// Superblock era blocks without a superblock checksum defer the wallet state check
    pub fn skips_wallet_state_checksum(&self) -> bool {
        self.version >= SUPERBLOCK_BLOCK_VERSION && self.last_superblock_checksum.is_none()
    }

    /// A block is solved once a PoW reward was paid for it
    pub fn is_solved(&self) -> bool {
        self.pow_field.is_some()
    }
}
