// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::address::Address;
use crate::amount::Amount;
use ixian_signature::PublicKey;
use serde::{Deserialize, Serialize};

/// Kind of wallet
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WalletType {
    #[default]
    Normal,
    Multisig,
}

/// Ledger entry of an address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// address of the wallet
    pub id: Address,
    /// spendable balance
    pub balance: Amount,
    /// normal or multisig
    pub wallet_type: WalletType,
    /// signatures needed to spend from a multisig wallet
    pub required_sigs: u8,
    /// co-signers besides the owner
    pub allowed_signers: Vec<Address>,
    /// owner key, known once the owner sent a transaction
    pub public_key: Option<PublicKey>,
    /// free form data
    pub data: Option<Vec<u8>>,
}

impl Wallet {
    /// Empty normal wallet
    pub fn new(id: Address) -> Self {
        Wallet {
            id,
            balance: Amount::zero(),
            wallet_type: WalletType::Normal,
            required_sigs: 1,
            allowed_signers: Vec::new(),
            public_key: None,
            data: None,
        }
    }

    /// The owner and the allowed co-signers may sign for the wallet
    pub fn is_valid_signer(&self, address: &Address) -> bool {
        &self.id == address || self.allowed_signers.contains(address)
    }

    /// Allows a co-signer, returns false if already allowed
    pub fn add_valid_signer(&mut self, address: Address) -> bool {
        if self.is_valid_signer(&address) {
            return false;
        }
        self.allowed_signers.push(address);
        true
    }

    /// Revokes a co-signer, returns false if not allowed
    pub fn del_valid_signer(&mut self, address: &Address) -> bool {
        let before = self.allowed_signers.len();
        self.allowed_signers.retain(|signer| signer != address);
        self.allowed_signers.len() != before
    }

    /// Number of co-signers, the owner excluded
    pub fn count_allowed_signers(&self) -> usize {
        self.allowed_signers.len()
    }

    /// An untouched wallet carries no information and is not stored
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero()
            && self.wallet_type == WalletType::Normal
            && self.allowed_signers.is_empty()
            && self.public_key.is_none()
            && self.data.is_none()
    }

    /// Canonical bytes fed to the wallet state checksum
    pub fn checksum_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(128);
        bytes.extend_from_slice(&(self.id.to_bytes().len() as u32).to_le_bytes());
        bytes.extend_from_slice(self.id.to_bytes());
        bytes.extend_from_slice(&self.balance.to_raw().to_le_bytes());
        bytes.push(match self.wallet_type {
            WalletType::Normal => 0,
            WalletType::Multisig => 1,
        });
        bytes.push(self.required_sigs);
        bytes.extend_from_slice(&(self.allowed_signers.len() as u32).to_le_bytes());
        for signer in &self.allowed_signers {
            bytes.extend_from_slice(&(signer.to_bytes().len() as u32).to_le_bytes());
            bytes.extend_from_slice(signer.to_bytes());
        }
        match &self.public_key {
            Some(public_key) => {
                bytes.push(1);
                bytes.extend_from_slice(&public_key.to_bytes());
            }
            None => bytes.push(0),
        }
        match &self.data {
            Some(data) => {
                bytes.push(1);
                bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
                bytes.extend_from_slice(data);
            }
            None => bytes.push(0),
        }
        bytes
    }
}

/// A slice of the wallet state handed to syncing peers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStateChunk {
    /// index of the chunk
    pub chunk_num: u64,
    /// height the wallet state was captured at
    pub block_num: u64,
    /// wallets of the chunk
    pub wallets: Vec<Wallet>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ixian_signature::KeyPair;

    fn address() -> Address {
        Address::from_public_key(&KeyPair::generate().get_public_key())
    }

    #[test]
    fn test_signers() {
        let owner = address();
        let mut wallet = Wallet::new(owner.clone());
        assert!(wallet.is_valid_signer(&owner));
        assert!(!wallet.add_valid_signer(owner));

        let cosigner = address();
        assert!(!wallet.is_valid_signer(&cosigner));
        assert!(wallet.add_valid_signer(cosigner.clone()));
        assert!(!wallet.add_valid_signer(cosigner.clone()));
        assert_eq!(wallet.count_allowed_signers(), 1);
        assert!(wallet.del_valid_signer(&cosigner));
        assert!(!wallet.del_valid_signer(&cosigner));
        assert_eq!(wallet.count_allowed_signers(), 0);
    }

    #[test]
    fn test_checksum_bytes_depend_on_content() {
        let mut wallet = Wallet::new(address());
        assert!(wallet.is_empty());
        let before = wallet.checksum_bytes();
        wallet.balance = Amount::from_raw(1);
        assert!(!wallet.is_empty());
        assert_ne!(wallet.checksum_bytes(), before);
    }
}
