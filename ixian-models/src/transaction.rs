// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::address::{Address, AddressDeserializer, AddressSerializer};
use crate::amount::Amount;
use crate::config::{
    MAX_ADDRESS_NONCE_LENGTH, MAX_ORIGIN_TRANSACTION_ID_LENGTH, MAX_SIGNER_PUBLIC_KEY_LENGTH,
    STAKING_TRANSACTION_ID_PREFIX,
};
use crate::error::{ModelsError, ModelsResult};
use ixian_hash::Hash;
use ixian_serialization::{
    BinaryStringDeserializer, BinaryStringSerializer, BytesDeserializer, BytesSerializer,
    Deserializer, SerializeError, Serializer, U64VarIntDeserializer, U64VarIntSerializer,
};
use ixian_signature::{
    KeyPair, PublicKey, Signature, PUBLIC_KEY_SIZE_BYTES, SIGNATURE_SIZE_BYTES,
};
use ixian_time::IxianTime;
use nom::bytes::complete::take;
use nom::error::{context, ContextError, ErrorKind, ParseError};
use nom::number::complete::{le_i32, le_u64, u8 as parse_u8};
use nom::IResult;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Bound::Included;
use std::str::FromStr;

/// Most from or to entries a transaction may carry
pub const MAX_TRANSACTION_ENTRIES: u64 = 1024;
/// Largest data blob a transaction may carry
pub const MAX_TRANSACTION_DATA_SIZE: usize = 64 * 1024;
/// Largest nonce string accepted in a PoW solution payload, the verification bounds are tighter
pub const MAX_POW_NONCE_DATA_LENGTH: u64 = 1024;
/// Transaction size unit the minimum fee is charged for
pub const FEE_SIZE_UNIT_BYTES: usize = 1024;

/// Kind of a transaction
#[allow(missing_docs)]
#[derive(
    IntoPrimitive,
    TryFromPrimitive,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum TransactionType {
    Normal = 0,
    PoWSolution = 1,
    StakingReward = 2,
    Genesis = 3,
    MultisigTX = 4,
    ChangeMultisigWallet = 5,
    MultisigAddTxSignature = 6,
}

impl TransactionType {
    /// Types whose sender is a multisig wallet
    pub fn is_multisig(&self) -> bool {
        matches!(
            self,
            TransactionType::MultisigTX
                | TransactionType::ChangeMultisigWallet
                | TransactionType::MultisigAddTxSignature
        )
    }

    /// Wallet reconfiguration and co-signing may move no coins
    pub fn allows_zero_amount(&self) -> bool {
        matches!(
            self,
            TransactionType::PoWSolution
                | TransactionType::ChangeMultisigWallet
                | TransactionType::MultisigAddTxSignature
        )
    }

    /// Types created by the network itself rather than by a wallet owner
    pub fn is_network_generated(&self) -> bool {
        matches!(
            self,
            TransactionType::PoWSolution | TransactionType::StakingReward | TransactionType::Genesis
        )
    }
}

/// Transaction identifier: `{block_height}-{checksum}`, or `stk-{target_block}-{checksum}` for staking rewards
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    fn for_content(
        content: &TransactionContent,
        payload: &TransactionPayload,
        checksum: &Hash,
    ) -> Self {
        match payload {
            TransactionPayload::Staking { target_block } => TransactionId(format!(
                "{}-{}-{}",
                STAKING_TRANSACTION_ID_PREFIX, target_block, checksum
            )),
            _ => TransactionId(format!("{}-{}", content.block_height, checksum)),
        }
    }

    /// Staking reward ids carry the `stk` prefix
    pub fn is_staking(&self) -> bool {
        self.0.starts_with(STAKING_TRANSACTION_ID_PREFIX)
    }

    /// Target block of a staking reward id
    /// ```
    /// # use ixian_models::transaction::TransactionId;
    /// assert_eq!(TransactionId::from("stk-42-abc").staking_target(), Some(42));
    /// assert_eq!(TransactionId::from("42-abc").staking_target(), None);
    /// assert_eq!(TransactionId::from("stk-x-abc").staking_target(), None);
    /// ```
    pub fn staking_target(&self) -> Option<u64> {
        if !self.is_staking() {
            return None;
        }
        self.0.split('-').nth(1)?.parse().ok()
    }

    /// String form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        TransactionId(value.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        TransactionId(value)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who sent a transaction.
/// The public key may be replaced by the primary address once the ledger knows the key.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionSender {
    PublicKey(PublicKey),
    Address(Address),
}

impl TransactionSender {
    /// Primary address of the sender
    pub fn primary_address(&self) -> Address {
        match self {
            TransactionSender::PublicKey(public_key) => Address::from_public_key(public_key),
            TransactionSender::Address(address) => address.clone(),
        }
    }

    /// Public key carried by the transaction, if any
    pub fn public_key(&self) -> Option<&PublicKey> {
        match self {
            TransactionSender::PublicKey(public_key) => Some(public_key),
            TransactionSender::Address(_) => None,
        }
    }
}

/// Signed part of a transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContent {
    /// transaction format version
    pub version: u32,
    /// kind of transaction, selects how `data` is decoded
    pub tx_type: TransactionType,
    /// total amount credited to the `to_list`
    pub amount: Amount,
    /// fee paid on top of `amount`
    pub fee: Amount,
    /// (address nonce, amount) debited from sub-wallets of the sender
    pub from_list: Vec<(Vec<u8>, Amount)>,
    /// (recipient, amount) credits
    pub to_list: Vec<(Address, Amount)>,
    /// type dependent payload
    pub data: Vec<u8>,
    /// chain height the transaction was created at
    pub block_height: u64,
    /// random value making otherwise identical transactions distinct
    pub nonce: i32,
    /// creation time
    pub timestamp: IxianTime,
    /// sender public key or primary address
    pub sender: TransactionSender,
}

/// Multisig operation carried by the three multisig transaction types
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultisigOperation {
    /// Spend from the wallet (`None`) or co-sign the spend or reconfiguration `orig_tx_id`
    Transaction {
        /// origin transaction being co-signed
        orig_tx_id: Option<TransactionId>,
    },
    /// Allow a new co-signer
    AddSigner {
        /// co-signer to allow
        address: Address,
    },
    /// Revoke a co-signer
    DelSigner {
        /// co-signer to revoke
        address: Address,
    },
    /// Change the number of signatures required to use the wallet
    ChangeRequiredSigs {
        /// new threshold
        required: u8,
    },
}

#[derive(IntoPrimitive, TryFromPrimitive, Debug, Eq, PartialEq)]
#[repr(u8)]
enum MultisigOperationId {
    Transaction = 0,
    AddSigner = 1,
    DelSigner = 2,
    ChangeRequiredSigs = 3,
}

/// Decoded multisig data: the operation and who signed it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigPayload {
    /// requested operation
    pub operation: MultisigOperation,
    /// key of the co-signer that signed this transaction
    pub signer_pub_key: PublicKey,
    /// address nonce of the co-signer
    pub signer_nonce: Vec<u8>,
}

impl MultisigPayload {
    /// Address of the co-signer
    pub fn signer_address(&self) -> Address {
        Address::from_public_key(&self.signer_pub_key).with_nonce(&self.signer_nonce)
    }

    /// Origin transaction co-signed by this payload, if any
    pub fn orig_tx_id(&self) -> Option<&TransactionId> {
        match &self.operation {
            MultisigOperation::Transaction { orig_tx_id } => orig_tx_id.as_ref(),
            _ => None,
        }
    }
}

/// `data` of a transaction, decoded once according to its type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPayload {
    /// opaque or empty data
    None,
    /// solution of the PoW of block `block_num`
    PowSolution {
        /// solved block
        block_num: u64,
        /// hex nonce
        nonce: String,
    },
    /// staking reward for signing `target_block`
    Staking {
        /// signed block
        target_block: u64,
    },
    /// multisig operation
    Multisig(MultisigPayload),
}

impl TransactionPayload {
    /// Decodes `data` as required by `tx_type`
    pub fn decode(tx_type: TransactionType, data: &[u8]) -> ModelsResult<Self> {
        let invalid = |reason: String| ModelsError::InvalidPayload(format!("{:?}", tx_type), reason);
        match tx_type {
            TransactionType::PoWSolution => {
                let (_, payload) = PowSolutionDeserializer::new()
                    .deserialize::<nom::error::Error<&[u8]>>(data)
                    .map_err(|err| invalid(err.to_string()))?;
                Ok(payload)
            }
            TransactionType::StakingReward => {
                let (_, target_block) = le_u64::<_, nom::error::Error<&[u8]>>(data)
                    .map_err(|err| invalid(err.to_string()))?;
                Ok(TransactionPayload::Staking { target_block })
            }
            TransactionType::MultisigTX
            | TransactionType::MultisigAddTxSignature
            | TransactionType::ChangeMultisigWallet => {
                let (_, payload) = MultisigPayloadDeserializer::new()
                    .deserialize::<nom::error::Error<&[u8]>>(data)
                    .map_err(|err| invalid(err.to_string()))?;
                let consistent = match (&payload.operation, tx_type) {
                    (MultisigOperation::Transaction { orig_tx_id }, TransactionType::MultisigTX) => {
                        orig_tx_id.is_none()
                    }
                    (
                        MultisigOperation::Transaction { orig_tx_id },
                        TransactionType::MultisigAddTxSignature,
                    ) => orig_tx_id.is_some(),
                    (MultisigOperation::Transaction { .. }, _) => false,
                    (_, TransactionType::ChangeMultisigWallet) => true,
                    _ => false,
                };
                if !consistent {
                    return Err(invalid("operation does not match the type".to_string()));
                }
                Ok(TransactionPayload::Multisig(payload))
            }
            TransactionType::Normal | TransactionType::Genesis => Ok(TransactionPayload::None),
        }
    }

    /// Encodes a PoW solution payload: `u64` LE block number then the nonce as a binary string
    /// ```
    /// # use ixian_models::transaction::{TransactionPayload, TransactionType};
    /// let data = TransactionPayload::pow_solution_data(7, "0a1b").unwrap();
    /// assert_eq!(&data[..8], &7u64.to_le_bytes());
    /// assert_eq!(&data[8..], &[4, b'0', b'a', b'1', b'b']);
    /// assert_eq!(
    ///     TransactionPayload::decode(TransactionType::PoWSolution, &data).unwrap(),
    ///     TransactionPayload::PowSolution { block_num: 7, nonce: "0a1b".to_string() }
    /// );
    /// ```
    pub fn pow_solution_data(block_num: u64, nonce: &str) -> Result<Vec<u8>, SerializeError> {
        let mut buffer = block_num.to_le_bytes().to_vec();
        BinaryStringSerializer::new().serialize(&nonce.to_string(), &mut buffer)?;
        Ok(buffer)
    }

    /// Encodes a staking reward payload: the `u64` LE target block
    pub fn staking_data(target_block: u64) -> Vec<u8> {
        target_block.to_le_bytes().to_vec()
    }

    /// Encodes a multisig payload
    pub fn multisig_data(payload: &MultisigPayload) -> Result<Vec<u8>, SerializeError> {
        let mut buffer = Vec::new();
        MultisigPayloadSerializer::new().serialize(payload, &mut buffer)?;
        Ok(buffer)
    }
}

/// Deserializer for the PoW solution payload
#[derive(Clone)]
pub struct PowSolutionDeserializer {
    nonce_deserializer: BinaryStringDeserializer,
}

impl PowSolutionDeserializer {
    /// Creates a new `PowSolutionDeserializer`
    pub const fn new() -> Self {
        Self {
            nonce_deserializer: BinaryStringDeserializer::new(MAX_POW_NONCE_DATA_LENGTH),
        }
    }
}

impl Default for PowSolutionDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<TransactionPayload> for PowSolutionDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], TransactionPayload, E> {
        context("Failed PoW solution deserialization", |input: &'a [u8]| {
            let (rest, block_num) = le_u64::<_, E>(input)?;
            let (rest, nonce) = self.nonce_deserializer.deserialize::<E>(rest)?;
            Ok((rest, TransactionPayload::PowSolution { block_num, nonce }))
        })(buffer)
    }
}

/// Serializer for `MultisigPayload`
#[derive(Clone, Default)]
pub struct MultisigPayloadSerializer {
    string_serializer: BinaryStringSerializer,
    bytes_serializer: BytesSerializer,
    address_serializer: AddressSerializer,
}

impl MultisigPayloadSerializer {
    /// Creates a new `MultisigPayloadSerializer`
    pub const fn new() -> Self {
        Self {
            string_serializer: BinaryStringSerializer::new(),
            bytes_serializer: BytesSerializer::new(),
            address_serializer: AddressSerializer::new(),
        }
    }
}

impl Serializer<MultisigPayload> for MultisigPayloadSerializer {
    fn serialize(&self, value: &MultisigPayload, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        match &value.operation {
            MultisigOperation::Transaction { orig_tx_id } => {
                buffer.push(MultisigOperationId::Transaction.into());
                let orig = orig_tx_id
                    .as_ref()
                    .map(|id| id.as_str().to_string())
                    .unwrap_or_default();
                self.string_serializer.serialize(&orig, buffer)?;
            }
            MultisigOperation::AddSigner { address } => {
                buffer.push(MultisigOperationId::AddSigner.into());
                self.address_serializer.serialize(address, buffer)?;
            }
            MultisigOperation::DelSigner { address } => {
                buffer.push(MultisigOperationId::DelSigner.into());
                self.address_serializer.serialize(address, buffer)?;
            }
            MultisigOperation::ChangeRequiredSigs { required } => {
                buffer.push(MultisigOperationId::ChangeRequiredSigs.into());
                buffer.push(*required);
            }
        }
        self.bytes_serializer
            .serialize(&value.signer_pub_key.to_bytes().to_vec(), buffer)?;
        self.bytes_serializer.serialize(&value.signer_nonce, buffer)
    }
}

/// Deserializer for `MultisigPayload`
#[derive(Clone)]
pub struct MultisigPayloadDeserializer {
    orig_tx_id_deserializer: BinaryStringDeserializer,
    address_deserializer: AddressDeserializer,
    public_key_deserializer: BytesDeserializer,
    nonce_deserializer: BytesDeserializer,
}

impl MultisigPayloadDeserializer {
    /// Creates a new `MultisigPayloadDeserializer`
    pub const fn new() -> Self {
        Self {
            orig_tx_id_deserializer: BinaryStringDeserializer::new(
                MAX_ORIGIN_TRANSACTION_ID_LENGTH as u64,
            ),
            address_deserializer: AddressDeserializer::new(),
            public_key_deserializer: BytesDeserializer::new(MAX_SIGNER_PUBLIC_KEY_LENGTH),
            nonce_deserializer: BytesDeserializer::new(MAX_ADDRESS_NONCE_LENGTH),
        }
    }
}

impl Default for MultisigPayloadDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<MultisigPayload> for MultisigPayloadDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], MultisigPayload, E> {
        context("Failed multisig payload deserialization", |input: &'a [u8]| {
            let (rest, tag) = parse_u8::<_, E>(input)?;
            let id = MultisigOperationId::try_from(tag)
                .map_err(|_| nom::Err::Error(E::from_error_kind(input, ErrorKind::Tag)))?;
            let (rest, operation) = match id {
                MultisigOperationId::Transaction => {
                    let (rest, orig) = self.orig_tx_id_deserializer.deserialize::<E>(rest)?;
                    let orig_tx_id = if orig.is_empty() {
                        None
                    } else {
                        Some(TransactionId(orig))
                    };
                    (rest, MultisigOperation::Transaction { orig_tx_id })
                }
                MultisigOperationId::AddSigner => {
                    let (rest, address) = self.address_deserializer.deserialize::<E>(rest)?;
                    (rest, MultisigOperation::AddSigner { address })
                }
                MultisigOperationId::DelSigner => {
                    let (rest, address) = self.address_deserializer.deserialize::<E>(rest)?;
                    (rest, MultisigOperation::DelSigner { address })
                }
                MultisigOperationId::ChangeRequiredSigs => {
                    let (rest, required) = parse_u8::<_, E>(rest)?;
                    (rest, MultisigOperation::ChangeRequiredSigs { required })
                }
            };
            let (rest, key_bytes) = self.public_key_deserializer.deserialize::<E>(rest)?;
            let signer_pub_key = PublicKey::from_bytes(&key_bytes)
                .map_err(|_| nom::Err::Error(E::from_error_kind(rest, ErrorKind::Verify)))?;
            let (rest, signer_nonce) = self.nonce_deserializer.deserialize::<E>(rest)?;
            Ok((
                rest,
                MultisigPayload {
                    operation,
                    signer_pub_key,
                    signer_nonce,
                },
            ))
        })(buffer)
    }
}

const SENDER_PUBLIC_KEY_TAG: u8 = 0;
const SENDER_ADDRESS_TAG: u8 = 1;

/// Serializer for `TransactionContent`, also the input of the checksum
#[derive(Clone, Default)]
pub struct TransactionContentSerializer {
    u64_serializer: U64VarIntSerializer,
    bytes_serializer: BytesSerializer,
    address_serializer: AddressSerializer,
}

impl TransactionContentSerializer {
    /// Creates a new `TransactionContentSerializer`
    pub const fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
            bytes_serializer: BytesSerializer::new(),
            address_serializer: AddressSerializer::new(),
        }
    }
}

impl Serializer<TransactionContent> for TransactionContentSerializer {
    fn serialize(
        &self,
        value: &TransactionContent,
        buffer: &mut Vec<u8>,
    ) -> Result<(), SerializeError> {
        self.u64_serializer.serialize(&(value.version as u64), buffer)?;
        buffer.push(value.tx_type.into());
        self.u64_serializer.serialize(&value.amount.to_raw(), buffer)?;
        self.u64_serializer.serialize(&value.fee.to_raw(), buffer)?;
        self.u64_serializer
            .serialize(&(value.from_list.len() as u64), buffer)?;
        for (nonce, amount) in &value.from_list {
            self.bytes_serializer.serialize(nonce, buffer)?;
            self.u64_serializer.serialize(&amount.to_raw(), buffer)?;
        }
        self.u64_serializer
            .serialize(&(value.to_list.len() as u64), buffer)?;
        for (address, amount) in &value.to_list {
            self.address_serializer.serialize(address, buffer)?;
            self.u64_serializer.serialize(&amount.to_raw(), buffer)?;
        }
        self.bytes_serializer.serialize(&value.data, buffer)?;
        self.u64_serializer.serialize(&value.block_height, buffer)?;
        buffer.extend_from_slice(&value.nonce.to_le_bytes());
        self.u64_serializer
            .serialize(&value.timestamp.to_millis(), buffer)?;
        match &value.sender {
            TransactionSender::PublicKey(public_key) => {
                buffer.push(SENDER_PUBLIC_KEY_TAG);
                buffer.extend_from_slice(&public_key.to_bytes());
            }
            TransactionSender::Address(address) => {
                buffer.push(SENDER_ADDRESS_TAG);
                self.address_serializer.serialize(address, buffer)?;
            }
        }
        Ok(())
    }
}

/// Deserializer for `TransactionContent`
#[derive(Clone)]
pub struct TransactionContentDeserializer {
    version_deserializer: U64VarIntDeserializer,
    u64_deserializer: U64VarIntDeserializer,
    count_deserializer: U64VarIntDeserializer,
    nonce_deserializer: BytesDeserializer,
    data_deserializer: BytesDeserializer,
    address_deserializer: AddressDeserializer,
}

impl TransactionContentDeserializer {
    /// Creates a new `TransactionContentDeserializer`
    pub const fn new() -> Self {
        Self {
            version_deserializer: U64VarIntDeserializer::new(Included(0), Included(u32::MAX as u64)),
            u64_deserializer: U64VarIntDeserializer::new(Included(0), Included(u64::MAX)),
            count_deserializer: U64VarIntDeserializer::new(
                Included(0),
                Included(MAX_TRANSACTION_ENTRIES),
            ),
            nonce_deserializer: BytesDeserializer::new(MAX_ADDRESS_NONCE_LENGTH),
            data_deserializer: BytesDeserializer::new(MAX_TRANSACTION_DATA_SIZE),
            address_deserializer: AddressDeserializer::new(),
        }
    }
}

impl Default for TransactionContentDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<TransactionContent> for TransactionContentDeserializer {
    /// ```
    /// # use ixian_models::transaction::*;
    /// # use ixian_models::{address::Address, amount::Amount};
    /// # use ixian_serialization::{DeserializeError, Deserializer, Serializer};
    /// # use ixian_signature::KeyPair;
    /// # use ixian_time::IxianTime;
    /// let keypair = KeyPair::generate();
    /// let content = TransactionContent {
    ///     version: 3,
    ///     tx_type: TransactionType::Normal,
    ///     amount: Amount::from_raw(10),
    ///     fee: Amount::from_raw(1),
    ///     from_list: vec![(vec![0], Amount::from_raw(11))],
    ///     to_list: vec![(Address::from_public_key(&KeyPair::generate().get_public_key()), Amount::from_raw(10))],
    ///     data: vec![],
    ///     block_height: 12,
    ///     nonce: -5,
    ///     timestamp: IxianTime::from_millis(1_000),
    ///     sender: TransactionSender::PublicKey(keypair.get_public_key()),
    /// };
    /// let mut buffer = Vec::new();
    /// TransactionContentSerializer::new().serialize(&content, &mut buffer).unwrap();
    /// let (rest, decoded) = TransactionContentDeserializer::new()
    ///     .deserialize::<DeserializeError>(&buffer)
    ///     .unwrap();
    /// assert!(rest.is_empty());
    /// assert_eq!(decoded, content);
    /// ```
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], TransactionContent, E> {
        context("Failed transaction content deserialization", |input: &'a [u8]| {
            let (rest, version) = self.version_deserializer.deserialize::<E>(input)?;
            let (rest, tag) = parse_u8::<_, E>(rest)?;
            let tx_type = TransactionType::try_from(tag)
                .map_err(|_| nom::Err::Error(E::from_error_kind(rest, ErrorKind::Tag)))?;
            let (rest, amount) = self.u64_deserializer.deserialize::<E>(rest)?;
            let (rest, fee) = self.u64_deserializer.deserialize::<E>(rest)?;

            let (mut rest, from_count) = self.count_deserializer.deserialize::<E>(rest)?;
            let mut from_list = Vec::with_capacity(from_count as usize);
            for _ in 0..from_count {
                let (next, nonce) = self.nonce_deserializer.deserialize::<E>(rest)?;
                let (next, value) = self.u64_deserializer.deserialize::<E>(next)?;
                from_list.push((nonce, Amount::from_raw(value)));
                rest = next;
            }

            let (mut rest, to_count) = self.count_deserializer.deserialize::<E>(rest)?;
            let mut to_list = Vec::with_capacity(to_count as usize);
            for _ in 0..to_count {
                let (next, address) = self.address_deserializer.deserialize::<E>(rest)?;
                let (next, value) = self.u64_deserializer.deserialize::<E>(next)?;
                to_list.push((address, Amount::from_raw(value)));
                rest = next;
            }

            let (rest, data) = self.data_deserializer.deserialize::<E>(rest)?;
            let (rest, block_height) = self.u64_deserializer.deserialize::<E>(rest)?;
            let (rest, nonce) = le_i32::<_, E>(rest)?;
            let (rest, timestamp) = self.u64_deserializer.deserialize::<E>(rest)?;
            let (rest, sender_tag) = parse_u8::<_, E>(rest)?;
            let (rest, sender) = match sender_tag {
                SENDER_PUBLIC_KEY_TAG => {
                    let (next, bytes) = take::<_, _, E>(PUBLIC_KEY_SIZE_BYTES)(rest)?;
                    let public_key = PublicKey::from_bytes(bytes)
                        .map_err(|_| nom::Err::Error(E::from_error_kind(rest, ErrorKind::Verify)))?;
                    (next, TransactionSender::PublicKey(public_key))
                }
                SENDER_ADDRESS_TAG => {
                    let (next, address) = self.address_deserializer.deserialize::<E>(rest)?;
                    (next, TransactionSender::Address(address))
                }
                _ => return Err(nom::Err::Error(E::from_error_kind(rest, ErrorKind::Tag))),
            };
            Ok((
                rest,
                TransactionContent {
                    version: version as u32,
                    tx_type,
                    amount: Amount::from_raw(amount),
                    fee: Amount::from_raw(fee),
                    from_list,
                    to_list,
                    data,
                    block_height,
                    nonce,
                    timestamp: IxianTime::from_millis(timestamp),
                    sender,
                },
            ))
        })(buffer)
    }
}

/// A transaction as held by the pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// signed content
    pub content: TransactionContent,
    /// `content.data` decoded according to `content.tx_type`
    pub payload: TransactionPayload,
    /// identifier
    pub id: TransactionId,
    /// checksum of the serialized content
    pub checksum: Hash,
    /// sender signature over the checksum, none for network generated transactions
    pub signature: Option<Signature>,
    /// 0 while pending, else the number of the block that applied it
    pub applied: u64,
    /// loaded from local storage rather than received from the network
    pub from_local_storage: bool,
    /// the PoW nonce was already verified
    pub pow_verified: bool,
    /// size of the serialized content
    pub content_size: usize,
}

impl Transaction {
    /// Decodes the payload and computes checksum and id of `content`
    pub fn new(content: TransactionContent) -> ModelsResult<Self> {
        let mut seen_nonces = std::collections::HashSet::new();
        if !content.from_list.iter().all(|(nonce, _)| seen_nonces.insert(nonce)) {
            return Err(ModelsError::DuplicateEntry("from nonce".to_string()));
        }
        let mut seen_addresses = std::collections::HashSet::new();
        if !content.to_list.iter().all(|(address, _)| seen_addresses.insert(address)) {
            return Err(ModelsError::DuplicateEntry("to address".to_string()));
        }
        let payload = TransactionPayload::decode(content.tx_type, &content.data)?;
        let mut buffer = Vec::new();
        TransactionContentSerializer::new().serialize(&content, &mut buffer)?;
        let checksum = Hash::compute_from(&buffer);
        let id = TransactionId::for_content(&content, &payload, &checksum);
        Ok(Transaction {
            content,
            payload,
            id,
            checksum,
            signature: None,
            applied: 0,
            from_local_storage: false,
            pow_verified: false,
            content_size: buffer.len(),
        })
    }

    /// Builds and signs a transaction
    pub fn new_signed(content: TransactionContent, keypair: &KeyPair) -> ModelsResult<Self> {
        let mut transaction = Transaction::new(content)?;
        transaction.sign(keypair);
        Ok(transaction)
    }

    /// Signs the checksum
    pub fn sign(&mut self, keypair: &KeyPair) {
        self.signature = Some(keypair.sign(&self.checksum));
    }

    /// Recomputes the checksum of the content and compares it bit for bit
    pub fn verify_checksum(&self) -> bool {
        let mut buffer = Vec::new();
        if TransactionContentSerializer::new()
            .serialize(&self.content, &mut buffer)
            .is_err()
        {
            return false;
        }
        Hash::compute_from(&buffer) == self.checksum
    }

    /// Checks the signature against `public_key`
    pub fn verify_signature(&self, public_key: &PublicKey) -> bool {
        match &self.signature {
            Some(signature) => public_key
                .verify_signature(&self.checksum, signature)
                .is_ok(),
            None => false,
        }
    }

    /// Primary address of the sender
    pub fn primary_address(&self) -> Address {
        self.content.sender.primary_address()
    }

    /// Debited addresses with their amounts
    pub fn from_addresses(&self) -> Vec<(Address, Amount)> {
        let primary = self.primary_address();
        self.content
            .from_list
            .iter()
            .map(|(nonce, amount)| (primary.with_nonce(nonce), *amount))
            .collect()
    }

    /// Sum of the from entries, `None` on overflow
    pub fn total_from(&self) -> Option<Amount> {
        Amount::checked_sum(self.content.from_list.iter().map(|(_, amount)| *amount))
    }

    /// Sum of the to entries, `None` on overflow
    pub fn total_to(&self) -> Option<Amount> {
        Amount::checked_sum(self.content.to_list.iter().map(|(_, amount)| *amount))
    }

    /// Serialized size including the signature, estimated if not signed yet
    pub fn serialized_size(&self) -> usize {
        self.content_size + SIGNATURE_SIZE_BYTES
    }

    /// Fee a transaction of this size must pay at `price` per size unit.
    /// Version 0 transactions pay exactly one unit.
    pub fn minimum_fee(&self, price: Amount) -> Amount {
        if self.content.version == 0 {
            return price;
        }
        let units = self.serialized_size().div_ceil(FEE_SIZE_UNIT_BYTES).max(1);
        price
            .checked_mul_u64(units as u64)
            .unwrap_or(Amount::MAX)
    }

    /// Solved block and nonce of a PoW solution
    pub fn pow_solution(&self) -> Option<(u64, &str)> {
        match &self.payload {
            TransactionPayload::PowSolution { block_num, nonce } => Some((*block_num, nonce)),
            _ => None,
        }
    }

    /// Target block of a staking reward
    pub fn staking_target(&self) -> Option<u64> {
        match &self.payload {
            TransactionPayload::Staking { target_block } => Some(*target_block),
            _ => None,
        }
    }

    /// Multisig payload of the multisig types
    pub fn multisig(&self) -> Option<&MultisigPayload> {
        match &self.payload {
            TransactionPayload::Multisig(payload) => Some(payload),
            _ => None,
        }
    }
}

impl FromStr for TransactionId {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ModelsError::DeserializeError("empty transaction id".to_string()));
        }
        Ok(TransactionId(s.to_string()))
    }
}
