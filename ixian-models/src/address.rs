// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use ixian_hash::sha512_sq_trunc;
use ixian_serialization::{
    BytesDeserializer, BytesSerializer, Deserializer, SerializeError, Serializer,
};
use ixian_signature::PublicKey;
use nom::error::{context, ContextError, ErrorKind, ParseError};
use nom::IResult;
use std::str::FromStr;

/// Version byte of addresses derived by this node
pub const ADDRESS_VERSION: u8 = 1;
/// Length of the public key digest carried by an address
pub const ADDRESS_DIGEST_SIZE_BYTES: usize = 44;
/// Length of the trailing checksum
pub const ADDRESS_CHECKSUM_SIZE_BYTES: usize = 3;
/// Size of an address derived by this node: version + digest + checksum
pub const ADDRESS_SIZE_BYTES: usize = 1 + ADDRESS_DIGEST_SIZE_BYTES + ADDRESS_CHECKSUM_SIZE_BYTES;
/// Largest address accepted from the wire, older address versions are shorter
pub const ADDRESS_MAX_SIZE_BYTES: usize = 64;

/// Wallet address: a version byte, a digest of the owner's public key and a checksum.
///
/// Addresses of older versions (36 bytes) are still carried by the chain,
/// so the length is not fixed.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(Vec<u8>);

impl Address {
    /// Derives the primary address of a public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self::from_digest_source(&public_key.to_bytes())
    }

    fn from_digest_source(source: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(ADDRESS_SIZE_BYTES);
        bytes.push(ADDRESS_VERSION);
        bytes.extend(sha512_sq_trunc(source, ADDRESS_DIGEST_SIZE_BYTES));
        let checksum = sha512_sq_trunc(&bytes, ADDRESS_CHECKSUM_SIZE_BYTES);
        bytes.extend(checksum);
        Address(bytes)
    }

    /// Derives the address of one of the sub-wallets of `self`.
    ///
    /// An empty nonce or the single byte nonce `[0]` designates the primary address itself.
    /// ```
    /// # use ixian_models::address::Address;
    /// # use ixian_signature::KeyPair;
    /// let primary = Address::from_public_key(&KeyPair::generate().get_public_key());
    /// assert_eq!(primary.with_nonce(&[0]), primary);
    /// assert_ne!(primary.with_nonce(&[7u8; 16]), primary);
    /// assert!(primary.with_nonce(&[7u8; 16]).validate_checksum());
    /// ```
    pub fn with_nonce(&self, nonce: &[u8]) -> Self {
        if nonce.is_empty() || nonce == [0] {
            return self.clone();
        }
        let mut source = self.0.clone();
        source.extend_from_slice(nonce);
        Self::from_digest_source(&source)
    }

    /// Returns true if the trailing checksum matches the rest of the address
    pub fn validate_checksum(&self) -> bool {
        Self::validate_checksum_bytes(&self.0)
    }

    /// Checksum validation on raw bytes
    pub fn validate_checksum_bytes(bytes: &[u8]) -> bool {
        if bytes.len() <= ADDRESS_CHECKSUM_SIZE_BYTES || bytes.len() > ADDRESS_MAX_SIZE_BYTES {
            return false;
        }
        let split = bytes.len() - ADDRESS_CHECKSUM_SIZE_BYTES;
        sha512_sq_trunc(&bytes[..split], ADDRESS_CHECKSUM_SIZE_BYTES) == bytes[split..]
    }

    /// Raw bytes
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Builds an address from raw bytes, without validating the checksum
    pub fn from_bytes(data: &[u8]) -> Result<Address, ModelsError> {
        if data.is_empty() || data.len() > ADDRESS_MAX_SIZE_BYTES {
            return Err(ModelsError::AddressParseError(format!(
                "invalid address length {}",
                data.len()
            )));
        }
        Ok(Address(data.to_vec()))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(&self.0).into_string())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for Address {
    type Err = ModelsError;

    /// Plain base58, the checksum lives inside the address bytes
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|err| ModelsError::AddressParseError(err.to_string()))?;
        Address::from_bytes(&bytes)
    }
}

impl ::serde::Serialize for Address {
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> ::serde::Deserialize<'de> for Address {
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<Address, D::Error> {
        let text = String::deserialize(d)?;
        Address::from_str(&text).map_err(::serde::de::Error::custom)
    }
}

/// Serializer for `Address`, length prefixed bytes
#[derive(Default, Clone)]
pub struct AddressSerializer {
    bytes_serializer: BytesSerializer,
}

impl AddressSerializer {
    /// Creates a new `AddressSerializer`
    pub const fn new() -> Self {
        Self {
            bytes_serializer: BytesSerializer::new(),
        }
    }
}

impl Serializer<Address> for AddressSerializer {
    fn serialize(&self, value: &Address, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.bytes_serializer.serialize(&value.0, buffer)
    }
}

/// Deserializer for `Address`
#[derive(Clone)]
pub struct AddressDeserializer {
    bytes_deserializer: BytesDeserializer,
}

impl AddressDeserializer {
    /// Creates a new `AddressDeserializer`
    pub const fn new() -> Self {
        Self {
            bytes_deserializer: BytesDeserializer::new(ADDRESS_MAX_SIZE_BYTES),
        }
    }
}

impl Default for AddressDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<Address> for AddressDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Address, E> {
        context("Failed address deserialization", |input: &'a [u8]| {
            let (rest, bytes) = self.bytes_deserializer.deserialize::<E>(input)?;
            if bytes.is_empty() {
                return Err(nom::Err::Error(E::from_error_kind(input, ErrorKind::Verify)));
            }
            Ok((rest, Address(bytes)))
        })(buffer)
    }
}
