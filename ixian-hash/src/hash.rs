// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::IxianHashError;
use ixian_serialization::{Deserializer, SerializeError, Serializer};
use nom::bytes::complete::take;
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use sha2::{Digest, Sha512};
use std::{convert::TryInto, str::FromStr};

/// Hash size
pub const HASH_SIZE_BYTES: usize = 32;

/// blake3 hash of some content
#[derive(Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Hash)]
pub struct Hash([u8; HASH_SIZE_BYTES]);

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58_check())
    }
}

impl Hash {
    /// Hash of 32 zero bytes, used as the previous checksum of the first block
    pub const ZERO: Hash = Hash([0u8; HASH_SIZE_BYTES]);

    /// Compute a hash from data.
    ///
    /// # Example
    ///  ```
    /// # use ixian_hash::Hash;
    /// let hash = Hash::compute_from(&"hello world".as_bytes());
    /// ```
    pub fn compute_from(data: &[u8]) -> Self {
        Hash(*blake3::hash(data).as_bytes())
    }

    /// Compute a hash over several slices without concatenating them.
    ///
    /// ```
    /// # use ixian_hash::Hash;
    /// assert_eq!(
    ///     Hash::compute_from_parts(&[b"hello ", b"world"]),
    ///     Hash::compute_from(b"hello world")
    /// );
    /// ```
    pub fn compute_from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Hash(*hasher.finalize().as_bytes())
    }

    /// Serialize a Hash using bs58 encoding with checksum.
    pub fn to_bs58_check(&self) -> String {
        bs58::encode(self.to_bytes()).with_check().into_string()
    }

    /// Serialize a Hash as bytes.
    pub fn to_bytes(&self) -> &[u8; HASH_SIZE_BYTES] {
        &self.0
    }

    /// Convert into bytes.
    pub fn into_bytes(self) -> [u8; HASH_SIZE_BYTES] {
        self.0
    }

    /// Deserialize using bs58 encoding with checksum.
    ///
    /// # Example
    ///  ```
    /// # use ixian_hash::Hash;
    /// let hash = Hash::compute_from(&"hello world".as_bytes());
    /// let serialized: String = hash.to_bs58_check();
    /// let deserialized: Hash = Hash::from_bs58_check(&serialized).unwrap();
    /// assert_eq!(hash, deserialized);
    /// ```
    pub fn from_bs58_check(data: &str) -> Result<Hash, IxianHashError> {
        let decoded_bs58_check = bs58::decode(data)
            .with_check(None)
            .into_vec()
            .map_err(|err| IxianHashError::ParsingError(format!("{}", err)))?;
        Ok(Hash::from_bytes(
            &decoded_bs58_check
                .as_slice()
                .try_into()
                .map_err(|err| IxianHashError::ParsingError(format!("{}", err)))?,
        ))
    }

    /// Deserialize a Hash as bytes.
    pub fn from_bytes(data: &[u8; HASH_SIZE_BYTES]) -> Hash {
        Hash(*data)
    }

    /// Builds a Hash from a slice, failing if it is not exactly `HASH_SIZE_BYTES` long.
    pub fn try_from_slice(data: &[u8]) -> Result<Hash, IxianHashError> {
        let bytes: &[u8; HASH_SIZE_BYTES] = data.try_into().map_err(|_| {
            IxianHashError::ParsingError(format!(
                "expected {} bytes, got {}",
                HASH_SIZE_BYTES,
                data.len()
            ))
        })?;
        Ok(Hash::from_bytes(bytes))
    }
}

/// `sha512(sha512(data))` truncated to `length` bytes.
///
/// Used for address checksums, where the peers expect this exact construction.
///
/// ```
/// # use ixian_hash::sha512_sq_trunc;
/// assert_eq!(sha512_sq_trunc(b"abc", 3).len(), 3);
/// assert_eq!(sha512_sq_trunc(b"abc", 3), sha512_sq_trunc(b"abc", 44)[..3].to_vec());
/// ```
pub fn sha512_sq_trunc(data: &[u8], length: usize) -> Vec<u8> {
    let first = Sha512::digest(data);
    let second = Sha512::digest(first);
    second[..length.min(second.len())].to_vec()
}

impl ::serde::Serialize for Hash {
    /// human readable serializers get the bs58check form, others get raw bytes
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.collect_str(&self.to_bs58_check())
        } else {
            s.serialize_bytes(self.to_bytes())
        }
    }
}

impl<'de> ::serde::Deserialize<'de> for Hash {
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<Hash, D::Error> {
        if d.is_human_readable() {
            struct Base58CheckVisitor;

            impl<'de> ::serde::de::Visitor<'de> for Base58CheckVisitor {
                type Value = Hash;

                fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                    formatter.write_str("an ASCII base58check string")
                }

                fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
                where
                    E: ::serde::de::Error,
                {
                    Hash::from_bs58_check(v).map_err(E::custom)
                }
            }
            d.deserialize_str(Base58CheckVisitor)
        } else {
            struct BytesVisitor;

            impl<'de> ::serde::de::Visitor<'de> for BytesVisitor {
                type Value = Hash;

                fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                    formatter.write_str("a bytestring")
                }

                fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
                where
                    E: ::serde::de::Error,
                {
                    Hash::try_from_slice(v).map_err(E::custom)
                }
            }

            d.deserialize_bytes(BytesVisitor)
        }
    }
}

impl FromStr for Hash {
    type Err = IxianHashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_bs58_check(s)
    }
}

/// Serializer for `Hash`, raw 32 bytes
#[derive(Default, Clone)]
pub struct HashSerializer;

impl HashSerializer {
    /// Creates a serializer for `Hash`
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer<Hash> for HashSerializer {
    fn serialize(&self, value: &Hash, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        buffer.extend_from_slice(value.to_bytes());
        Ok(())
    }
}

/// Deserializer for `Hash`
#[derive(Default, Clone)]
pub struct HashDeserializer;

impl HashDeserializer {
    /// Creates a deserializer for `Hash`
    pub const fn new() -> Self {
        Self
    }
}

impl Deserializer<Hash> for HashDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Hash, E> {
        context("Failed hash deserialization", |input: &'a [u8]| {
            let (rest, bytes) = take::<_, _, E>(HASH_SIZE_BYTES)(input)?;
            let mut array = [0u8; HASH_SIZE_BYTES];
            array.copy_from_slice(bytes);
            Ok((rest, Hash::from_bytes(&array)))
        })(buffer)
    }
}
