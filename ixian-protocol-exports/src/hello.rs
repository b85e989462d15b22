// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_hash::{Hash, HashDeserializer, HashSerializer};
use ixian_serialization::{Deserializer, SerializeError, Serializer};
use nom::error::{context, ContextError, ErrorKind, ParseError};
use nom::number::complete::{le_u32, le_u64, u8 as parse_u8};
use nom::IResult;
use serde::{Deserialize, Serialize};

/// Chain tip announced by a peer during the handshake, or by the local storage on startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloData {
    /// height of the announced tip
    pub block_height: u64,
    /// checksum of the announced tip
    pub block_checksum: Hash,
    /// version of the announced tip
    pub block_version: u32,
    /// wallet state checksum at the announced tip
    pub wallet_state_checksum: Hash,
    /// signatures the announcer requires on a block
    pub consensus: u32,
    /// highest block the local storage can serve, set for local announces only
    pub last_block_to_read_from_storage: Option<u64>,
    /// received from a peer rather than read from the local storage
    pub from_network: bool,
}

/// Serializer for `HelloData`
#[derive(Default, Clone)]
pub struct HelloDataSerializer {
    hash_serializer: HashSerializer,
}

impl HelloDataSerializer {
    /// Creates a new `HelloDataSerializer`
    pub const fn new() -> Self {
        Self {
            hash_serializer: HashSerializer::new(),
        }
    }
}

impl Serializer<HelloData> for HelloDataSerializer {
    fn serialize(&self, value: &HelloData, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        buffer.extend_from_slice(&value.block_height.to_le_bytes());
        self.hash_serializer.serialize(&value.block_checksum, buffer)?;
        buffer.extend_from_slice(&value.block_version.to_le_bytes());
        self.hash_serializer
            .serialize(&value.wallet_state_checksum, buffer)?;
        buffer.extend_from_slice(&value.consensus.to_le_bytes());
        match value.last_block_to_read_from_storage {
            Some(height) => {
                buffer.push(1);
                buffer.extend_from_slice(&height.to_le_bytes());
            }
            None => buffer.push(0),
        }
        buffer.push(u8::from(value.from_network));
        Ok(())
    }
}

/// Deserializer for `HelloData`
#[derive(Default, Clone)]
pub struct HelloDataDeserializer {
    hash_deserializer: HashDeserializer,
}

impl HelloDataDeserializer {
    /// Creates a new `HelloDataDeserializer`
    pub const fn new() -> Self {
        Self {
            hash_deserializer: HashDeserializer::new(),
        }
    }
}

fn parse_flag<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> IResult<&'a [u8], bool, E> {
    let (rest, flag) = parse_u8::<_, E>(input)?;
    match flag {
        0 => Ok((rest, false)),
        1 => Ok((rest, true)),
        _ => Err(nom::Err::Error(E::from_error_kind(input, ErrorKind::Tag))),
    }
}

impl Deserializer<HelloData> for HelloDataDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], HelloData, E> {
        context("Failed hello data deserialization", |input: &'a [u8]| {
            let (rest, block_height) = le_u64::<_, E>(input)?;
            let (rest, block_checksum) = self.hash_deserializer.deserialize::<E>(rest)?;
            let (rest, block_version) = le_u32::<_, E>(rest)?;
            let (rest, wallet_state_checksum) = self.hash_deserializer.deserialize::<E>(rest)?;
            let (rest, consensus) = le_u32::<_, E>(rest)?;
            let (rest, has_storage_height) = parse_flag::<E>(rest)?;
            let (rest, last_block_to_read_from_storage) = if has_storage_height {
                let (rest, height) = le_u64::<_, E>(rest)?;
                (rest, Some(height))
            } else {
                (rest, None)
            };
            let (rest, from_network) = parse_flag::<E>(rest)?;
            Ok((
                rest,
                HelloData {
                    block_height,
                    block_checksum,
                    block_version,
                    wallet_state_checksum,
                    consensus,
                    last_block_to_read_from_storage,
                    from_network,
                },
            ))
        })(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ixian_serialization::DeserializeError;

    fn hello(storage: Option<u64>) -> HelloData {
        HelloData {
            block_height: 1_234,
            block_checksum: Hash::compute_from(b"tip"),
            block_version: 5,
            wallet_state_checksum: Hash::compute_from(b"wallets"),
            consensus: 3,
            last_block_to_read_from_storage: storage,
            from_network: storage.is_none(),
        }
    }

    #[test]
    fn test_hello_layout() {
        let mut buffer = Vec::new();
        HelloDataSerializer::new()
            .serialize(&hello(Some(900)), &mut buffer)
            .unwrap();
        assert_eq!(buffer.len(), 8 + 32 + 4 + 32 + 4 + 1 + 8 + 1);
        assert_eq!(&buffer[..8], &1_234u64.to_le_bytes());
        let (rest, decoded) = HelloDataDeserializer::new()
            .deserialize::<DeserializeError>(&buffer)
            .unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, hello(Some(900)));
    }

    #[test]
    fn test_hello_rejects_bad_flag_and_truncation() {
        let mut buffer = Vec::new();
        HelloDataSerializer::new()
            .serialize(&hello(None), &mut buffer)
            .unwrap();
        let deserializer = HelloDataDeserializer::new();
        assert!(deserializer
            .deserialize::<DeserializeError>(&buffer[..buffer.len() - 1])
            .is_err());
        let flag_index = buffer.len() - 2;
        buffer[flag_index] = 7;
        assert!(deserializer.deserialize::<DeserializeError>(&buffer).is_err());
    }
}
