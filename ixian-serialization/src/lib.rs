// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Binary codecs shared by the wire payloads of the node.
//!
//! Serializers append to a caller provided buffer, deserializers are `nom` parsers
//! returning the remaining input. Length prefixes follow the .NET `BinaryWriter`
//! layout used by the peers: LEB128 for strings, little endian `i32` for byte arrays.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

use displaydoc::Display;
use nom::bytes::complete::take;
use nom::error::{context, ContextError, ErrorKind, ParseError};
use nom::number::complete::le_i32;
use nom::IResult;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use thiserror::Error;

/// serialization errors
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum SerializeError {
    /// Number {0} is too big to be serialized
    NumberTooBig(String),
    /// General error {0}
    GeneralError(String),
}

/// Accumulated `nom` error trail, innermost first.
#[derive(Debug)]
pub struct DeserializeError<'a> {
    errors: Vec<(&'a [u8], String)>,
}

impl<'a> ParseError<&'a [u8]> for DeserializeError<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        Self {
            errors: vec![(input, kind.description().to_string())],
        }
    }

    fn append(input: &'a [u8], kind: ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, kind.description().to_string()));
        other
    }
}

impl<'a> ContextError<&'a [u8]> for DeserializeError<'a> {
    fn add_context(input: &'a [u8], ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, ctx.to_string()));
        other
    }
}

impl<'a> fmt::Display for DeserializeError<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (input, message) in self.errors.iter().rev() {
            if !first {
                write!(f, " / ")?;
            }
            first = false;
            write!(f, "{} ({} bytes left)", message, input.len())?;
        }
        Ok(())
    }
}

/// Serializes a value of type `T` into a byte buffer
pub trait Serializer<T> {
    /// Appends the serialized form of `value` to `buffer`
    fn serialize(&self, value: &T, buffer: &mut Vec<u8>) -> Result<(), SerializeError>;
}

/// Deserializes a value of type `T` from a byte buffer
pub trait Deserializer<T> {
    /// Parses a `T` from the head of `buffer` and returns the rest
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], T, E>;
}

/// LEB128 (7 bits per byte) serializer for `u64`
#[derive(Clone, Default)]
pub struct U64VarIntSerializer;

impl U64VarIntSerializer {
    /// Creates a `U64VarIntSerializer`
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer<u64> for U64VarIntSerializer {
    /// ```
    /// use ixian_serialization::{Serializer, U64VarIntSerializer};
    ///
    /// let mut buffer = Vec::new();
    /// U64VarIntSerializer::new().serialize(&300, &mut buffer).unwrap();
    /// assert_eq!(buffer, vec![0xac, 0x02]);
    /// ```
    fn serialize(&self, value: &u64, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        buffer.extend_from_slice(unsigned_varint::encode::u64(
            *value,
            &mut unsigned_varint::encode::u64_buffer(),
        ));
        Ok(())
    }
}

/// LEB128 deserializer for `u64`, rejecting values out of `range`
#[derive(Clone)]
pub struct U64VarIntDeserializer {
    range: (Bound<u64>, Bound<u64>),
}

impl U64VarIntDeserializer {
    /// Creates a `U64VarIntDeserializer` accepting values within the given bounds
    pub const fn new(min: Bound<u64>, max: Bound<u64>) -> Self {
        Self { range: (min, max) }
    }
}

impl Deserializer<u64> for U64VarIntDeserializer {
    /// ```
    /// use std::ops::Bound::Included;
    /// use ixian_serialization::{Deserializer, DeserializeError, U64VarIntDeserializer};
    ///
    /// let deserializer = U64VarIntDeserializer::new(Included(0), Included(1000));
    /// let (rest, value) = deserializer.deserialize::<DeserializeError>(&[0xac, 0x02, 0xff]).unwrap();
    /// assert_eq!(value, 300);
    /// assert_eq!(rest, &[0xff]);
    /// let too_big = U64VarIntDeserializer::new(Included(0), Included(10));
    /// assert!(too_big.deserialize::<DeserializeError>(&[0xac, 0x02]).is_err());
    /// ```
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], u64, E> {
        context("Failed u64 varint deserialization", |input: &'a [u8]| {
            let (value, rest) = unsigned_varint::decode::u64(input)
                .map_err(|_| nom::Err::Error(E::from_error_kind(input, ErrorKind::Fail)))?;
            if !self.range.contains(&value) {
                return Err(nom::Err::Error(E::from_error_kind(input, ErrorKind::Verify)));
            }
            Ok((rest, value))
        })(buffer)
    }
}

/// Serializer for strings in the `BinaryWriter.Write(string)` layout:
/// LEB128 byte length followed by the UTF-8 bytes
#[derive(Clone, Default)]
pub struct BinaryStringSerializer {
    length_serializer: U64VarIntSerializer,
}

impl BinaryStringSerializer {
    /// Creates a `BinaryStringSerializer`
    pub const fn new() -> Self {
        Self {
            length_serializer: U64VarIntSerializer::new(),
        }
    }
}

impl Serializer<String> for BinaryStringSerializer {
    fn serialize(&self, value: &String, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        let length: u64 = value
            .len()
            .try_into()
            .map_err(|_| SerializeError::NumberTooBig(value.len().to_string()))?;
        self.length_serializer.serialize(&length, buffer)?;
        buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }
}

/// Deserializer for `BinaryWriter` strings of at most `max_length` bytes
#[derive(Clone)]
pub struct BinaryStringDeserializer {
    length_deserializer: U64VarIntDeserializer,
}

impl BinaryStringDeserializer {
    /// Creates a `BinaryStringDeserializer`
    pub const fn new(max_length: u64) -> Self {
        Self {
            length_deserializer: U64VarIntDeserializer::new(
                Bound::Included(0),
                Bound::Included(max_length),
            ),
        }
    }
}

impl Deserializer<String> for BinaryStringDeserializer {
    /// ```
    /// use ixian_serialization::{BinaryStringDeserializer, BinaryStringSerializer, Deserializer, DeserializeError, Serializer};
    ///
    /// let mut buffer = Vec::new();
    /// BinaryStringSerializer::new().serialize(&"0a0b".to_string(), &mut buffer).unwrap();
    /// assert_eq!(buffer, vec![4, b'0', b'a', b'0', b'b']);
    /// let (rest, value) = BinaryStringDeserializer::new(128).deserialize::<DeserializeError>(&buffer).unwrap();
    /// assert!(rest.is_empty());
    /// assert_eq!(value, "0a0b");
    /// ```
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], String, E> {
        context("Failed binary string deserialization", |input: &'a [u8]| {
            let (rest, length) = self.length_deserializer.deserialize::<E>(input)?;
            let (rest, bytes) = take::<_, _, E>(length as usize)(rest)?;
            let value = String::from_utf8(bytes.to_vec())
                .map_err(|_| nom::Err::Error(E::from_error_kind(input, ErrorKind::Char)))?;
            Ok((rest, value))
        })(buffer)
    }
}

/// Serializer for byte arrays prefixed by their length as a little endian `i32`
#[derive(Clone, Default)]
pub struct BytesSerializer;

impl BytesSerializer {
    /// Creates a `BytesSerializer`
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer<Vec<u8>> for BytesSerializer {
    fn serialize(&self, value: &Vec<u8>, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        let length: i32 = value
            .len()
            .try_into()
            .map_err(|_| SerializeError::NumberTooBig(value.len().to_string()))?;
        buffer.extend_from_slice(&length.to_le_bytes());
        buffer.extend_from_slice(value);
        Ok(())
    }
}

/// Deserializer for `i32`-prefixed byte arrays of at most `max_length` bytes
#[derive(Clone)]
pub struct BytesDeserializer {
    max_length: usize,
}

impl BytesDeserializer {
    /// Creates a `BytesDeserializer`
    pub const fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Deserializer<Vec<u8>> for BytesDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Vec<u8>, E> {
        context("Failed byte array deserialization", |input: &'a [u8]| {
            let (rest, length) = le_i32::<_, E>(input)?;
            let length = usize::try_from(length)
                .ok()
                .filter(|length| *length <= self.max_length)
                .ok_or_else(|| nom::Err::Error(E::from_error_kind(input, ErrorKind::Verify)))?;
            let (rest, bytes) = take::<_, _, E>(length)(rest)?;
            Ok((rest, bytes.to_vec()))
        })(buffer)
    }
}
