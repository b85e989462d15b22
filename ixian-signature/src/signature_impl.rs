// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::IxianSignatureError;
use ed25519_dalek::{Signer, Verifier};
use ixian_hash::Hash;
use std::convert::TryInto;
use std::str::FromStr;

/// Size of a public key
pub const PUBLIC_KEY_SIZE_BYTES: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;
/// Size of a secret key
pub const SECRET_KEY_SIZE_BYTES: usize = ed25519_dalek::SECRET_KEY_LENGTH;
/// Size of a signature
pub const SIGNATURE_SIZE_BYTES: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// `KeyPair` is used for signature and decryption
#[derive(Clone)]
pub struct KeyPair(ed25519_dalek::SigningKey);

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair({})", self.get_public_key())
    }
}

impl KeyPair {
    /// Generate a new `KeyPair`
    ///
    /// # Example
    /// ```
    /// # use ixian_signature::KeyPair;
    /// # use ixian_hash::Hash;
    /// let keypair = KeyPair::generate();
    /// let data = Hash::compute_from("Hello World!".as_bytes());
    /// let signature = keypair.sign(&data);
    /// assert!(keypair.get_public_key().verify_signature(&data, &signature).is_ok());
    /// ```
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        KeyPair(ed25519_dalek::SigningKey::generate(&mut rng))
    }

    /// Returns the Signature produced by signing the hash bytes with this `KeyPair`
    pub fn sign(&self, hash: &Hash) -> Signature {
        Signature(self.0.sign(hash.to_bytes()))
    }

    /// Return the bytes representing the secret key
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// Rebuilds a `KeyPair` from its secret key bytes
    pub fn from_bytes(data: &[u8; SECRET_KEY_SIZE_BYTES]) -> Self {
        KeyPair(ed25519_dalek::SigningKey::from_bytes(data))
    }

    /// Get the public key of the keypair
    pub fn get_public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }
}

/// Public key used to check if a message was encoded by the corresponding `KeyPair`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(ed25519_dalek::VerifyingKey);

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.to_bytes()).with_check().into_string())
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for PublicKey {
    type Err = IxianSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|err| IxianSignatureError::ParsingError(err.to_string()))?;
        PublicKey::from_bytes(&bytes)
    }
}

impl PublicKey {
    /// Checks if the `Signature` associated with data bytes
    /// was produced with the `KeyPair` associated to given `PublicKey`
    pub fn verify_signature(
        &self,
        hash: &Hash,
        signature: &Signature,
    ) -> Result<(), IxianSignatureError> {
        self.0.verify(hash.to_bytes(), &signature.0).map_err(|err| {
            IxianSignatureError::SignatureError(format!("Signature verification failed: {}", err))
        })
    }

    /// Return the bytes representing the public key
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// Deserialize a `PublicKey` from bytes, failing on a wrong length or an invalid point
    pub fn from_bytes(data: &[u8]) -> Result<PublicKey, IxianSignatureError> {
        let array: &[u8; PUBLIC_KEY_SIZE_BYTES] = data.try_into().map_err(|_| {
            IxianSignatureError::ParsingError(format!(
                "public key must be {} bytes, got {}",
                PUBLIC_KEY_SIZE_BYTES,
                data.len()
            ))
        })?;
        ed25519_dalek::VerifyingKey::from_bytes(array)
            .map(PublicKey)
            .map_err(|err| IxianSignatureError::ParsingError(err.to_string()))
    }
}

impl ::serde::Serialize for PublicKey {
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> ::serde::Deserialize<'de> for PublicKey {
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<PublicKey, D::Error> {
        let text = String::deserialize(d)?;
        PublicKey::from_str(&text).map_err(::serde::de::Error::custom)
    }
}

/// Signature generated from a message and a `KeyPair`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.to_bytes()).with_check().into_string())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Signature {
    /// Serialize a `Signature` as bytes.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// Deserialize a `Signature` from bytes, failing on a wrong length
    pub fn from_bytes(data: &[u8]) -> Result<Signature, IxianSignatureError> {
        let array: &[u8; SIGNATURE_SIZE_BYTES] = data.try_into().map_err(|_| {
            IxianSignatureError::ParsingError(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_SIZE_BYTES,
                data.len()
            ))
        })?;
        Ok(Signature(ed25519_dalek::Signature::from_bytes(array)))
    }
}

impl ::serde::Serialize for Signature {
    fn serialize<S: ::serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> ::serde::Deserialize<'de> for Signature {
    fn deserialize<D: ::serde::Deserializer<'de>>(d: D) -> Result<Signature, D::Error> {
        let text = String::deserialize(d)?;
        let bytes = bs58::decode(&text)
            .with_check(None)
            .into_vec()
            .map_err(::serde::de::Error::custom)?;
        Signature::from_bytes(&bytes).map_err(::serde::de::Error::custom)
    }
}
