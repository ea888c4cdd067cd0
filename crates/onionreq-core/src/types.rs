//! Core value types for onion requests
//!
//! Keys are validated on construction, so anything holding an
//! [`X25519PublicKey`] or [`Ed25519PublicKey`] can use it without
//! re-checking. Deserialization goes through the same validation.

use crate::error::{CryptoError, SerializationError};
use curve25519_dalek::montgomery::MontgomeryPoint;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Raw length of both key types.
pub const KEY_LEN: usize = 32;

// =============================================================================
// ENCRYPTION TYPE
// =============================================================================

/// AEAD algorithm used for every layer of a request.
///
/// The ordinals are shared with the peer implementation and are sent as
/// integers. Do not renumber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EncryptionType {
    /// AES-256-GCM, 12-byte nonce
    AesGcm = 0,
    /// XChaCha20-Poly1305, 24-byte nonce
    #[default]
    XChaCha20Poly1305 = 1,
}

impl EncryptionType {
    /// Wire ordinal
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Stable text name
    pub fn name(self) -> &'static str {
        match self {
            Self::AesGcm => "aes-gcm",
            Self::XChaCha20Poly1305 => "xchacha20",
        }
    }

    /// Nonce length in bytes
    pub fn nonce_len(self) -> usize {
        match self {
            Self::AesGcm => 12,
            Self::XChaCha20Poly1305 => 24,
        }
    }

    /// Authentication tag length in bytes
    pub fn tag_len(self) -> usize {
        16
    }
}

impl TryFrom<u8> for EncryptionType {
    type Error = SerializationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AesGcm),
            1 => Ok(Self::XChaCha20Poly1305),
            other => Err(SerializationError::UnknownEncryptionType(other)),
        }
    }
}

impl fmt::Display for EncryptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncryptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-gcm" | "aesgcm" => Ok(Self::AesGcm),
            "xchacha20" | "xchacha20-poly1305" => Ok(Self::XChaCha20Poly1305),
            other => Err(format!("unknown encryption type: {other}")),
        }
    }
}

impl Serialize for EncryptionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for EncryptionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// KEYS
// =============================================================================

fn decode_key_hex(kind: &str, hex_str: &str) -> Result<[u8; KEY_LEN], CryptoError> {
    let raw = hex::decode(hex_str.trim())
        .map_err(|e| CryptoError::InvalidPublicKey(format!("{kind}: {e}")))?;
    key_array(kind, &raw)
}

fn key_array(kind: &str, raw: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    raw.try_into().map_err(|_| {
        CryptoError::InvalidPublicKey(format!(
            "{kind}: expected {KEY_LEN} bytes, got {}",
            raw.len()
        ))
    })
}

/// X25519 public key of a relay or destination.
///
/// Rejects points off the curve and small-order points, so a
/// Diffie-Hellman with a valid key can never collapse to a known secret.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; 32]", into = "[u8; 32]")]
pub struct X25519PublicKey([u8; KEY_LEN]);

impl X25519PublicKey {
    /// Validate raw bytes
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CryptoError> {
        let bytes = key_array("x25519", raw)?;
        let point = MontgomeryPoint(bytes)
            .to_edwards(0)
            .ok_or_else(|| CryptoError::InvalidPublicKey("x25519: not on curve".into()))?;
        if point.is_small_order() {
            return Err(CryptoError::InvalidPublicKey("x25519: small-order point".into()));
        }
        Ok(Self(bytes))
    }

    /// Validate a hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&decode_key_hex("x25519", hex_str)?)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<[u8; KEY_LEN]> for X25519PublicKey {
    type Error = CryptoError;

    fn try_from(bytes: [u8; KEY_LEN]) -> Result<Self, Self::Error> {
        Self::from_bytes(&bytes)
    }
}

impl From<X25519PublicKey> for [u8; KEY_LEN] {
    fn from(key: X25519PublicKey) -> Self {
        key.0
    }
}

impl fmt::Display for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519PublicKey({})", hex::encode(&self.0[..8]))
    }
}

/// Ed25519 identity key; doubles as the routing address of a service node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; 32]", into = "[u8; 32]")]
pub struct Ed25519PublicKey([u8; KEY_LEN]);

impl Ed25519PublicKey {
    /// Validate raw bytes
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CryptoError> {
        let bytes = key_array("ed25519", raw)?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|_| CryptoError::InvalidPublicKey("ed25519: not a valid point".into()))?;
        if key.is_weak() {
            return Err(CryptoError::InvalidPublicKey("ed25519: small-order point".into()));
        }
        Ok(Self(bytes))
    }

    /// Validate a hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&decode_key_hex("ed25519", hex_str)?)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<[u8; KEY_LEN]> for Ed25519PublicKey {
    type Error = CryptoError;

    fn try_from(bytes: [u8; KEY_LEN]) -> Result<Self, Self::Error> {
        Self::from_bytes(&bytes)
    }
}

impl From<Ed25519PublicKey> for [u8; KEY_LEN] {
    fn from(key: Ed25519PublicKey) -> Self {
        key.0
    }
}

impl fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({})", hex::encode(&self.0[..8]))
    }
}

// =============================================================================
// PATH
// =============================================================================

/// One relay on the path, identified by its long-term keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    /// Identity, also the address the previous hop forwards to
    pub ed25519: Ed25519PublicKey,
    /// Key this hop's layer is encrypted to
    pub x25519: X25519PublicKey,
}

impl Hop {
    pub fn new(ed25519: Ed25519PublicKey, x25519: X25519PublicKey) -> Self {
        Self { ed25519, x25519 }
    }

    /// Parse both keys from hex
    pub fn from_hex(ed25519_hex: &str, x25519_hex: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            ed25519: Ed25519PublicKey::from_hex(ed25519_hex)?,
            x25519: X25519PublicKey::from_hex(x25519_hex)?,
        })
    }
}

/// Where an application server is reached by the exit hop.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    pub target_path: String,
    pub scheme: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(
        host: impl Into<String>,
        target_path: impl Into<String>,
        scheme: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            host: host.into(),
            target_path: target_path.into(),
            scheme: scheme.into(),
            port,
        }
    }

    /// `scheme://host:port/target_path`
    pub fn url(&self) -> String {
        let path = self.target_path.trim_start_matches('/');
        format!("{}://{}:{}/{}", self.scheme, self.host, self.port, path)
    }
}

/// Final target of a request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    /// Application server behind the exit hop
    Server {
        endpoint: ServerEndpoint,
        x25519: X25519PublicKey,
    },
    /// A service node, addressed by its identity key
    ServiceNode {
        ed25519: Ed25519PublicKey,
        x25519: X25519PublicKey,
    },
}

impl Destination {
    /// Key the innermost layer is encrypted to
    pub fn x25519(&self) -> &X25519PublicKey {
        match self {
            Self::Server { x25519, .. } | Self::ServiceNode { x25519, .. } => x25519,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Server { .. } => "server",
            Self::ServiceNode { .. } => "snode",
        }
    }
}
