//! Canonical encoding of decrypted layer bodies
//!
//! A layer body is postcard-serialized with strict constraints:
//! - Field and variant order is Rust declaration order and is part of the
//!   wire contract
//! - Keys are raw 32-byte arrays, validated on decode
//! - Trailing bytes after a complete body are rejected

use crate::error::SerializationError;
use crate::types::{Ed25519PublicKey, EncryptionType, ServerEndpoint};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Where a relay forwards the inner bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayTarget {
    /// Next relay or a service node destination
    Node { ed25519: Ed25519PublicKey },
    /// Application server (exit hop only)
    Server(ServerEndpoint),
}

/// What the destination learns about how it was addressed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestinationMetadata {
    Server(ServerEndpoint),
    ServiceNode { ed25519: Ed25519PublicKey },
}

/// Routing instruction carried by one layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Routing {
    /// Relay layer: pass `inner` on, opened with `encryption`
    Forward {
        target: RelayTarget,
        encryption: EncryptionType,
    },
    /// Destination layer: `inner` is the application payload
    Deliver { destination: DestinationMetadata },
}

impl Routing {
    pub fn is_deliver(&self) -> bool {
        matches!(self, Self::Deliver { .. })
    }
}

/// Plaintext of one layer. `inner` is wiped on drop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct LayerBody {
    #[zeroize(skip)]
    pub routing: Routing,
    pub inner: Vec<u8>,
}

impl LayerBody {
    pub fn new(routing: Routing, inner: Vec<u8>) -> Self {
        Self { routing, inner }
    }
}

/// Serialize a layer body to canonical bytes.
pub fn encode_body(body: &LayerBody) -> Result<Vec<u8>, SerializationError> {
    postcard::to_allocvec(body).map_err(SerializationError::from)
}

/// Decode a layer body, rejecting trailing garbage.
pub fn decode_body(bytes: &[u8]) -> Result<LayerBody, SerializationError> {
    let (body, rest) = postcard::take_from_bytes::<LayerBody>(bytes)?;
    if !rest.is_empty() {
        return Err(SerializationError::TrailingBytes(rest.len()));
    }
    Ok(body)
}
