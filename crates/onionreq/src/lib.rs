//! Onion-routed request construction and response decryption
//!
//! This crate provides:
//! - Per-layer X25519 key agreement with HKDF-SHA256
//! - AES-256-GCM and XChaCha20-Poly1305 behind one cipher type
//! - Single-layer encoding and opening
//! - The one-shot [`OnionRequestBuilder`]
//!
//! Transport, retries, and path selection belong to the caller.

pub mod builder;
pub mod cipher;
pub mod crypto;
pub mod framing;
pub mod layer;

pub use builder::{request_fingerprint, OnionRequestBuilder, ResponseParser, MAX_HOPS};
pub use cipher::SymmetricCipher;
pub use crypto::{derive_shared_key, EphemeralKeyPair, RecipientKeyPair, SymmetricKey};
pub use framing::EncryptedLayer;
pub use layer::{encode_layer, open_layer, open_layer_bytes, seal_response};
pub use onionreq_core::{
    BuildError, CryptoError, Destination, DestinationMetadata, Ed25519PublicKey, EncryptionType,
    Error, Hop, LayerBody, RelayTarget, Result, Routing, SerializationError, ServerEndpoint,
    X25519PublicKey,
};
