//! onionreq core library
//!
//! This crate provides the value types, key validation, canonical layer-body
//! encoding, and error taxonomy shared by onion request construction.
//!
//! # Modules
//!
//! - [`types`]: keys, hops, destinations, and the wire-stable `EncryptionType`
//! - [`canonical`]: postcard encoding of decrypted layer bodies
//! - [`error`]: Error types

pub mod canonical;
pub mod error;
pub mod types;

#[cfg(test)]
mod test_vectors;

pub use canonical::{DestinationMetadata, LayerBody, RelayTarget, Routing};
pub use error::{BuildError, CryptoError, Error, Result, SerializationError};
pub use types::*;
