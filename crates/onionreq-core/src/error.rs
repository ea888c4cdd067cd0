//! Error types for onion request construction

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Misuse of the builder state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// `build` called without a destination
    #[error("no destination set")]
    MissingDestination,

    /// A destination setter was called a second time
    #[error("destination already set")]
    DestinationAlreadySet,

    /// `build` called with an empty hop list
    #[error("at least one hop is required")]
    NoHops,

    /// Too many hops added
    #[error("too many hops (max {max})")]
    TooManyHops { max: usize },

    /// Operation invoked in the wrong phase
    #[error("operation not valid in the current builder state")]
    InvalidState,
}

/// Key agreement and AEAD failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Malformed key material or invalid curve point
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// AEAD tag did not verify
    #[error("authentication failed")]
    AuthenticationFailed,

    /// AEAD encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// HKDF expansion failed
    #[error("key derivation failed")]
    KeyDerivationFailed,
}

/// Layer bodies or frames that cannot be decoded
#[derive(Debug, Error)]
pub enum SerializationError {
    /// postcard rejected the bytes
    #[error("malformed layer body: {0}")]
    Malformed(#[from] postcard::Error),

    /// Buffer shorter than the fixed header
    #[error("truncated frame: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Bytes left over after a complete layer body
    #[error("{0} trailing bytes after layer body")]
    TrailingBytes(usize),

    /// Encryption ordinal outside the known set
    #[error("unknown encryption type: {0}")]
    UnknownEncryptionType(u8),
}

/// Top-level error for onion request operations
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
