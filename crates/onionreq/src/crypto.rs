//! Key agreement for onion layers
//!
//! Provides per-layer ephemeral keys, X25519 ECDH, and HKDF-SHA256 key
//! derivation. Every secret type here wipes itself on drop.

use hkdf::Hkdf;
use onionreq_core::{CryptoError, X25519PublicKey};
use rand::rngs::OsRng;
use sha2::Sha256;
use std::fmt;
use x25519_dalek::{PublicKey as X25519Public, SharedSecret, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// HKDF info prefix; the recipient's public key is appended.
pub const KDF_INFO: &[u8] = b"onionreq-layer-v1";

/// Derived key length, valid for both AEADs.
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Symmetric key for one layer (or for the response).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LEN]);

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Ephemeral X25519 keypair, generated fresh for each layer.
pub struct EphemeralKeyPair {
    secret: StaticSecret,
    public: X25519Public,
}

impl EphemeralKeyPair {
    /// Generate new ephemeral keypair
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    /// Wrap a caller-supplied private scalar
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self::from_secret(StaticSecret::from(bytes))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = X25519Public::from(&secret);
        Self { secret, public }
    }

    /// Get the public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }
}

/// Long-term X25519 keypair of a layer recipient (relay or destination).
pub struct RecipientKeyPair {
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl RecipientKeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Result<Self, CryptoError> {
        Self::from_secret_bytes(StaticSecret::random_from_rng(OsRng).to_bytes())
    }

    /// Rebuild from a stored private scalar
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let secret = StaticSecret::from(bytes);
        let public = X25519PublicKey::from_bytes(X25519Public::from(&secret).as_bytes())?;
        Ok(Self { secret, public })
    }

    pub fn public_key(&self) -> &X25519PublicKey {
        &self.public
    }
}

/// Derive a layer key from a raw ephemeral scalar and a hex peer key.
pub fn derive_shared_key(
    ephemeral_private_key: &[u8; 32],
    peer_x25519_public_key_hex: &str,
) -> Result<SymmetricKey, CryptoError> {
    let peer = X25519PublicKey::from_hex(peer_x25519_public_key_hex)?;
    let pair = EphemeralKeyPair::from_secret_bytes(*ephemeral_private_key);
    derive_shared_key_for(&pair, &peer)
}

/// Sender side: ECDH between our ephemeral key and the recipient's key.
pub fn derive_shared_key_for(
    ephemeral: &EphemeralKeyPair,
    peer: &X25519PublicKey,
) -> Result<SymmetricKey, CryptoError> {
    let shared = ephemeral
        .secret
        .diffie_hellman(&X25519Public::from(*peer.as_bytes()));
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidPublicKey(
            "x25519: non-contributory exchange".into(),
        ));
    }
    expand(&shared, ephemeral.public.as_bytes(), peer.as_bytes())
}

/// Recipient side: same key, from our static secret and the sender's
/// ephemeral public key taken off the wire.
///
/// A degenerate ephemeral key cannot have come from an honest sender, so it
/// is reported as an authentication failure.
pub fn derive_recipient_key(
    recipient: &RecipientKeyPair,
    ephemeral_public: &[u8; 32],
) -> Result<SymmetricKey, CryptoError> {
    let shared = recipient
        .secret
        .diffie_hellman(&X25519Public::from(*ephemeral_public));
    if !shared.was_contributory() {
        return Err(CryptoError::AuthenticationFailed);
    }
    expand(&shared, ephemeral_public, recipient.public.as_bytes())
}

fn expand(
    shared: &SharedSecret,
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> Result<SymmetricKey, CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(Some(ephemeral_public), shared.as_bytes());

    let mut info = Vec::with_capacity(KDF_INFO.len() + recipient_public.len());
    info.extend_from_slice(KDF_INFO);
    info.extend_from_slice(recipient_public);

    let mut okm = [0u8; SYMMETRIC_KEY_LEN];
    hkdf.expand(&info, &mut okm)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    let key = SymmetricKey(okm);
    okm.zeroize();
    Ok(key)
}
