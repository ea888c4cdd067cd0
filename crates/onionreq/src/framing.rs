//! Wire framing for onion layers and responses
//!
//! Layer wire format:
//! - 32 bytes: sender ephemeral X25519 public key
//! - N bytes: nonce (12 for AES-GCM, 24 for XChaCha20-Poly1305)
//! - M bytes: ciphertext || 16-byte tag
//!
//! Response wire format is the same without the ephemeral key.
//!
//! Nothing is length-prefixed: the algorithm fixes the header sizes and the
//! ciphertext runs to the end of the buffer.

use bytes::{Buf, BufMut, BytesMut};
use onionreq_core::{EncryptionType, SerializationError};

/// Ephemeral public key length on the wire
pub const EPHEMERAL_KEY_LEN: usize = 32;

/// Smallest valid layer for `encryption` (empty plaintext).
pub fn min_layer_len(encryption: EncryptionType) -> usize {
    EPHEMERAL_KEY_LEN + min_response_len(encryption)
}

/// Smallest valid response for `encryption` (empty plaintext).
pub fn min_response_len(encryption: EncryptionType) -> usize {
    encryption.nonce_len() + encryption.tag_len()
}

/// One encrypted onion layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedLayer {
    /// Sender's ephemeral key for this layer only
    pub ephemeral_public_key: [u8; EPHEMERAL_KEY_LEN],
    /// AEAD nonce
    pub nonce: Vec<u8>,
    /// Ciphertext with the tag appended
    pub ciphertext: Vec<u8>,
}

impl EncryptedLayer {
    pub fn encoded_len(&self) -> usize {
        EPHEMERAL_KEY_LEN + self.nonce.len() + self.ciphertext.len()
    }

    /// Serialize to wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_slice(&self.ephemeral_public_key);
        buf.put_slice(&self.nonce);
        buf.put_slice(&self.ciphertext);
        buf.to_vec()
    }

    /// Parse wire bytes; header sizes come from `encryption`.
    pub fn from_bytes(
        encryption: EncryptionType,
        bytes: &[u8],
    ) -> Result<Self, SerializationError> {
        let expected = min_layer_len(encryption);
        if bytes.len() < expected {
            return Err(SerializationError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }

        let mut src = bytes;
        let mut ephemeral_public_key = [0u8; EPHEMERAL_KEY_LEN];
        src.copy_to_slice(&mut ephemeral_public_key);
        let nonce = src.copy_to_bytes(encryption.nonce_len()).to_vec();
        let ciphertext = src.to_vec();

        Ok(Self {
            ephemeral_public_key,
            nonce,
            ciphertext,
        })
    }
}

/// Frame a response as `nonce || ciphertext`.
pub fn encode_response(nonce: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(nonce.len() + ciphertext.len());
    buf.put_slice(nonce);
    buf.put_slice(ciphertext);
    buf.to_vec()
}

/// Split a response into `(nonce, ciphertext)`.
pub fn split_response(
    encryption: EncryptionType,
    bytes: &[u8],
) -> Result<(&[u8], &[u8]), SerializationError> {
    let expected = min_response_len(encryption);
    if bytes.len() < expected {
        return Err(SerializationError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes.split_at(encryption.nonce_len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_wire_layout() {
        let layer = EncryptedLayer {
            ephemeral_public_key: [1u8; 32],
            nonce: vec![2u8; 24],
            ciphertext: vec![3u8; 20],
        };
        let bytes = layer.to_bytes();

        assert_eq!(bytes.len(), 76);
        assert_eq!(&bytes[..32], &[1u8; 32]);
        assert_eq!(&bytes[32..56], &[2u8; 24]);
        assert_eq!(&bytes[56..], &[3u8; 20]);

        let parsed = EncryptedLayer::from_bytes(EncryptionType::XChaCha20Poly1305, &bytes).unwrap();
        assert_eq!(parsed, layer);
    }

    #[test]
    fn test_nonce_width_follows_algorithm() {
        let bytes = vec![0u8; 32 + 12 + 16];
        let parsed = EncryptedLayer::from_bytes(EncryptionType::AesGcm, &bytes).unwrap();
        assert_eq!(parsed.nonce.len(), 12);
        assert_eq!(parsed.ciphertext.len(), 16);

        assert!(matches!(
            EncryptedLayer::from_bytes(EncryptionType::XChaCha20Poly1305, &bytes),
            Err(SerializationError::Truncated { expected: 72, actual: 60 })
        ));
    }

    #[test]
    fn test_response_split() {
        let framed = encode_response(&[5u8; 12], &[6u8; 17]);
        let (nonce, ct) = split_response(EncryptionType::AesGcm, &framed).unwrap();
        assert_eq!(nonce, &[5u8; 12]);
        assert_eq!(ct, &[6u8; 17]);

        assert!(split_response(EncryptionType::AesGcm, &framed[..27]).is_err());
    }
}
