//! Authenticated symmetric encryption
//!
//! Both algorithms take a 32-byte key and produce `(nonce, ciphertext || tag)`
//! with a fresh random nonce per call. Callers never branch on the algorithm.

use crate::crypto::SymmetricKey;
use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use onionreq_core::{CryptoError, EncryptionType};
use rand::rngs::OsRng;

/// AEAD selected by [`EncryptionType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymmetricCipher {
    encryption: EncryptionType,
}

impl SymmetricCipher {
    pub fn new(encryption: EncryptionType) -> Self {
        Self { encryption }
    }

    pub fn encryption_type(&self) -> EncryptionType {
        self.encryption
    }

    /// Encrypt with a fresh nonce. Returns `(nonce, ciphertext || tag)`.
    pub fn encrypt(
        &self,
        key: &SymmetricKey,
        associated_data: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let payload = Payload {
            msg: plaintext,
            aad: associated_data,
        };

        match self.encryption {
            EncryptionType::AesGcm => {
                let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                    .map_err(|_| CryptoError::EncryptionFailed)?;
                let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
                let ciphertext = cipher
                    .encrypt(&nonce, payload)
                    .map_err(|_| CryptoError::EncryptionFailed)?;
                Ok((nonce.to_vec(), ciphertext))
            }
            EncryptionType::XChaCha20Poly1305 => {
                let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
                    .map_err(|_| CryptoError::EncryptionFailed)?;
                let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
                let ciphertext = cipher
                    .encrypt(&nonce, payload)
                    .map_err(|_| CryptoError::EncryptionFailed)?;
                Ok((nonce.to_vec(), ciphertext))
            }
        }
    }

    /// Decrypt and verify. Any failure, including a nonce of the wrong
    /// length, is `AuthenticationFailed` and yields no plaintext.
    pub fn decrypt(
        &self,
        key: &SymmetricKey,
        nonce: &[u8],
        associated_data: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != self.encryption.nonce_len() {
            return Err(CryptoError::AuthenticationFailed);
        }
        let payload = Payload {
            msg: ciphertext,
            aad: associated_data,
        };

        match self.encryption {
            EncryptionType::AesGcm => {
                let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                    .map_err(|_| CryptoError::AuthenticationFailed)?;
                cipher
                    .decrypt(aes_gcm::Nonce::from_slice(nonce), payload)
                    .map_err(|_| CryptoError::AuthenticationFailed)
            }
            EncryptionType::XChaCha20Poly1305 => {
                let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
                    .map_err(|_| CryptoError::AuthenticationFailed)?;
                cipher
                    .decrypt(XNonce::from_slice(nonce), payload)
                    .map_err(|_| CryptoError::AuthenticationFailed)
            }
        }
    }
}
