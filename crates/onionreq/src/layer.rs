//! Encoding and opening of single onion layers
//!
//! A layer is `{routing, inner}` in canonical form, encrypted to one
//! recipient under a key agreed with a keypair generated for that layer
//! alone. The associated data is `[encryption ordinal] || ephemeral key`.

use crate::cipher::SymmetricCipher;
use crate::crypto::{
    derive_recipient_key, derive_shared_key_for, EphemeralKeyPair, RecipientKeyPair,
    SymmetricKey,
};
use crate::framing::{encode_response, split_response, EncryptedLayer, EPHEMERAL_KEY_LEN};
use onionreq_core::canonical::{decode_body, encode_body};
use onionreq_core::{EncryptionType, LayerBody, Result, Routing, X25519PublicKey};
use tracing::trace;
use zeroize::Zeroizing;

/// Associated data binding a layer to its algorithm and ephemeral key.
pub fn layer_associated_data(
    encryption: EncryptionType,
    ephemeral_public_key: &[u8; EPHEMERAL_KEY_LEN],
) -> [u8; 1 + EPHEMERAL_KEY_LEN] {
    let mut aad = [0u8; 1 + EPHEMERAL_KEY_LEN];
    aad[0] = encryption.ordinal();
    aad[1..].copy_from_slice(ephemeral_public_key);
    aad
}

/// Encrypt one layer for `recipient`.
///
/// Returns the layer and the key it was sealed under. The builder keeps the
/// destination layer's key for the response and drops every other one.
pub fn encode_layer(
    encryption: EncryptionType,
    recipient: &X25519PublicKey,
    routing: Routing,
    inner: Vec<u8>,
) -> Result<(EncryptedLayer, SymmetricKey)> {
    let ephemeral = EphemeralKeyPair::generate();
    let key = derive_shared_key_for(&ephemeral, recipient)?;
    let ephemeral_public_key = ephemeral.public_key();

    let body = LayerBody::new(routing, inner);
    let plaintext = Zeroizing::new(encode_body(&body)?);
    let aad = layer_associated_data(encryption, &ephemeral_public_key);
    let (nonce, ciphertext) = SymmetricCipher::new(encryption).encrypt(&key, &aad, &plaintext)?;

    trace!(
        recipient = %hex::encode(&recipient.as_bytes()[..8]),
        deliver = body.routing.is_deliver(),
        body_len = plaintext.len(),
        "encoded layer"
    );

    Ok((
        EncryptedLayer {
            ephemeral_public_key,
            nonce,
            ciphertext,
        },
        key,
    ))
}

/// Decrypt one layer addressed to `recipient` and decode its body.
///
/// Also returns the layer key; a destination uses it to seal its response.
pub fn open_layer(
    encryption: EncryptionType,
    recipient: &RecipientKeyPair,
    layer: &EncryptedLayer,
) -> Result<(LayerBody, SymmetricKey)> {
    let key = derive_recipient_key(recipient, &layer.ephemeral_public_key)?;
    let aad = layer_associated_data(encryption, &layer.ephemeral_public_key);
    let plaintext = Zeroizing::new(SymmetricCipher::new(encryption).decrypt(
        &key,
        &layer.nonce,
        &aad,
        &layer.ciphertext,
    )?);
    let body = decode_body(&plaintext)?;
    Ok((body, key))
}

/// Parse and open a layer straight from wire bytes.
pub fn open_layer_bytes(
    encryption: EncryptionType,
    recipient: &RecipientKeyPair,
    bytes: &[u8],
) -> Result<(LayerBody, SymmetricKey, [u8; EPHEMERAL_KEY_LEN])> {
    let layer = EncryptedLayer::from_bytes(encryption, bytes)?;
    let (body, key) = open_layer(encryption, recipient, &layer)?;
    Ok((body, key, layer.ephemeral_public_key))
}

/// Destination side: seal a response under the destination layer's key.
///
/// `ephemeral_public_key` is the one carried by the destination layer; it is
/// the associated data, so a response only verifies for its own request.
pub fn seal_response(
    encryption: EncryptionType,
    key: &SymmetricKey,
    ephemeral_public_key: &[u8; EPHEMERAL_KEY_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let (nonce, ciphertext) =
        SymmetricCipher::new(encryption).encrypt(key, ephemeral_public_key, plaintext)?;
    Ok(encode_response(&nonce, &ciphertext))
}

/// Client side counterpart of [`seal_response`].
pub fn open_response(
    encryption: EncryptionType,
    key: &SymmetricKey,
    ephemeral_public_key: &[u8; EPHEMERAL_KEY_LEN],
    response: &[u8],
) -> Result<Vec<u8>> {
    let (nonce, ciphertext) = split_response(encryption, response)?;
    let plaintext =
        SymmetricCipher::new(encryption).decrypt(key, nonce, ephemeral_public_key, ciphertext)?;
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onionreq_core::{
        CryptoError, DestinationMetadata, Ed25519PublicKey, Error, RelayTarget,
        SerializationError,
    };

    const ED_HEX: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn forward() -> Routing {
        Routing::Forward {
            target: RelayTarget::Node {
                ed25519: Ed25519PublicKey::from_hex(ED_HEX).unwrap(),
            },
            encryption: EncryptionType::AesGcm,
        }
    }

    #[test]
    fn test_encode_open_layer() {
        for enc in [EncryptionType::AesGcm, EncryptionType::XChaCha20Poly1305] {
            let relay = RecipientKeyPair::generate().unwrap();
            let (layer, sender_key) =
                encode_layer(enc, relay.public_key(), forward(), b"inner".to_vec()).unwrap();

            let (body, key, epk) = open_layer_bytes(enc, &relay, &layer.to_bytes()).unwrap();
            assert_eq!(body.routing, forward());
            assert_eq!(body.inner, b"inner");
            assert_eq!(key, sender_key);
            assert_eq!(epk, layer.ephemeral_public_key);
        }
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let relay = RecipientKeyPair::generate().unwrap();
        let other = RecipientKeyPair::generate().unwrap();
        let enc = EncryptionType::XChaCha20Poly1305;
        let (layer, _) = encode_layer(enc, relay.public_key(), forward(), vec![1]).unwrap();

        assert!(matches!(
            open_layer(enc, &other, &layer),
            Err(Error::Crypto(CryptoError::AuthenticationFailed))
        ));
    }

    #[test]
    fn test_algorithm_is_bound() {
        let relay = RecipientKeyPair::generate().unwrap();
        let (layer, _) =
            encode_layer(EncryptionType::AesGcm, relay.public_key(), forward(), vec![1]).unwrap();
        let mut forged = layer.clone();
        forged.nonce.resize(24, 0);

        assert!(open_layer(EncryptionType::XChaCha20Poly1305, &relay, &forged).is_err());
    }

    #[test]
    fn test_truncated_layer() {
        let relay = RecipientKeyPair::generate().unwrap();
        assert!(matches!(
            open_layer_bytes(EncryptionType::AesGcm, &relay, &[0u8; 40]),
            Err(Error::Serialization(SerializationError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_response_round_trip() {
        let dest = RecipientKeyPair::generate().unwrap();
        let enc = EncryptionType::AesGcm;
        let routing = Routing::Deliver {
            destination: DestinationMetadata::ServiceNode {
                ed25519: Ed25519PublicKey::from_hex(ED_HEX).unwrap(),
            },
        };
        let (layer, client_key) = encode_layer(enc, dest.public_key(), routing, vec![]).unwrap();
        let (_, dest_key) = open_layer(enc, &dest, &layer).unwrap();

        let response = seal_response(enc, &dest_key, &layer.ephemeral_public_key, b"ok").unwrap();
        let opened =
            open_response(enc, &client_key, &layer.ephemeral_public_key, &response).unwrap();
        assert_eq!(opened, b"ok");

        // A different request's ephemeral key does not verify
        assert!(matches!(
            open_response(enc, &client_key, &[9u8; 32], &response),
            Err(Error::Crypto(CryptoError::AuthenticationFailed))
        ));
    }
}
