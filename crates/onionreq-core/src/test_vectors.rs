//! Test vectors for cross-implementation validation
//!
//! Peer implementations MUST reproduce these bytes exactly.

use crate::canonical::*;
use crate::types::*;
use serde::Serialize;

/// Test vector output format (JSON serializable)
#[derive(Serialize)]
pub struct TestVector {
    pub name: String,
    pub description: String,
    pub inputs: serde_json::Value,
    pub canonical_bytes_hex: String,
}

// RFC 8032 test 1 public key
const ED_HEX: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

/// Generate all test vectors
pub fn generate_test_vectors() -> Vec<TestVector> {
    vec![
        encryption_type_vector(EncryptionType::AesGcm),
        encryption_type_vector(EncryptionType::XChaCha20Poly1305),
        deliver_snode_vector(),
        forward_server_vector(),
    ]
}

fn encryption_type_vector(enc: EncryptionType) -> TestVector {
    TestVector {
        name: format!("encryption_type_{}", enc.name()),
        description: "EncryptionType is a single ordinal byte".into(),
        inputs: serde_json::json!({ "encryption": enc.name() }),
        canonical_bytes_hex: hex::encode(postcard::to_allocvec(&enc).unwrap()),
    }
}

fn deliver_snode_vector() -> TestVector {
    let body = LayerBody::new(
        Routing::Deliver {
            destination: DestinationMetadata::ServiceNode {
                ed25519: Ed25519PublicKey::from_hex(ED_HEX).unwrap(),
            },
        },
        vec![1, 2, 3],
    );

    TestVector {
        name: "deliver_service_node".into(),
        description: "Deliver(ServiceNode) || varint(len) || inner".into(),
        inputs: serde_json::json!({ "ed25519": ED_HEX, "inner_hex": "010203" }),
        canonical_bytes_hex: hex::encode(encode_body(&body).unwrap()),
    }
}

fn forward_server_vector() -> TestVector {
    let body = LayerBody::new(
        Routing::Forward {
            target: RelayTarget::Server(ServerEndpoint::new("a", "/b", "https", 443)),
            encryption: EncryptionType::XChaCha20Poly1305,
        },
        vec![],
    );

    TestVector {
        name: "forward_server".into(),
        description: "Forward(Server{host,target_path,scheme,varint port}) || enc || empty inner"
            .into(),
        inputs: serde_json::json!({
            "host": "a",
            "target_path": "/b",
            "scheme": "https",
            "port": 443,
            "encryption": 1,
        }),
        canonical_bytes_hex: hex::encode(encode_body(&body).unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_are_stable() {
        let vectors = generate_test_vectors();
        let hexes: Vec<&str> = vectors.iter().map(|v| v.canonical_bytes_hex.as_str()).collect();

        assert_eq!(hexes[0], "00");
        assert_eq!(hexes[1], "01");
        assert_eq!(hexes[2], format!("0101{ED_HEX}03010203"));
        assert_eq!(hexes[3], "00010161022f62056874747073bb030100");
    }

    #[test]
    fn test_vectors_serialize_to_json() {
        let json = serde_json::to_string_pretty(&generate_test_vectors()).unwrap();
        assert!(json.contains("deliver_service_node"));
    }
}
