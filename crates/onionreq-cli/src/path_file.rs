//! Path files: hop and destination keys supplied by a directory lookup
//!
//! ```json
//! {
//!   "encryption": "xchacha20",
//!   "destination": { "type": "snode", "ed25519": "..", "x25519": ".." },
//!   "hops": [ { "ed25519": "..", "x25519": ".." } ]
//! }
//! ```

use anyhow::Context;
use onionreq::{EncryptionType, OnionRequestBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Destination entry, keys in hex
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DestinationSpec {
    Server {
        host: String,
        target_path: String,
        #[serde(default = "default_scheme")]
        scheme: String,
        #[serde(default = "default_port")]
        port: u16,
        x25519: String,
    },
    Snode {
        ed25519: String,
        x25519: String,
    },
}

fn default_scheme() -> String {
    "https".into()
}

fn default_port() -> u16 {
    443
}

/// Hop entry, keys in hex
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopSpec {
    pub ed25519: String,
    pub x25519: String,
}

/// Parsed path file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathFile {
    #[serde(default)]
    pub encryption: Option<String>,
    pub destination: DestinationSpec,
    pub hops: Vec<HopSpec>,
}

impl PathFile {
    /// Read and parse a path file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading path file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing path file {}", path.display()))
    }

    /// Encryption named in the file, unless overridden
    pub fn encryption(&self, cli_override: Option<EncryptionType>) -> anyhow::Result<EncryptionType> {
        if let Some(enc) = cli_override {
            return Ok(enc);
        }
        match &self.encryption {
            Some(name) => name.parse().map_err(anyhow::Error::msg),
            None => Ok(EncryptionType::default()),
        }
    }

    /// Configure a fresh builder with this path
    pub fn builder(&self, encryption: EncryptionType) -> anyhow::Result<OnionRequestBuilder> {
        let mut builder = OnionRequestBuilder::new(encryption);
        match &self.destination {
            DestinationSpec::Server {
                host,
                target_path,
                scheme,
                port,
                x25519,
            } => builder
                .set_server_destination_hex(host, target_path, scheme, *port, x25519)
                .context("server destination")?,
            DestinationSpec::Snode { ed25519, x25519 } => builder
                .set_snode_destination_hex(ed25519, x25519)
                .context("snode destination")?,
        }
        for (i, hop) in self.hops.iter().enumerate() {
            builder
                .add_hop_hex(&hop.ed25519, &hop.x25519)
                .with_context(|| format!("hop {i}"))?;
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::Identity;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn hop_json(id: &Identity) -> serde_json::Value {
        serde_json::json!({
            "ed25519": id.ed25519.to_hex(),
            "x25519": id.keys.public_key().to_hex(),
        })
    }

    #[test]
    fn test_load_snode_path() {
        let dest = Identity::generate().unwrap();
        let relays: Vec<Identity> = (0..3).map(|_| Identity::generate().unwrap()).collect();
        let json = serde_json::json!({
            "encryption": "aes-gcm",
            "destination": {
                "type": "snode",
                "ed25519": dest.ed25519.to_hex(),
                "x25519": dest.keys.public_key().to_hex(),
            },
            "hops": relays.iter().map(hop_json).collect::<Vec<_>>(),
        });
        let file = write_temp(&json.to_string());

        let path = PathFile::load(file.path()).unwrap();
        let enc = path.encryption(None).unwrap();
        assert_eq!(enc, EncryptionType::AesGcm);

        let builder = path.builder(enc).unwrap();
        assert_eq!(builder.hop_count(), 3);
        assert_eq!(builder.encryption_type(), EncryptionType::AesGcm);
    }

    #[test]
    fn test_server_defaults_and_override() {
        let dest = Identity::generate().unwrap();
        let relay = Identity::generate().unwrap();
        let json = serde_json::json!({
            "destination": {
                "type": "server",
                "host": "file.example",
                "target_path": "/oxen/v4/lsrpc",
                "x25519": dest.keys.public_key().to_hex(),
            },
            "hops": [hop_json(&relay)],
        });
        let file = write_temp(&json.to_string());
        let path = PathFile::load(file.path()).unwrap();

        match &path.destination {
            DestinationSpec::Server { scheme, port, .. } => {
                assert_eq!(scheme, "https");
                assert_eq!(*port, 443);
            }
            other => panic!("unexpected destination {other:?}"),
        }
        assert_eq!(path.encryption(None).unwrap(), EncryptionType::XChaCha20Poly1305);
        assert_eq!(
            path.encryption(Some(EncryptionType::AesGcm)).unwrap(),
            EncryptionType::AesGcm
        );
    }

    #[test]
    fn test_bad_key_reports_hop() {
        let dest = Identity::generate().unwrap();
        let json = serde_json::json!({
            "destination": {
                "type": "snode",
                "ed25519": dest.ed25519.to_hex(),
                "x25519": dest.keys.public_key().to_hex(),
            },
            "hops": [{ "ed25519": dest.ed25519.to_hex(), "x25519": "beef" }],
        });
        let file = write_temp(&json.to_string());
        let path = PathFile::load(file.path()).unwrap();

        let err = path.builder(EncryptionType::default()).unwrap_err();
        assert!(format!("{err:#}").contains("hop 0"));
    }

    #[test]
    fn test_missing_file() {
        assert!(PathFile::load(Path::new("/nonexistent/path.json")).is_err());
    }
}
