//! In-process stand-in for the network: relays, a destination, and a
//! dispatcher that walks a request through them.
//!
//! Each relay opens its own layer and hands the inner bytes to whatever its
//! routing instruction names. The destination echoes the payload back,
//! sealed under its layer key. Relays do not touch the response.

use anyhow::{anyhow, bail, Context};
use ed25519_dalek::SigningKey;
use onionreq::layer::{open_layer_bytes, seal_response};
use onionreq::{
    Destination, DestinationMetadata, Ed25519PublicKey, EncryptionType, Hop, OnionRequestBuilder,
    RecipientKeyPair, RelayTarget, Routing, ServerEndpoint,
};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use std::collections::HashMap;
use tracing::debug;

/// Prefix the destination puts on echoed payloads
pub const ECHO_PREFIX: &[u8] = b"echo:";

/// Keys of one simulated node
pub struct Identity {
    pub ed25519: Ed25519PublicKey,
    pub keys: RecipientKeyPair,
}

impl Identity {
    pub fn generate() -> anyhow::Result<Self> {
        let signing = SigningKey::generate(&mut OsRng);
        Ok(Self {
            ed25519: Ed25519PublicKey::from_bytes(signing.verifying_key().as_bytes())?,
            keys: RecipientKeyPair::generate()?,
        })
    }

    pub fn hop(&self) -> Hop {
        Hop::new(self.ed25519, *self.keys.public_key())
    }
}

/// Loopback statistics
#[derive(Debug, Clone, Default)]
pub struct LoopbackStats {
    pub layers_processed: u64,
    pub layers_forwarded: u64,
    pub requests_delivered: u64,
    pub requests_dropped: u64,
}

/// Simulated path plus destination
pub struct LoopbackNetwork {
    relays: Vec<Identity>,
    by_address: HashMap<Ed25519PublicKey, usize>,
    destination: Identity,
    server: Option<ServerEndpoint>,
    stats: RwLock<LoopbackStats>,
}

impl LoopbackNetwork {
    /// Fresh identities for `hops` relays and one destination. With
    /// `server` set the destination poses as an application server.
    pub fn generate(hops: usize, server: Option<ServerEndpoint>) -> anyhow::Result<Self> {
        let relays = (0..hops)
            .map(|_| Identity::generate())
            .collect::<anyhow::Result<Vec<_>>>()?;
        let by_address = relays
            .iter()
            .enumerate()
            .map(|(i, r)| (r.ed25519, i))
            .collect();

        Ok(Self {
            relays,
            by_address,
            destination: Identity::generate()?,
            server,
            stats: RwLock::new(LoopbackStats::default()),
        })
    }

    pub fn destination(&self) -> Destination {
        match &self.server {
            Some(endpoint) => Destination::Server {
                endpoint: endpoint.clone(),
                x25519: *self.destination.keys.public_key(),
            },
            None => Destination::ServiceNode {
                ed25519: self.destination.ed25519,
                x25519: *self.destination.keys.public_key(),
            },
        }
    }

    pub fn hops(&self) -> Vec<Hop> {
        self.relays.iter().map(Identity::hop).collect()
    }

    /// A builder configured for this network
    pub fn builder(&self, encryption: EncryptionType) -> onionreq::Result<OnionRequestBuilder> {
        let mut builder = OnionRequestBuilder::new(encryption);
        builder.set_destination(self.destination())?;
        for hop in self.hops() {
            builder.add_hop(hop)?;
        }
        Ok(builder)
    }

    pub fn stats(&self) -> LoopbackStats {
        self.stats.read().clone()
    }

    /// Deliver `request` to the entry hop and return the response blob
    pub fn dispatch(&self, encryption: EncryptionType, request: &[u8]) -> anyhow::Result<Vec<u8>> {
        let result = self.route(encryption, request);
        if result.is_err() {
            self.stats.write().requests_dropped += 1;
        }
        result
    }

    fn route(&self, encryption: EncryptionType, request: &[u8]) -> anyhow::Result<Vec<u8>> {
        let entry = self.relays.first().ok_or_else(|| anyhow!("no relays"))?;
        let mut node = entry;
        let mut bytes = request.to_vec();
        let mut layer_enc = encryption;

        loop {
            let (body, _, _) = open_layer_bytes(layer_enc, &node.keys, &bytes)
                .with_context(|| format!("relay {} rejected its layer", node.ed25519))?;
            self.stats.write().layers_processed += 1;

            let (target, next_enc) = match &body.routing {
                Routing::Forward { target, encryption } => (target.clone(), *encryption),
                Routing::Deliver { .. } => bail!("relay {} received a deliver layer", node.ed25519),
            };
            self.stats.write().layers_forwarded += 1;
            bytes = body.inner.clone();
            layer_enc = next_enc;

            match target {
                RelayTarget::Node { ed25519 } => {
                    if let Some(&i) = self.by_address.get(&ed25519) {
                        debug!(from = %node.ed25519, to = %ed25519, "forwarding to relay");
                        node = &self.relays[i];
                        continue;
                    }
                    if ed25519 != self.destination.ed25519 || self.server.is_some() {
                        bail!("unknown node {ed25519}");
                    }
                }
                RelayTarget::Server(endpoint) => {
                    if self.server.as_ref() != Some(&endpoint) {
                        bail!("unknown server {}", endpoint.url());
                    }
                }
            }
            return self.deliver(layer_enc, &bytes);
        }
    }

    fn deliver(&self, encryption: EncryptionType, bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
        let (body, key, ephemeral_public_key) =
            open_layer_bytes(encryption, &self.destination.keys, bytes)
                .context("destination rejected its layer")?;

        let expected = match &self.server {
            Some(endpoint) => DestinationMetadata::Server(endpoint.clone()),
            None => DestinationMetadata::ServiceNode {
                ed25519: self.destination.ed25519,
            },
        };
        match &body.routing {
            Routing::Deliver { destination } if *destination == expected => {}
            other => bail!("destination got unexpected routing {other:?}"),
        }

        let mut echo = ECHO_PREFIX.to_vec();
        echo.extend_from_slice(&body.inner);
        let response = seal_response(encryption, &key, &ephemeral_public_key, &echo)?;
        self.stats.write().requests_delivered += 1;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snode_loopback() {
        let net = LoopbackNetwork::generate(3, None).unwrap();
        let enc = EncryptionType::AesGcm;
        let mut builder = net.builder(enc).unwrap();

        let request = builder.build(b"hello").unwrap();
        let response = net.dispatch(enc, &request).unwrap();
        assert_eq!(builder.decrypt(&response).unwrap(), b"echo:hello");

        let stats = net.stats();
        assert_eq!(stats.layers_processed, 3);
        assert_eq!(stats.layers_forwarded, 3);
        assert_eq!(stats.requests_delivered, 1);
    }

    #[test]
    fn test_server_loopback() {
        let endpoint = ServerEndpoint::new("open.example", "/oxen/v4/lsrpc", "https", 443);
        let net = LoopbackNetwork::generate(2, Some(endpoint)).unwrap();
        let enc = EncryptionType::XChaCha20Poly1305;
        let mut builder = net.builder(enc).unwrap();

        let request = builder.build(b"{}").unwrap();
        let response = net.dispatch(enc, &request).unwrap();
        assert_eq!(builder.decrypt(&response).unwrap(), b"echo:{}");
    }

    #[test]
    fn test_corrupt_request_dropped() {
        let net = LoopbackNetwork::generate(2, None).unwrap();
        let enc = EncryptionType::AesGcm;
        let mut request = net.builder(enc).unwrap().build(b"x").unwrap();
        let last = request.len() - 1;
        request[last] ^= 0x01;

        assert!(net.dispatch(enc, &request).is_err());
        assert_eq!(net.stats().requests_dropped, 1);
        assert_eq!(net.stats().requests_delivered, 0);
    }

    #[test]
    fn test_wrong_encryption_dropped() {
        let net = LoopbackNetwork::generate(1, None).unwrap();
        let request = net
            .builder(EncryptionType::XChaCha20Poly1305)
            .unwrap()
            .build(b"x")
            .unwrap();
        assert!(net.dispatch(EncryptionType::AesGcm, &request).is_err());
    }
}
