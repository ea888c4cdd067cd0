//! Onion request construction
//!
//! [`OnionRequestBuilder`] collects a destination and an ordered hop list,
//! then wraps a payload in one layer per hop plus a destination layer.
//! Hops are stored in routing order (entry first) and encrypted in reverse:
//! the destination layer is built first and the entry hop's layer last.

use crate::crypto::SymmetricKey;
use crate::framing::EPHEMERAL_KEY_LEN;
use crate::layer::{encode_layer, open_response};
use onionreq_core::{
    BuildError, Destination, DestinationMetadata, Ed25519PublicKey, EncryptionType, Hop,
    RelayTarget, Result, Routing, ServerEndpoint, X25519PublicKey,
};
use tracing::debug;

/// Longest path a builder accepts
pub const MAX_HOPS: usize = 16;

/// Short hex fingerprint of request bytes, for logs.
pub fn request_fingerprint(bytes: &[u8]) -> String {
    hex::encode(&blake3::hash(bytes).as_bytes()[..8])
}

/// Decrypts the single response to one built request.
///
/// Holds only the destination layer key and that layer's ephemeral public
/// key; both are fixed at build time.
#[derive(Debug)]
pub struct ResponseParser {
    encryption: EncryptionType,
    key: SymmetricKey,
    ephemeral_public_key: [u8; EPHEMERAL_KEY_LEN],
}

impl ResponseParser {
    pub fn encryption_type(&self) -> EncryptionType {
        self.encryption
    }

    /// Decrypt a response blob returned through the path
    pub fn decrypt(&self, response: &[u8]) -> Result<Vec<u8>> {
        open_response(self.encryption, &self.key, &self.ephemeral_public_key, response)
    }
}

#[derive(Debug)]
enum State {
    Configuring,
    Built(ResponseParser),
    /// Layer construction failed; the builder is spent
    Failed,
}

/// One-shot onion request builder.
#[derive(Debug)]
pub struct OnionRequestBuilder {
    encryption: EncryptionType,
    destination: Option<Destination>,
    hops: Vec<Hop>,
    state: State,
}

impl Default for OnionRequestBuilder {
    fn default() -> Self {
        Self::new(EncryptionType::default())
    }
}

impl OnionRequestBuilder {
    /// Create a builder that encrypts every layer with `encryption`
    pub fn new(encryption: EncryptionType) -> Self {
        Self {
            encryption,
            destination: None,
            hops: Vec::new(),
            state: State::Configuring,
        }
    }

    pub fn encryption_type(&self) -> EncryptionType {
        self.encryption
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    pub fn is_built(&self) -> bool {
        matches!(self.state, State::Built(_))
    }

    fn ensure_configuring(&self) -> Result<()> {
        match self.state {
            State::Configuring => Ok(()),
            _ => Err(BuildError::InvalidState.into()),
        }
    }

    /// Set the destination. Only one may ever be set.
    pub fn set_destination(&mut self, destination: Destination) -> Result<()> {
        self.ensure_configuring()?;
        if self.destination.is_some() {
            return Err(BuildError::DestinationAlreadySet.into());
        }
        self.destination = Some(destination);
        Ok(())
    }

    /// Target an application server
    pub fn set_server_destination(
        &mut self,
        host: &str,
        target_path: &str,
        scheme: &str,
        port: u16,
        x25519: X25519PublicKey,
    ) -> Result<()> {
        self.set_destination(Destination::Server {
            endpoint: ServerEndpoint::new(host, target_path, scheme, port),
            x25519,
        })
    }

    /// Hex-key variant of [`Self::set_server_destination`]
    pub fn set_server_destination_hex(
        &mut self,
        host: &str,
        target_path: &str,
        scheme: &str,
        port: u16,
        x25519_hex: &str,
    ) -> Result<()> {
        let x25519 = X25519PublicKey::from_hex(x25519_hex)?;
        self.set_server_destination(host, target_path, scheme, port, x25519)
    }

    /// Target a service node
    pub fn set_snode_destination(
        &mut self,
        ed25519: Ed25519PublicKey,
        x25519: X25519PublicKey,
    ) -> Result<()> {
        self.set_destination(Destination::ServiceNode { ed25519, x25519 })
    }

    /// Hex-key variant of [`Self::set_snode_destination`]
    pub fn set_snode_destination_hex(&mut self, ed25519_hex: &str, x25519_hex: &str) -> Result<()> {
        let ed25519 = Ed25519PublicKey::from_hex(ed25519_hex)?;
        let x25519 = X25519PublicKey::from_hex(x25519_hex)?;
        self.set_snode_destination(ed25519, x25519)
    }

    /// Append a hop. The first hop added is the entry node.
    pub fn add_hop(&mut self, hop: Hop) -> Result<()> {
        self.ensure_configuring()?;
        if self.hops.len() >= MAX_HOPS {
            return Err(BuildError::TooManyHops { max: MAX_HOPS }.into());
        }
        self.hops.push(hop);
        Ok(())
    }

    /// Hex-key variant of [`Self::add_hop`]
    pub fn add_hop_hex(&mut self, ed25519_hex: &str, x25519_hex: &str) -> Result<()> {
        let hop = Hop::from_hex(ed25519_hex, x25519_hex)?;
        self.add_hop(hop)
    }

    /// Build the request bytes for the entry hop.
    ///
    /// Missing destination or hops leave the builder untouched. Success moves
    /// it to the built state, after which only [`Self::decrypt`] is allowed;
    /// a failure during layer construction leaves it permanently spent.
    pub fn build(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.ensure_configuring()?;
        let destination = self
            .destination
            .as_ref()
            .ok_or(BuildError::MissingDestination)?;
        if self.hops.is_empty() {
            return Err(BuildError::NoHops.into());
        }

        match wrap(self.encryption, destination, &self.hops, payload) {
            Ok((request, parser)) => {
                self.state = State::Built(parser);
                Ok(request)
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Consume the builder, returning the request bytes and the parser for
    /// its response.
    pub fn into_request(mut self, payload: &[u8]) -> Result<(Vec<u8>, ResponseParser)> {
        let request = self.build(payload)?;
        match std::mem::replace(&mut self.state, State::Failed) {
            State::Built(parser) => Ok((request, parser)),
            _ => Err(BuildError::InvalidState.into()),
        }
    }

    /// Decrypt the response to the request this builder produced
    pub fn decrypt(&self, response: &[u8]) -> Result<Vec<u8>> {
        match &self.state {
            State::Built(parser) => parser.decrypt(response),
            _ => Err(BuildError::InvalidState.into()),
        }
    }
}

/// Where the exit hop sends the destination layer
fn exit_target(destination: &Destination) -> RelayTarget {
    match destination {
        Destination::Server { endpoint, .. } => RelayTarget::Server(endpoint.clone()),
        Destination::ServiceNode { ed25519, .. } => RelayTarget::Node { ed25519: *ed25519 },
    }
}

fn destination_metadata(destination: &Destination) -> DestinationMetadata {
    match destination {
        Destination::Server { endpoint, .. } => DestinationMetadata::Server(endpoint.clone()),
        Destination::ServiceNode { ed25519, .. } => DestinationMetadata::ServiceNode {
            ed25519: *ed25519,
        },
    }
}

fn wrap(
    encryption: EncryptionType,
    destination: &Destination,
    hops: &[Hop],
    payload: &[u8],
) -> Result<(Vec<u8>, ResponseParser)> {
    // Innermost first: the destination layer
    let (dest_layer, key) = encode_layer(
        encryption,
        destination.x25519(),
        Routing::Deliver {
            destination: destination_metadata(destination),
        },
        payload.to_vec(),
    )?;
    let parser = ResponseParser {
        encryption,
        key,
        ephemeral_public_key: dest_layer.ephemeral_public_key,
    };

    let mut current = dest_layer.to_bytes();
    let mut next = exit_target(destination);

    // Exit hop to entry hop
    for hop in hops.iter().rev() {
        let (layer, _hop_key) = encode_layer(
            encryption,
            &hop.x25519,
            Routing::Forward {
                target: next,
                encryption,
            },
            current,
        )?;
        current = layer.to_bytes();
        next = RelayTarget::Node {
            ed25519: hop.ed25519,
        };
    }

    debug!(
        destination = destination.kind(),
        hops = hops.len(),
        encryption = %encryption,
        len = current.len(),
        request = %request_fingerprint(&current),
        "built onion request"
    );

    Ok((current, parser))
}
