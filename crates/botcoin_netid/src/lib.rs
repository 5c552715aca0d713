#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Botcoin network identity gate.
//!
//! Peers are admitted only when their frames carry this network's magic and
//! their advertised protocol version is at least the network minimum.

use botcoin_params::{ConsensusParams, Network};
use botcoin_primitives::DecodeError;
use serde::Serialize;
use thiserror::Error;

mod handshake;
mod wire;

pub use handshake::{ConnectionTable, Handshake, HandshakeState, PeerId};
pub use wire::{
    frame, parse_frame, Command, MessageHeader, NetAddress, VersionMessage, MAX_PAYLOAD,
    MESSAGE_HEADER_LEN,
};

pub const CLIENT_NAME: &str = "Botcoin";
pub const CLIENT_VERSION: &str = "0.1.0";
/// Services bit for a full node.
pub const NODE_NETWORK: u64 = 1;

const FORBIDDEN_AGENT_WORDS: [&str; 2] = ["Bitcoin", "Satoshi"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("magic mismatch: expected {}, received {}", hex::encode(.expected), hex::encode(.received))]
    MagicMismatch { expected: [u8; 4], received: [u8; 4] },
    #[error("negotiated protocol version {version} below minimum {minimum}")]
    VersionIncompatible { version: u32, minimum: u32 },
    #[error("user agent may not contain {0:?}")]
    ForbiddenUserAgent(String),
    #[error("user agent component contains reserved characters: {0:?}")]
    InvalidUserAgent(String),
    #[error("malformed message: {0}")]
    Malformed(#[from] DecodeError),
    #[error("payload checksum mismatch")]
    ChecksumMismatch,
    #[error("payload length {0} exceeds limit")]
    PayloadTooLarge(u32),
    #[error("unknown peer {0}")]
    UnknownPeer(u64),
    #[error("unexpected {command} message in state {state}")]
    UnexpectedMessage { command: String, state: &'static str },
}

/// BIP14 agent string: `/Name:version(comment; comment)/`.
pub fn user_agent(name: &str, version: &str, comments: &[&str]) -> Result<String, IdentityError> {
    for part in core::iter::once(name)
        .chain(core::iter::once(version))
        .chain(comments.iter().copied())
    {
        if part.contains(&['/', ':', '(', ')', ';'][..]) {
            return Err(IdentityError::InvalidUserAgent(part.to_owned()));
        }
    }
    let mut s = format!("/{name}:{version}");
    if !comments.is_empty() {
        s.push('(');
        s.push_str(&comments.join("; "));
        s.push(')');
    }
    s.push('/');
    check_user_agent(&s)?;
    Ok(s)
}

/// Reject agent strings that would pass this node off as another client.
pub fn check_user_agent(agent: &str) -> Result<(), IdentityError> {
    for word in FORBIDDEN_AGENT_WORDS {
        if agent.contains(word) {
            return Err(IdentityError::ForbiddenUserAgent(word.to_owned()));
        }
    }
    Ok(())
}

#[must_use]
pub fn default_user_agent() -> String {
    format!("/{CLIENT_NAME}:{CLIENT_VERSION}/")
}

/// Network identity as reported to the RPC collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub subversion: String,
    pub protocol_version: u32,
    pub connections: usize,
    pub network: Network,
    pub magic_hex: String,
    pub local_services: u64,
}

#[derive(Debug, Clone)]
pub struct IdentityGate {
    params: &'static ConsensusParams,
    user_agent: String,
}

impl IdentityGate {
    pub fn new(params: &'static ConsensusParams, user_agent: &str) -> Result<Self, IdentityError> {
        check_user_agent(user_agent)?;
        Ok(Self {
            params,
            user_agent: user_agent.to_owned(),
        })
    }

    #[must_use]
    pub const fn params(&self) -> &'static ConsensusParams {
        self.params
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub const fn magic(&self) -> [u8; 4] {
        self.params.network_magic
    }

    #[must_use]
    pub fn check_magic(&self, received: [u8; 4]) -> bool {
        received == self.params.network_magic
    }

    pub fn require_magic(&self, received: [u8; 4]) -> Result<(), IdentityError> {
        if self.check_magic(received) {
            return Ok(());
        }
        tracing::warn!(
            expected = %hex::encode(self.params.network_magic),
            received = %hex::encode(received),
            "frame with foreign magic rejected"
        );
        Err(IdentityError::MagicMismatch {
            expected: self.params.network_magic,
            received,
        })
    }

    /// `min(local, remote)`, refused when that falls below the network minimum.
    pub fn negotiated_version(&self, local: u32, remote: u32) -> Result<u32, IdentityError> {
        let minimum = self.params.min_peer_protocol_version;
        let version = local.min(remote);
        if version < minimum {
            tracing::warn!(local, remote, minimum, "negotiated protocol version too old");
            return Err(IdentityError::VersionIncompatible { version, minimum });
        }
        Ok(version)
    }

    /// Our `version` message for a connection to `receiver`.
    #[must_use]
    pub fn version_message(
        &self,
        receiver: NetAddress,
        nonce: u64,
        timestamp: i64,
        start_height: i32,
    ) -> VersionMessage {
        VersionMessage {
            version: self.params.protocol_version,
            services: NODE_NETWORK,
            timestamp,
            receiver,
            sender: NetAddress::unroutable(NODE_NETWORK),
            nonce,
            user_agent: self.user_agent.clone(),
            start_height,
            relay: true,
        }
    }

    #[must_use]
    pub fn network_info(&self, connections: usize) -> NetworkInfo {
        NetworkInfo {
            subversion: self.user_agent.clone(),
            protocol_version: self.params.protocol_version,
            connections,
            network: self.params.network,
            magic_hex: self.params.magic_hex(),
            local_services: NODE_NETWORK,
        }
    }
}
