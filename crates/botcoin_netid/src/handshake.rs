//! Per-peer version handshake and the table of open connections.
//!
//! `AwaitingVersion -> AwaitingVerack -> Established`; any identity failure
//! moves the peer to `Rejected` for good.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::wire::{frame, parse_frame, Command, VersionMessage};
use crate::{IdentityError, IdentityGate};

pub type PeerId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingVersion,
    AwaitingVerack,
    Established,
    Rejected(IdentityError),
}

impl HandshakeState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AwaitingVersion => "awaiting_version",
            Self::AwaitingVerack => "awaiting_verack",
            Self::Established => "established",
            Self::Rejected(_) => "rejected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Handshake {
    state: HandshakeState,
    negotiated_version: Option<u32>,
    peer_user_agent: Option<String>,
    peer_start_height: Option<i32>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: HandshakeState::AwaitingVersion,
            negotiated_version: None,
            peer_user_agent: None,
            peer_start_height: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &HandshakeState {
        &self.state
    }

    #[must_use]
    pub const fn is_established(&self) -> bool {
        matches!(self.state, HandshakeState::Established)
    }

    #[must_use]
    pub const fn negotiated_version(&self) -> Option<u32> {
        self.negotiated_version
    }

    #[must_use]
    pub fn peer_user_agent(&self) -> Option<&str> {
        self.peer_user_agent.as_deref()
    }

    #[must_use]
    pub const fn peer_start_height(&self) -> Option<i32> {
        self.peer_start_height
    }

    /// Feed one inbound frame and return the frames to send back.
    pub fn receive(
        &mut self,
        gate: &IdentityGate,
        bytes: &[u8],
    ) -> Result<Vec<Vec<u8>>, IdentityError> {
        if let HandshakeState::Rejected(e) = &self.state {
            return Err(e.clone());
        }
        let result = self.step(gate, bytes);
        if let Err(e) = &result {
            tracing::warn!(state = self.state.name(), error = %e, "handshake rejected");
            self.state = HandshakeState::Rejected(e.clone());
        }
        result
    }

    fn step(&mut self, gate: &IdentityGate, bytes: &[u8]) -> Result<Vec<Vec<u8>>, IdentityError> {
        let (header, payload) = parse_frame(gate, bytes)?;
        let current = self.state.clone();
        match (&current, header.command) {
            (HandshakeState::AwaitingVersion, Command::VERSION) => {
                let msg = VersionMessage::deserialize(payload)?;
                let version = gate.negotiated_version(gate.params().protocol_version, msg.version)?;
                self.negotiated_version = Some(version);
                self.peer_start_height = Some(msg.start_height);
                self.peer_user_agent = Some(msg.user_agent);
                self.state = HandshakeState::AwaitingVerack;
                Ok(vec![frame(gate.magic(), Command::VERACK, &[])])
            }
            (HandshakeState::AwaitingVerack, Command::VERACK) => {
                self.state = HandshakeState::Established;
                tracing::info!(
                    version = self.negotiated_version,
                    agent = self.peer_user_agent.as_deref().unwrap_or_default(),
                    "peer handshake complete"
                );
                Ok(Vec::new())
            }
            (HandshakeState::Established, Command::PING) => {
                Ok(vec![frame(gate.magic(), Command::PONG, payload)])
            }
            (HandshakeState::Established, _) => Ok(Vec::new()),
            (state, command) => Err(IdentityError::UnexpectedMessage {
                command: command.name(),
                state: state.name(),
            }),
        }
    }
}

/// Handshakes of every open connection.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    peers: Mutex<HashMap<PeerId, Handshake>>,
    next_id: AtomicU64,
}

impl ConnectionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection awaiting the peer's `version`.
    pub fn open(&self) -> PeerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.peers.lock().insert(id, Handshake::new());
        id
    }

    pub fn receive(
        &self,
        gate: &IdentityGate,
        peer: PeerId,
        bytes: &[u8],
    ) -> Result<Vec<Vec<u8>>, IdentityError> {
        let mut peers = self.peers.lock();
        let hs = peers
            .get_mut(&peer)
            .ok_or(IdentityError::UnknownPeer(peer))?;
        hs.receive(gate, bytes)
    }

    pub fn close(&self, peer: PeerId) -> Option<Handshake> {
        self.peers.lock().remove(&peer)
    }

    #[must_use]
    pub fn state(&self, peer: PeerId) -> Option<HandshakeState> {
        self.peers.lock().get(&peer).map(|h| h.state().clone())
    }

    /// Connections that completed the handshake.
    #[must_use]
    pub fn established(&self) -> usize {
        self.peers
            .lock()
            .values()
            .filter(|h| h.is_established())
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
