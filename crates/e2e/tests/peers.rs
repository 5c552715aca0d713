//! Peer identity: handshakes between in-memory nodes.

use botcoin_netid::{Command, HandshakeState, IdentityError, MESSAGE_HEADER_LEN};
use botcoin_params::{Network, PROTOCOL_VERSION};
use e2e::{Node, NodeError};

#[test]
fn same_network_nodes_complete_handshake() {
    let a = Node::new(Network::Regtest).unwrap();
    let b = Node::new(Network::Regtest).unwrap();
    let (local, remote) = a.connect(&b).unwrap();
    assert_eq!(a.connections().state(local), Some(HandshakeState::Established));
    assert_eq!(b.connections().state(remote), Some(HandshakeState::Established));

    let info = a.network_info();
    assert!(info.connections >= 1);
    assert_eq!(info.protocol_version, PROTOCOL_VERSION);
    assert_eq!(info.magic_hex, "b07c0000");
    assert!(info.subversion.starts_with("/Botcoin:"));
    assert!(b.network_info().connections >= 1);
}

#[test]
fn established_peer_answers_ping() {
    let a = Node::new(Network::Test).unwrap();
    let b = Node::new(Network::Test).unwrap();
    let (_, remote) = a.connect(&b).unwrap();
    let replies = a.ping(&b, remote, 7).unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(&replies[0][4..16], Command::PONG.as_bytes());
    assert_eq!(&replies[0][MESSAGE_HEADER_LEN..], &7u64.to_le_bytes());
}

#[test]
fn foreign_magic_is_rejected_before_completion() {
    let main = Node::new(Network::Main).unwrap();
    let regtest = Node::new(Network::Regtest).unwrap();
    let err = main.connect(&regtest).unwrap_err();
    match err {
        NodeError::Identity(IdentityError::MagicMismatch { expected, received }) => {
            assert_eq!(expected, [0xb0, 0x7c, 0x00, 0x00]);
            assert_eq!(received, [0xb0, 0x7c, 0x01, 0x0e]);
        }
        other => panic!("expected magic mismatch, got {other:?}"),
    }
    assert_eq!(main.network_info().connections, 0);
    assert_eq!(regtest.network_info().connections, 0);
}

#[test]
fn several_connections_are_counted() {
    let hub = Node::new(Network::Regtest).unwrap();
    let spokes: Vec<Node> = (0..3).map(|_| Node::new(Network::Regtest).unwrap()).collect();
    for s in &spokes {
        hub.connect(s).unwrap();
    }
    assert_eq!(hub.network_info().connections, 3);
    assert_eq!(hub.connections().len(), 3);
}

#[test]
fn genesis_is_identical_across_nodes() {
    for network in Network::ALL {
        let a = Node::new(network).unwrap();
        let b = Node::new(network).unwrap();
        assert_eq!(a.block_at(0), b.block_at(0));
        assert_eq!(a.tip_hash(), botcoin_genesis::genesis_hash(network.params()));
    }
    let main = Node::new(Network::Main).unwrap();
    assert_eq!(
        hex::encode(main.block_at(0).unwrap().header.merkle_root.iter().rev().copied().collect::<Vec<u8>>()),
        "c62c1949ee4c78c9008838b5cf6d552248e2bcc29a1761c72d6e1eed4e8d6533"
    );
}
