use botcoin_netid::{
    default_user_agent, frame, Command, ConnectionTable, Handshake, HandshakeState,
    IdentityError, IdentityGate, NetAddress, VersionMessage,
};
use botcoin_params::{MAIN, REGTEST, TEST};

fn version_frame(gate: &IdentityGate, version: u32) -> Vec<u8> {
    let mut msg = gate.version_message(NetAddress::ipv4(1, [10, 0, 0, 2], 18544), 9, 1_738_195_200, 0);
    msg.version = version;
    frame(gate.magic(), Command::VERSION, &msg.serialize())
}

#[test]
fn two_peers_reach_established() {
    let a = IdentityGate::new(&REGTEST, &default_user_agent()).unwrap();
    let b = IdentityGate::new(&REGTEST, "/Botcoin:0.1.0(b)/").unwrap();
    let mut at_a = Handshake::new();
    let mut at_b = Handshake::new();

    // Each side sends its version; each replies verack.
    let reply_from_a = at_a.receive(&a, &version_frame(&b, 70100)).unwrap();
    let reply_from_b = at_b.receive(&b, &version_frame(&a, 70100)).unwrap();
    assert_eq!(at_a.state(), &HandshakeState::AwaitingVerack);
    assert!(at_b.receive(&b, &reply_from_a[0]).unwrap().is_empty());
    assert!(at_a.receive(&a, &reply_from_b[0]).unwrap().is_empty());

    assert!(at_a.is_established() && at_b.is_established());
    assert_eq!(at_a.negotiated_version(), Some(70100));
    assert_eq!(at_a.peer_user_agent(), Some("/Botcoin:0.1.0(b)/"));
}

#[test]
fn foreign_magic_never_completes() {
    let ours = IdentityGate::new(&MAIN, &default_user_agent()).unwrap();
    let theirs = IdentityGate::new(&TEST, &default_user_agent()).unwrap();
    let mut hs = Handshake::new();
    let err = hs.receive(&ours, &version_frame(&theirs, 70100)).unwrap_err();
    assert!(matches!(err, IdentityError::MagicMismatch { .. }));
    assert_eq!(hs.state(), &HandshakeState::Rejected(err.clone()));
    // Rejection is terminal.
    assert_eq!(hs.receive(&ours, &version_frame(&ours, 70100)), Err(err));
}

#[test]
fn old_protocol_is_rejected() {
    let gate = IdentityGate::new(&REGTEST, &default_user_agent()).unwrap();
    let mut hs = Handshake::new();
    assert_eq!(
        hs.receive(&gate, &version_frame(&gate, 70015)),
        Err(IdentityError::VersionIncompatible {
            version: 70015,
            minimum: 70100
        })
    );
}

#[test]
fn verack_before_version_is_unexpected() {
    let gate = IdentityGate::new(&REGTEST, &default_user_agent()).unwrap();
    let mut hs = Handshake::new();
    let verack = frame(gate.magic(), Command::VERACK, &[]);
    assert!(matches!(
        hs.receive(&gate, &verack),
        Err(IdentityError::UnexpectedMessage { state: "awaiting_version", .. })
    ));
}

#[test]
fn established_peers_get_pong() {
    let gate = IdentityGate::new(&REGTEST, &default_user_agent()).unwrap();
    let mut hs = Handshake::new();
    hs.receive(&gate, &version_frame(&gate, 70100)).unwrap();
    hs.receive(&gate, &frame(gate.magic(), Command::VERACK, &[])).unwrap();
    let out = hs
        .receive(&gate, &frame(gate.magic(), Command::PING, &7u64.to_le_bytes()))
        .unwrap();
    assert_eq!(out, vec![frame(gate.magic(), Command::PONG, &7u64.to_le_bytes())]);
}

#[test]
fn table_counts_only_established() {
    let gate = IdentityGate::new(&REGTEST, &default_user_agent()).unwrap();
    let table = ConnectionTable::new();
    let good = table.open();
    let pending = table.open();
    let bad = table.open();
    table.receive(&gate, good, &version_frame(&gate, 70100)).unwrap();
    table
        .receive(&gate, good, &frame(gate.magic(), Command::VERACK, &[]))
        .unwrap();
    table.receive(&gate, pending, &version_frame(&gate, 70100)).unwrap();
    let foreign = frame(MAIN.network_magic, Command::VERSION, &[]);
    assert!(table.receive(&gate, bad, &foreign).is_err());

    assert_eq!(table.len(), 3);
    assert_eq!(table.established(), 1);
    assert_eq!(table.state(pending), Some(HandshakeState::AwaitingVerack));
    assert!(matches!(table.state(bad), Some(HandshakeState::Rejected(_))));
    assert_eq!(gate.network_info(table.established()).connections, 1);
    assert!(table.close(good).is_some());
    assert_eq!(table.established(), 0);
    assert_eq!(
        table.receive(&gate, 99, &foreign),
        Err(IdentityError::UnknownPeer(99))
    );
}

#[test]
fn version_message_carries_gate_identity() {
    let gate = IdentityGate::new(&TEST, &default_user_agent()).unwrap();
    let msg = gate.version_message(NetAddress::unroutable(0), 1, 2, 3);
    assert_eq!(msg.version, 70100);
    assert_eq!(msg.user_agent, "/Botcoin:0.1.0/");
    let back = VersionMessage::deserialize(&msg.serialize()).unwrap();
    assert_eq!(back, msg);
}
