use botcoin_address::{
    decode, encode, from_script_pubkey, script_pubkey, AddressError, AddressKind, AddressPayload,
};
use botcoin_params::Network;
use proptest::prelude::*;

fn every_kind(network: Network) -> Vec<AddressPayload> {
    vec![
        AddressPayload::p2pkh(network, [0x11; 20]),
        AddressPayload::p2sh(network, [0x22; 20]),
        AddressPayload::p2wpkh(network, [0x33; 20]),
        AddressPayload::p2wsh(network, [0x44; 32]),
        AddressPayload::p2tr(network, [0x55; 32]),
    ]
}

#[test]
fn every_kind_round_trips_on_every_network() {
    for n in Network::ALL {
        for p in every_kind(n) {
            let s = encode(&p).unwrap();
            assert_eq!(decode(&s, n), Ok(p.clone()), "{s}");
            assert_eq!(from_script_pubkey(&script_pubkey(&p), n), Some(p));
        }
    }
}

#[test]
fn visible_prefixes() {
    let main = encode(&AddressPayload::p2pkh(Network::Main, [0x11; 20])).unwrap();
    assert!(main.starts_with('B'), "{main}");
    let seg = encode(&AddressPayload::p2wpkh(Network::Main, [0x11; 20])).unwrap();
    assert!(seg.starts_with("bot1q"), "{seg}");
    let tr = encode(&AddressPayload::p2tr(Network::Regtest, [0x11; 32])).unwrap();
    assert!(tr.starts_with("tbot1p"), "{tr}");
}

#[test]
fn cross_network_addresses_fail_closed() {
    for p in every_kind(Network::Main) {
        let s = encode(&p).unwrap();
        let err = decode(&s, Network::Test).unwrap_err();
        match p.kind {
            AddressKind::PubkeyHash => assert_eq!(err, AddressError::UnknownVersion(25)),
            AddressKind::ScriptHash => assert_eq!(err, AddressError::UnknownVersion(5)),
            _ => assert_eq!(
                err,
                AddressError::WrongHumanReadablePart {
                    expected: "tbot".into(),
                    found: "bot".into()
                }
            ),
        }
    }
    let t = encode(&AddressPayload::p2wpkh(Network::Test, [1; 20])).unwrap();
    assert!(matches!(
        decode(&t, Network::Main),
        Err(AddressError::WrongHumanReadablePart { .. })
    ));
}

#[test]
fn bitcoin_mainnet_addresses_are_rejected() {
    assert_eq!(
        decode("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", Network::Main),
        Err(AddressError::UnknownVersion(0))
    );
    assert!(matches!(
        decode("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", Network::Main),
        Err(AddressError::WrongHumanReadablePart { .. })
    ));
}

#[test]
fn tampered_base58_checksum() {
    let s = encode(&AddressPayload::p2pkh(Network::Main, [0x11; 20])).unwrap();
    let mut chars: Vec<char> = s.chars().collect();
    let last = chars.len() - 1;
    chars[last] = if chars[last] == 'z' { 'y' } else { 'z' };
    let bad: String = chars.into_iter().collect();
    assert!(matches!(
        decode(&bad, Network::Main),
        Err(AddressError::ChecksumMismatch | AddressError::InvalidLength(_))
    ));
}

#[test]
fn tampered_bech32_checksum() {
    let s = "bot1qqurswpc8qurswpc8qurswpc8qurswpc8xcgymn";
    assert!(decode(s, Network::Main).is_ok());
    let bad = s.replace("xcgymn", "xcgymq");
    assert_eq!(decode(&bad, Network::Main), Err(AddressError::InvalidChecksum));
}

#[test]
fn checksum_variant_must_match_version() {
    // v0 program under Bech32m, v1 program under Bech32.
    assert_eq!(
        decode("bot1qqurswpc8qurswpc8qurswpc8qurswpc8nycg73", Network::Main),
        Err(AddressError::InvalidChecksum)
    );
    assert_eq!(
        decode(
            "bot1pqurswpc8qurswpc8qurswpc8qurswpc8qurswpc8qurswpc8qursrlkgev",
            Network::Main
        ),
        Err(AddressError::InvalidChecksum)
    );
}

#[test]
fn future_witness_versions_are_unsupported() {
    assert_eq!(
        decode(
            "bot1zqurswpc8qurswpc8qurswpc8qurswpc8qurswpc8qurswpc8qurs77ltj9",
            Network::Main
        ),
        Err(AddressError::UnsupportedWitnessVersion(2))
    );
}

#[test]
fn bad_witness_program_length() {
    assert_eq!(
        decode(
            "bot1qqurswpc8qurswpc8qurswpc8qurswpc8qurswpc8smlgd8",
            Network::Main
        ),
        Err(AddressError::InvalidWitnessProgram)
    );
}

#[test]
fn uppercase_bech32_is_accepted() {
    let s = "tbot1pqurswpc8qurswpc8qurswpc8qurswpc8qurswpc8qurswpc8qursavz6rm";
    let p = decode(&s.to_uppercase(), Network::Regtest).unwrap();
    assert_eq!(p.kind, AddressKind::WitnessV1);
    assert_eq!(p.hash_bytes, vec![7u8; 32]);
}

proptest! {
    #[test]
    fn decode_is_total(s in "\\PC{0,90}") {
        for n in Network::ALL {
            let _ = decode(&s, n);
        }
    }

    #[test]
    fn p2wsh_round_trips(bytes in prop::array::uniform32(any::<u8>())) {
        let p = AddressPayload::p2wsh(Network::Test, bytes);
        let s = encode(&p).unwrap();
        prop_assert_eq!(decode(&s, Network::Test), Ok(p));
    }

    #[test]
    fn p2pkh_round_trips(bytes in prop::array::uniform20(any::<u8>())) {
        let p = AddressPayload::p2pkh(Network::Main, bytes);
        let s = encode(&p).unwrap();
        prop_assert_eq!(decode(&s, Network::Main), Ok(p));
    }
}
