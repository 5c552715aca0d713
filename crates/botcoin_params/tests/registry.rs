use botcoin_params::{select, DeploymentName, Network, MAIN, REGTEST, TEST};
use botcoin_primitives::{decode_compact, U256};

#[test]
fn magics_are_distinct_and_botcoin_prefixed() {
    let magics: Vec<[u8; 4]> = Network::ALL
        .iter()
        .map(|n| n.params().network_magic)
        .collect();
    for (i, a) in magics.iter().enumerate() {
        assert_eq!(&a[..2], &[0xb0, 0x7c]);
        for b in &magics[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(MAIN.magic_hex(), "b07c010e");
}

#[test]
fn network_table_values() {
    assert_eq!(
        (MAIN.default_port, TEST.default_port, REGTEST.default_port),
        (8433, 18433, 18544)
    );
    assert_eq!(MAIN.base58.pubkey_hash, 25);
    assert_eq!(MAIN.base58.script_hash, 5);
    assert_eq!(MAIN.base58.secret_key, 128);
    assert_eq!(TEST.base58, REGTEST.base58);
    assert_eq!((MAIN.bech32_hrp, TEST.bech32_hrp), ("bot", "tbot"));
    for n in Network::ALL {
        let p = n.params();
        assert_eq!(p.protocol_version, 70100);
        assert_eq!(p.min_peer_protocol_version, 70100);
        assert_eq!((p.pow_epoch_length, p.pow_epoch_lag), (2048, 64));
        assert_eq!(p.coinbase_maturity, 100);
        assert_eq!(p.genesis.timestamp, 1_738_195_200);
        assert_eq!(p.genesis.bits, 0x207f_ffff);
    }
    assert_eq!(MAIN.genesis.nonce, 0);
    assert_eq!(TEST.genesis.nonce, 1);
    assert!(REGTEST.pow_no_retargeting && !MAIN.pow_no_retargeting);
}

#[test]
fn pow_limits() {
    assert_eq!(
        hex::encode(MAIN.pow_limit_be),
        format!("7fffff{}", "00".repeat(29))
    );
    assert_eq!(REGTEST.pow_limit(), U256::MAX >> 1);
    // Genesis bits never exceed the network limit.
    for n in Network::ALL {
        let p = n.params();
        assert!(decode_compact(p.genesis.bits).unwrap() <= p.pow_limit());
    }
}

#[test]
fn every_rule_set_active_from_genesis() {
    for name in [
        DeploymentName::Bip34,
        DeploymentName::Bip65,
        DeploymentName::Bip66,
        DeploymentName::Csv,
        DeploymentName::Segwit,
        DeploymentName::Taproot,
    ] {
        assert!(MAIN.is_active(name, 0), "{name:?}");
        assert!(REGTEST.is_active(name, 1_000_000), "{name:?}");
    }
    assert!(!MAIN.is_active(DeploymentName::TestDummy, u64::MAX));
    assert_eq!(MAIN.deployment(DeploymentName::Taproot).unwrap().bit, Some(2));
}

#[test]
fn selected_params_are_the_statics() {
    assert!(core::ptr::eq(select("regtest").unwrap(), &REGTEST));
    assert!(core::ptr::eq(Network::Main.params(), &MAIN));
}
