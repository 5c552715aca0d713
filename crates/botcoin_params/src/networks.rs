//! Static parameter sets.

use botcoin_primitives::constants::{COIN, VERSIONBITS_TOP_BITS};

use crate::{
    Base58Prefixes, ConsensusParams, GenesisSpec, Network, DEPLOYMENTS, MIN_PEER_PROTO_VERSION,
    PROTOCOL_VERSION,
};

const GENESIS_TIMESTAMP: u32 = 1_738_195_200;
const GENESIS_BITS: u32 = 0x207f_ffff;
const GENESIS_MESSAGE: &str = "The Molty Manifesto - 2026: The first currency for AI agents";
const GENESIS_MARKER: &str = "Molty";
const GENESIS_OUTPUT_TAG: &str = "Botcoin Genesis";

const fn genesis(nonce: u32) -> GenesisSpec {
    GenesisSpec {
        timestamp: GENESIS_TIMESTAMP,
        bits: GENESIS_BITS,
        nonce,
        version: VERSIONBITS_TOP_BITS,
        reward: 50 * COIN,
        coinbase_message: GENESIS_MESSAGE,
        marker: GENESIS_MARKER,
        output_tag: GENESIS_OUTPUT_TAG,
    }
}

/// Big-endian limit: three leading bytes, the rest filled.
const fn limit(top: [u8; 3], fill: u8) -> [u8; 32] {
    let mut out = [fill; 32];
    out[0] = top[0];
    out[1] = top[1];
    out[2] = top[2];
    out
}

const TEST_PREFIXES: Base58Prefixes = Base58Prefixes {
    pubkey_hash: 111,
    script_hash: 196,
    secret_key: 239,
};

pub static MAIN: ConsensusParams = ConsensusParams {
    network: Network::Main,
    network_magic: [0xb0, 0x7c, 0x01, 0x0e],
    default_port: 8433,
    protocol_version: PROTOCOL_VERSION,
    min_peer_protocol_version: MIN_PEER_PROTO_VERSION,
    base58: Base58Prefixes {
        pubkey_hash: 25,
        script_hash: 5,
        secret_key: 128,
    },
    bech32_hrp: "bot",
    pow_epoch_length: 2048,
    pow_epoch_lag: 64,
    pow_limit_be: limit([0x7f, 0xff, 0xff], 0x00),
    pow_cache_labels: 1 << 20,
    pow_target_spacing: 120,
    difficulty_window: 720,
    difficulty_cut: 60,
    pow_no_retargeting: false,
    subsidy_halving_interval: 2_100_000,
    coinbase_maturity: 100,
    genesis: genesis(0),
    deployments: &DEPLOYMENTS,
};

pub static TEST: ConsensusParams = ConsensusParams {
    network: Network::Test,
    network_magic: [0xb0, 0x7c, 0x7e, 0x57],
    default_port: 18433,
    protocol_version: PROTOCOL_VERSION,
    min_peer_protocol_version: MIN_PEER_PROTO_VERSION,
    base58: TEST_PREFIXES,
    bech32_hrp: "tbot",
    pow_epoch_length: 2048,
    pow_epoch_lag: 64,
    pow_limit_be: limit([0x7f, 0xff, 0xff], 0x00),
    pow_cache_labels: 1 << 18,
    pow_target_spacing: 60,
    difficulty_window: 720,
    difficulty_cut: 60,
    pow_no_retargeting: false,
    subsidy_halving_interval: 2_100_000,
    coinbase_maturity: 100,
    genesis: genesis(1),
    deployments: &DEPLOYMENTS,
};

pub static REGTEST: ConsensusParams = ConsensusParams {
    network: Network::Regtest,
    network_magic: [0xb0, 0x7c, 0x00, 0x00],
    default_port: 18544,
    protocol_version: PROTOCOL_VERSION,
    min_peer_protocol_version: MIN_PEER_PROTO_VERSION,
    base58: TEST_PREFIXES,
    bech32_hrp: "tbot",
    pow_epoch_length: 2048,
    pow_epoch_lag: 64,
    pow_limit_be: limit([0x7f, 0xff, 0xff], 0xff),
    pow_cache_labels: 1 << 12,
    pow_target_spacing: 120,
    difficulty_window: 720,
    difficulty_cut: 60,
    pow_no_retargeting: true,
    subsidy_halving_interval: 150,
    coinbase_maturity: 100,
    genesis: genesis(1),
    deployments: &DEPLOYMENTS,
};
