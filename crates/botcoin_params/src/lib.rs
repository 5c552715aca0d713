#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Botcoin consensus parameter registry.
//!
//! One immutable [`ConsensusParams`] per network. Selection happens once at
//! startup and hands out a `&'static` reference; nothing here is mutable.

use core::fmt;
use core::str::FromStr;

use botcoin_primitives::{constants::COIN, Amount, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod deployments;
mod networks;

pub use deployments::{Deployment, DeploymentName, DEPLOYMENTS};
pub use networks::{MAIN, REGTEST, TEST};

pub const PROTOCOL_VERSION: u32 = 70100;
pub const MIN_PEER_PROTO_VERSION: u32 = 70100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("unknown network: {0:?}")]
    UnknownNetwork(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[serde(alias = "mainnet")]
    Main,
    #[serde(alias = "testnet")]
    Test,
    Regtest,
}

impl Network {
    pub const ALL: [Self; 3] = [Self::Main, Self::Test, Self::Regtest];

    #[must_use]
    pub fn params(self) -> &'static ConsensusParams {
        match self {
            Self::Main => &MAIN,
            Self::Test => &TEST,
            Self::Regtest => &REGTEST,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
            Self::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" | "mainnet" => Ok(Self::Main),
            "test" | "testnet" => Ok(Self::Test),
            "regtest" => Ok(Self::Regtest),
            other => Err(ParamsError::UnknownNetwork(other.to_owned())),
        }
    }
}

/// Base58Check version bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base58Prefixes {
    pub pubkey_hash: u8,
    pub script_hash: u8,
    pub secret_key: u8,
}

/// Constants from which the genesis block is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenesisSpec {
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    pub version: i32,
    pub reward: Amount,
    pub coinbase_message: &'static str,
    pub marker: &'static str,
    /// Payload pushed after `OP_RETURN` in the sole output.
    pub output_tag: &'static str,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ConsensusParams {
    pub network: Network,
    pub network_magic: [u8; 4],
    pub default_port: u16,
    pub protocol_version: u32,
    pub min_peer_protocol_version: u32,
    pub base58: Base58Prefixes,
    pub bech32_hrp: &'static str,
    pub pow_epoch_length: u64,
    pub pow_epoch_lag: u64,
    /// Big-endian bytes of the easiest admissible target.
    pub pow_limit_be: [u8; 32],
    /// Number of 32-byte labels in the memory-hard hashing context.
    pub pow_cache_labels: usize,
    pub pow_target_spacing: u64,
    pub difficulty_window: usize,
    pub difficulty_cut: usize,
    pub pow_no_retargeting: bool,
    pub subsidy_halving_interval: u64,
    pub coinbase_maturity: u64,
    pub genesis: GenesisSpec,
    pub deployments: &'static [Deployment],
}

impl ConsensusParams {
    #[must_use]
    pub fn pow_limit(&self) -> U256 {
        U256::from_big_endian(&self.pow_limit_be)
    }

    /// `50 coins >> (height / halving_interval)`, zero after 64 halvings.
    #[must_use]
    pub fn block_subsidy(&self, height: u64) -> Amount {
        let halvings = height / self.subsidy_halving_interval;
        if halvings >= 64 {
            return 0;
        }
        (50 * COIN) >> halvings
    }

    #[must_use]
    pub fn deployment(&self, name: DeploymentName) -> Option<&'static Deployment> {
        self.deployments.iter().find(|d| d.name == name)
    }

    /// Whether the rule set named by `name` is enforced at `height`.
    #[must_use]
    pub fn is_active(&self, name: DeploymentName, height: u64) -> bool {
        self.deployment(name).is_some_and(|d| d.is_active_at(height))
    }

    #[must_use]
    pub fn magic_hex(&self) -> String {
        self.network_magic.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Resolve a network id (`main`/`mainnet`, `test`/`testnet`, `regtest`).
pub fn select(network_id: &str) -> Result<&'static ConsensusParams, ParamsError> {
    match network_id.parse::<Network>() {
        Ok(n) => {
            tracing::info!(network = %n, magic = %n.params().magic_hex(), "consensus parameters selected");
            Ok(n.params())
        }
        Err(e) => {
            tracing::warn!(network_id, "rejected unknown network id");
            Err(e)
        }
    }
}

/// Reverse lookup from wire magic.
#[must_use]
pub fn network_for_magic(magic: [u8; 4]) -> Option<Network> {
    Network::ALL
        .into_iter()
        .find(|n| n.params().network_magic == magic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_accepts_aliases() {
        assert_eq!(select("main").unwrap().network, Network::Main);
        assert_eq!(select("mainnet").unwrap().network, Network::Main);
        assert_eq!(select("testnet").unwrap().network, Network::Test);
        assert_eq!(select("regtest").unwrap().network, Network::Regtest);
    }

    #[test]
    fn select_rejects_unknown() {
        assert_eq!(
            select("signet"),
            Err(ParamsError::UnknownNetwork("signet".into()))
        );
        assert!(select("").is_err());
        assert!(select("MAIN").is_err());
    }

    #[test]
    fn display_round_trips() {
        for n in Network::ALL {
            assert_eq!(n.to_string().parse::<Network>(), Ok(n));
        }
    }

    #[test]
    fn magic_reverse_lookup() {
        assert_eq!(network_for_magic([0xb0, 0x7c, 0x01, 0x0e]), Some(Network::Main));
        assert_eq!(network_for_magic([0xb0, 0x7c, 0x00, 0x00]), Some(Network::Regtest));
        // Bitcoin mainnet magic.
        assert_eq!(network_for_magic([0xf9, 0xbe, 0xb4, 0xd9]), None);
    }

    #[test]
    fn subsidy_halves_on_schedule() {
        let r = &REGTEST;
        assert_eq!(r.block_subsidy(0), 50 * COIN);
        assert_eq!(r.block_subsidy(149), 50 * COIN);
        assert_eq!(r.block_subsidy(150), 25 * COIN);
        assert_eq!(r.block_subsidy(300), 12 * COIN + COIN / 2);
        assert_eq!(r.block_subsidy(150 * 64), 0);
        assert_eq!(MAIN.block_subsidy(2_099_999), 50 * COIN);
        assert_eq!(MAIN.block_subsidy(2_100_000), 25 * COIN);
    }
}
