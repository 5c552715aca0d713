#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Botcoin consensus-identity core.
//!
//! Facade over the workspace crates: chain parameters per network, the
//! deterministic genesis block, the seed-rotating proof of work, address
//! encodings and the peer identity gate. `ConsensusCore` ties them to one
//! `NodeConfig`.

// Layering, leaves first:
//
// - botcoin_primitives: hashing, encodings, block/tx layouts, compact targets
// - botcoin_params: the immutable per-network registry
// - botcoin_genesis / botcoin_address: pure functions of the registry
// - botcoin_pow: seed epochs, hashing contexts and their cache, mining
// - botcoin_netid: magic/version gate for the handshake

pub mod config;
pub mod consensus;
pub mod errors;
pub mod logging;

pub use botcoin_address as address;
pub use botcoin_genesis as genesis;
pub use botcoin_netid as netid;
pub use botcoin_params as params;
pub use botcoin_pow as pow;
pub use botcoin_primitives as primitives;

pub use config::{NodeConfig, PowConfig};
pub use consensus::{BlockInfo, ConsensusCore, TxInfo, TxOutInfo};
pub use errors::{ConsensusError, ConsensusResult};
pub use params::{ConsensusParams, Network};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
