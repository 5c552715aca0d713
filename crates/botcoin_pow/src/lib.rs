#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Botcoin proof-of-work engine.
//!
//! Validation of a header at height `H`:
//!
//! 1. compute the [`SeedEpochState`] for `H`;
//! 2. resolve the seed (the genesis seed, or the block hash at the seed
//!    height through a [`SeedBlockSource`]);
//! 3. fetch the seed's [`HashingContext`] from the [`ContextCache`], building
//!    it on first use;
//! 4. hash the 80 header bytes under that context;
//! 5. decode `bits` and accept iff `hash <= target`, the hash read as a
//!    little-endian 256-bit integer.

use thiserror::Error;

pub mod cache;
pub mod context;
pub mod difficulty;
pub mod engine;
pub mod epoch;
pub mod miner;

pub use cache::{ContextCache, DEFAULT_CACHE_CAPACITY};
pub use context::{HashingContext, POW_ROUNDS};
pub use difficulty::{
    check_proof_of_work, hash_to_u256, next_work_required, target_from_bits, BlockSummary,
    TargetRejection,
};
pub use botcoin_primitives::{decode_compact, encode_compact};
pub use engine::{MiningBudget, PowEngine};
pub use epoch::{
    genesis_seed, seed_epoch, seed_hash_for_height, GenesisOnly, SeedBlockSource, SeedEpochState,
};
pub use miner::{Miner, MiningStats};

/// Output of the memory-hard hash, internal byte order.
pub type PowHash = botcoin_primitives::Hash256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowError {
    #[error("invalid difficulty encoding {bits:#010x}: {reason}")]
    InvalidDifficultyEncoding { bits: u32, reason: TargetRejection },
    #[error("proof of work {hash} above target")]
    PowRejected { hash: String },
    #[error("seed block at height {height} is not known")]
    SeedBlockMissing { height: u64 },
    #[error("hashing context build failed: {reason}")]
    SeedBuildFailed { reason: String },
    #[error("miner setup failed: {0}")]
    MinerSetup(String),
}
