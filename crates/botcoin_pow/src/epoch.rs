//! Seed rotation schedule.
//!
//! A block at height `H` hashes under the seed of epoch
//! `(H - lag) / len` (zero while `H < lag`). The seed of epoch 0 is a fixed
//! constant; later seeds are the identity hash of the block at
//! `seed_epoch * len`, so every seed is buried `lag` blocks deep before use.

use std::collections::{BTreeMap, HashMap};

use botcoin_params::ConsensusParams;
use botcoin_primitives::{sha256d, Hash256};

use crate::PowError;

pub const GENESIS_SEED_MESSAGE: &[u8] = b"Botcoin Genesis Seed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedEpochState {
    pub height: u64,
    pub epoch_index: u64,
    pub seed_epoch: u64,
    pub seed_height: u64,
}

impl SeedEpochState {
    #[must_use]
    pub const fn uses_genesis_seed(&self) -> bool {
        self.seed_epoch == 0
    }
}

#[must_use]
pub const fn seed_epoch(height: u64, params: &ConsensusParams) -> SeedEpochState {
    let len = params.pow_epoch_length;
    let lag = params.pow_epoch_lag;
    let seed_epoch = if height < lag { 0 } else { (height - lag) / len };
    SeedEpochState {
        height,
        epoch_index: height / len,
        seed_epoch,
        seed_height: seed_epoch * len,
    }
}

/// `SHA-256d("Botcoin Genesis Seed")`.
#[must_use]
pub fn genesis_seed() -> Hash256 {
    sha256d(GENESIS_SEED_MESSAGE)
}

/// Block identity hashes by height, as far as the caller's chain knows them.
pub trait SeedBlockSource {
    fn block_hash_at(&self, height: u64) -> Option<Hash256>;
}

impl SeedBlockSource for HashMap<u64, Hash256> {
    fn block_hash_at(&self, height: u64) -> Option<Hash256> {
        self.get(&height).copied()
    }
}

impl SeedBlockSource for BTreeMap<u64, Hash256> {
    fn block_hash_at(&self, height: u64) -> Option<Hash256> {
        self.get(&height).copied()
    }
}

/// Index is height.
impl SeedBlockSource for [Hash256] {
    fn block_hash_at(&self, height: u64) -> Option<Hash256> {
        self.get(usize::try_from(height).ok()?).copied()
    }
}

impl SeedBlockSource for Vec<Hash256> {
    fn block_hash_at(&self, height: u64) -> Option<Hash256> {
        self.as_slice().block_hash_at(height)
    }
}

/// A source that knows no blocks; enough for heights in seed epoch 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenesisOnly;

impl SeedBlockSource for GenesisOnly {
    fn block_hash_at(&self, _height: u64) -> Option<Hash256> {
        None
    }
}

impl<T: SeedBlockSource + ?Sized> SeedBlockSource for &T {
    fn block_hash_at(&self, height: u64) -> Option<Hash256> {
        (**self).block_hash_at(height)
    }
}

pub fn seed_hash_for_height<S: SeedBlockSource + ?Sized>(
    height: u64,
    params: &ConsensusParams,
    seeds: &S,
) -> Result<Hash256, PowError> {
    let state = seed_epoch(height, params);
    if state.uses_genesis_seed() {
        return Ok(genesis_seed());
    }
    seeds
        .block_hash_at(state.seed_height)
        .ok_or(PowError::SeedBlockMissing {
            height: state.seed_height,
        })
}
