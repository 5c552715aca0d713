//! Seed-keyed memory-hard hashing context.
//!
//! `labels[0] = H(l0, seed)`; `labels[i] = H(lbl, seed, i, labels[i-1], labels[j], labels[k])`
//! with `j, k < i` drawn from `H(idx, seed, i, side)`. A hash then performs
//! `POW_ROUNDS` data-dependent reads from the label table.

use botcoin_primitives::constants::{
    TAG_POW_IDX, TAG_POW_L0, TAG_POW_LBL, TAG_POW_MIX, TAG_POW_OUT, TAG_POW_ROUND,
};
use botcoin_primitives::{h_tag, le_bytes, u64_from_le, Hash256};

use crate::PowError;

pub const LABEL_BYTES: usize = 32;
pub const POW_ROUNDS: u32 = 64;

#[inline]
fn parent_index(seed: &Hash256, i: u64, side: u8) -> u64 {
    let b = h_tag(TAG_POW_IDX, &[seed, &le_bytes::<8>(u128::from(i)), &[side]]);
    u64_from_le(&b[..8]) % i
}

#[inline]
fn label(seed: &Hash256, i: u64, prev: &Hash256, lj: &Hash256, lk: &Hash256) -> Hash256 {
    h_tag(TAG_POW_LBL, &[seed, &le_bytes::<8>(u128::from(i)), prev, lj, lk])
}

pub struct HashingContext {
    seed: Hash256,
    labels: Vec<Hash256>,
}

impl HashingContext {
    /// Fill `n_labels` labels for `seed`. Allocation failure is reported,
    /// never retried here.
    pub fn build(seed: &Hash256, n_labels: usize) -> Result<Self, PowError> {
        if n_labels == 0 {
            return Err(PowError::SeedBuildFailed {
                reason: "label count is zero".into(),
            });
        }
        let mut labels: Vec<Hash256> = Vec::new();
        labels
            .try_reserve_exact(n_labels)
            .map_err(|e| PowError::SeedBuildFailed {
                reason: format!("cannot reserve {n_labels} labels: {e}"),
            })?;
        labels.push(h_tag(TAG_POW_L0, &[seed]));
        for i in 1..n_labels as u64 {
            let j = parent_index(seed, i, 0x00) as usize;
            let k = parent_index(seed, i, 0x01) as usize;
            let prev = labels[labels.len() - 1];
            let next = label(seed, i, &prev, &labels[j], &labels[k]);
            labels.push(next);
        }
        Ok(Self {
            seed: *seed,
            labels,
        })
    }

    #[must_use]
    pub const fn seed(&self) -> &Hash256 {
        &self.seed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.labels.len() * LABEL_BYTES
    }

    /// PoW hash of `input` (the 80 header bytes).
    #[must_use]
    pub fn hash(&self, input: &[u8]) -> Hash256 {
        let n = self.labels.len() as u64;
        let mut s = h_tag(TAG_POW_MIX, &[&self.seed, input]);
        for r in 0..POW_ROUNDS {
            let at = (u64_from_le(&s[..8]) % n) as usize;
            s = h_tag(
                TAG_POW_ROUND,
                &[&s, &self.labels[at], &le_bytes::<4>(u128::from(r))],
            );
        }
        h_tag(TAG_POW_OUT, &[&s])
    }
}

impl core::fmt::Debug for HashingContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashingContext")
            .field("seed", &botcoin_primitives::to_display_hex(&self.seed))
            .field("labels", &self.labels.len())
            .finish()
    }
}
