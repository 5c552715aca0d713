//! Header validation and single-threaded mining.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use botcoin_params::ConsensusParams;
use botcoin_primitives::{to_display_hex, BlockHeader};
use rayon::prelude::*;

use crate::cache::{ContextCache, DEFAULT_CACHE_CAPACITY};
use crate::context::HashingContext;
use crate::difficulty::{check_proof_of_work, hash_to_u256, target_from_bits};
use crate::epoch::{seed_epoch, seed_hash_for_height, SeedBlockSource, SeedEpochState};
use crate::{PowError, PowHash};

/// Limits on a mining attempt: an optional deadline and a shared cancel flag.
#[derive(Debug, Clone, Default)]
pub struct MiningBudget {
    pub deadline: Option<Instant>,
    pub cancel: Arc<AtomicBool>,
}

impl MiningBudget {
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared handle for cancelling from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cancel.load(Ordering::Acquire) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

pub struct PowEngine {
    params: &'static ConsensusParams,
    cache: ContextCache,
}

impl PowEngine {
    #[must_use]
    pub fn new(params: &'static ConsensusParams) -> Self {
        Self::with_cache_capacity(params, DEFAULT_CACHE_CAPACITY)
    }

    #[must_use]
    pub fn with_cache_capacity(params: &'static ConsensusParams, capacity: usize) -> Self {
        Self {
            params,
            cache: ContextCache::new(params.pow_cache_labels, capacity),
        }
    }

    #[must_use]
    pub const fn params(&self) -> &'static ConsensusParams {
        self.params
    }

    #[must_use]
    pub const fn cache(&self) -> &ContextCache {
        &self.cache
    }

    #[must_use]
    pub const fn epoch_state(&self, height: u64) -> SeedEpochState {
        seed_epoch(height, self.params)
    }

    /// Resolve the seed for `height` and fetch (or build) its context.
    pub fn context_for_height<S: SeedBlockSource + ?Sized>(
        &self,
        height: u64,
        seeds: &S,
    ) -> Result<Arc<HashingContext>, PowError> {
        let seed = seed_hash_for_height(height, self.params, seeds)?;
        self.cache.get_or_build(&seed)
    }

    /// PoW hash of `header` as it would be validated at `height`.
    pub fn pow_hash<S: SeedBlockSource + ?Sized>(
        &self,
        header: &BlockHeader,
        height: u64,
        seeds: &S,
    ) -> Result<PowHash, PowError> {
        let ctx = self.context_for_height(height, seeds)?;
        Ok(ctx.hash(&header.serialize()))
    }

    /// Full check; `PowRejected` when the hash exceeds the target.
    pub fn check<S: SeedBlockSource + ?Sized>(
        &self,
        header: &BlockHeader,
        height: u64,
        seeds: &S,
    ) -> Result<PowHash, PowError> {
        let hash = self.pow_hash(header, height, seeds)?;
        // Malformed or out-of-range bits surface as their own error first.
        target_from_bits(header.bits, self.params)?;
        if !check_proof_of_work(&hash, header.bits, self.params) {
            tracing::debug!(
                height,
                block = %to_display_hex(&header.hash()),
                "proof of work above target"
            );
            return Err(PowError::PowRejected {
                hash: to_display_hex(&hash),
            });
        }
        Ok(hash)
    }

    /// `true` iff `check` succeeds. Seed and build failures also read as `false`;
    /// use `check` to tell them apart.
    pub fn verify<S: SeedBlockSource + ?Sized>(
        &self,
        header: &BlockHeader,
        height: u64,
        seeds: &S,
    ) -> bool {
        match self.check(header, height, seeds) {
            Ok(_) => true,
            Err(PowError::PowRejected { .. }) => false,
            Err(e) => {
                tracing::warn!(height, error = %e, "proof of work could not be evaluated");
                false
            }
        }
    }

    /// Verify independent headers in parallel; results keep input order.
    pub fn verify_batch<S: SeedBlockSource + Sync + ?Sized>(
        &self,
        items: &[(BlockHeader, u64)],
        seeds: &S,
    ) -> Vec<bool> {
        items
            .par_iter()
            .map(|(header, height)| self.verify(header, *height, seeds))
            .collect()
    }

    /// Search nonces from `template.nonce` upward until one passes, the
    /// budget runs out, or the nonce space is exhausted (`Ok(None)`).
    pub fn mine<S: SeedBlockSource + ?Sized>(
        &self,
        template: &BlockHeader,
        height: u64,
        seeds: &S,
        budget: &MiningBudget,
    ) -> Result<Option<u32>, PowError> {
        let ctx = self.context_for_height(height, seeds)?;
        let target = target_from_bits(template.bits, self.params)?;
        let mut bytes = template.serialize();
        let mut nonce = template.nonce;
        loop {
            if budget.is_exhausted() {
                tracing::debug!(height, "mining stopped by budget");
                return Ok(None);
            }
            bytes[76..80].copy_from_slice(&nonce.to_le_bytes());
            if hash_to_u256(&ctx.hash(&bytes)) <= target {
                tracing::info!(height, nonce, "nonce found");
                return Ok(Some(nonce));
            }
            nonce = nonce.wrapping_add(1);
            if nonce == template.nonce {
                return Ok(None);
            }
        }
    }
}

impl core::fmt::Debug for PowEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PowEngine")
            .field("network", &self.params.network)
            .field("cache", &self.cache)
            .finish()
    }
}
