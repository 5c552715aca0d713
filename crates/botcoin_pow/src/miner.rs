//! Multi-threaded nonce search.
//!
//! Worker `i` of `n` tries nonces `start + i`, `start + i + n`, ... over a
//! shared context. The first passing nonce stops every worker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use botcoin_primitives::BlockHeader;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::difficulty::{hash_to_u256, target_from_bits};
use crate::engine::{MiningBudget, PowEngine};
use crate::epoch::SeedBlockSource;
use crate::PowError;

/// Counters accumulated across every `mine` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MiningStats {
    pub hashes: u64,
    pub blocks_found: u64,
    pub threads: usize,
}

pub struct Miner {
    pool: ThreadPool,
    threads: usize,
    hashes: AtomicU64,
    blocks_found: AtomicU64,
    started: Instant,
}

impl Miner {
    pub fn new(threads: usize) -> Result<Self, PowError> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("botcoin-miner-{i}"))
            .build()
            .map_err(|e| PowError::MinerSetup(e.to_string()))?;
        tracing::info!(threads, "miner started");
        Ok(Self {
            pool,
            threads,
            hashes: AtomicU64::new(0),
            blocks_found: AtomicU64::new(0),
            started: Instant::now(),
        })
    }

    #[must_use]
    pub const fn threads(&self) -> usize {
        self.threads
    }

    #[must_use]
    pub fn stats(&self) -> MiningStats {
        MiningStats {
            hashes: self.hashes.load(Ordering::Relaxed),
            blocks_found: self.blocks_found.load(Ordering::Relaxed),
            threads: self.threads,
        }
    }

    /// Hashes per second since construction.
    #[must_use]
    pub fn hash_rate(&self) -> f64 {
        let secs = self.started.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.hashes.load(Ordering::Relaxed) as f64 / secs
    }

    pub fn mine<S: SeedBlockSource + Sync + ?Sized>(
        &self,
        engine: &PowEngine,
        template: &BlockHeader,
        height: u64,
        seeds: &S,
        budget: &MiningBudget,
    ) -> Result<Option<u32>, PowError> {
        let ctx = engine.context_for_height(height, seeds)?;
        let target = target_from_bits(template.bits, engine.params())?;
        let base = template.serialize();
        let stride = self.threads as u64;
        let found = AtomicBool::new(false);

        let result = self.pool.install(|| {
            (0..stride).into_par_iter().find_map_any(|lane| {
                let mut bytes = base;
                let mut local = 0u64;
                let mut offset = lane;
                let mut hit = None;
                while offset <= u64::from(u32::MAX) {
                    if found.load(Ordering::Relaxed) || budget.is_exhausted() {
                        break;
                    }
                    let nonce = template.nonce.wrapping_add(offset as u32);
                    bytes[76..80].copy_from_slice(&nonce.to_le_bytes());
                    local += 1;
                    if hash_to_u256(&ctx.hash(&bytes)) <= target {
                        found.store(true, Ordering::Relaxed);
                        hit = Some(nonce);
                        break;
                    }
                    offset += stride;
                }
                self.hashes.fetch_add(local, Ordering::Relaxed);
                hit
            })
        });

        if let Some(nonce) = result {
            self.blocks_found.fetch_add(1, Ordering::Relaxed);
            tracing::info!(height, nonce, threads = self.threads, "block found");
        }
        Ok(result)
    }
}

impl core::fmt::Debug for Miner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Miner")
            .field("threads", &self.threads)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
