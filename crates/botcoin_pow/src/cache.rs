//! Per-seed hashing contexts, built once and shared.
//!
//! Each seed owns a slot holding `Arc<OnceCell<Arc<HashingContext>>>`. The
//! map lock is held only to find or create the slot; the build itself runs
//! inside the cell, so concurrent callers for one seed wait on a single
//! build while other seeds proceed. Retired slots stay alive for as long as
//! any caller still holds their `Arc`.
//!
//! Eviction never touches a slot whose build is in flight: dead slots go
//! first, then the least recently used built one. If every slot is still
//! building, the map runs over capacity until one finishes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use botcoin_primitives::{to_display_hex, Hash256};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::context::HashingContext;
use crate::PowError;

pub const DEFAULT_CACHE_CAPACITY: usize = 2;

type Cell = Arc<OnceCell<Arc<HashingContext>>>;

struct Slot {
    cell: Cell,
    last_used: u64,
}

#[derive(Default)]
struct Slots {
    tick: u64,
    map: HashMap<Hash256, Slot>,
}

pub struct ContextCache {
    capacity: usize,
    n_labels: usize,
    slots: Mutex<Slots>,
    builds: AtomicU64,
    hits: AtomicU64,
}

impl ContextCache {
    #[must_use]
    pub fn new(n_labels: usize, capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            n_labels,
            slots: Mutex::new(Slots::default()),
            builds: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    fn slot_for(&self, seed: &Hash256) -> Cell {
        let mut slots = self.slots.lock();
        slots.tick += 1;
        let tick = slots.tick;
        if let Some(slot) = slots.map.get_mut(seed) {
            slot.last_used = tick;
            return Arc::clone(&slot.cell);
        }
        while slots.map.len() >= self.capacity {
            let Some(victim) = evictable(&slots) else {
                tracing::debug!(slots = slots.map.len(), "every context still building; over capacity");
                break;
            };
            slots.map.remove(&victim);
            tracing::debug!(seed = %to_display_hex(&victim), "hashing context retired");
        }
        let cell: Cell = Arc::new(OnceCell::new());
        slots.map.insert(
            *seed,
            Slot {
                cell: Arc::clone(&cell),
                last_used: tick,
            },
        );
        cell
    }

    /// Forget `cell` if it is still the unbuilt slot for `seed`.
    fn discard_failed(&self, seed: &Hash256, cell: &Cell) {
        let mut slots = self.slots.lock();
        let stale = slots
            .map
            .get(seed)
            .is_some_and(|s| Arc::ptr_eq(&s.cell, cell) && s.cell.get().is_none());
        if stale {
            slots.map.remove(seed);
        }
    }

    /// Return the context for `seed`, building it on first use.
    pub fn get_or_build(&self, seed: &Hash256) -> Result<Arc<HashingContext>, PowError> {
        let cell = self.slot_for(seed);
        if let Some(ctx) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(ctx));
        }
        let built = cell.get_or_try_init(|| {
            tracing::info!(
                seed = %to_display_hex(seed),
                labels = self.n_labels,
                "building hashing context"
            );
            let built = HashingContext::build(seed, self.n_labels);
            match &built {
                Ok(_) => {
                    self.builds.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => tracing::warn!(seed = %to_display_hex(seed), error = %e, "hashing context build failed"),
            }
            built.map(Arc::new)
        });
        match built {
            Ok(ctx) => Ok(Arc::clone(ctx)),
            Err(e) => {
                self.discard_failed(seed, &cell);
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn contains(&self, seed: &Hash256) -> bool {
        self.slots
            .lock()
            .map
            .get(seed)
            .is_some_and(|s| s.cell.get().is_some())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn labels(&self) -> usize {
        self.n_labels
    }

    /// Completed context builds since creation.
    #[must_use]
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Slot to drop when full: an unbuilt slot nobody is waiting on, else the
/// least recently used built one. `None` while every slot is mid-build.
fn evictable(slots: &Slots) -> Option<Hash256> {
    slots
        .map
        .iter()
        .filter(|(_, s)| s.cell.get().is_some() || Arc::strong_count(&s.cell) == 1)
        .min_by_key(|(_, s)| (s.cell.get().is_some(), s.last_used))
        .map(|(k, _)| *k)
}

impl core::fmt::Debug for ContextCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContextCache")
            .field("capacity", &self.capacity)
            .field("labels", &self.n_labels)
            .field("slots", &self.len())
            .finish_non_exhaustive()
    }
}
