//! Targets and windowed difficulty retargeting.
//!
//! Retargeting runs every block over the last `difficulty_window` blocks
//! (genesis excluded): timestamps are sorted, `difficulty_cut` outliers are
//! trimmed, and the next difficulty is `work_in_window * spacing / time_span`.

use botcoin_params::ConsensusParams;
use botcoin_primitives::{decode_compact, encode_compact, Hash256, TargetError, U256};
use thiserror::Error;

use crate::PowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TargetRejection {
    #[error(transparent)]
    Malformed(#[from] TargetError),
    #[error("target above the network limit")]
    AboveLimit,
}

/// Decode `bits` and bound it by the network's limit.
pub fn target_from_bits(bits: u32, params: &ConsensusParams) -> Result<U256, PowError> {
    let reject = |reason| PowError::InvalidDifficultyEncoding { bits, reason };
    let target = decode_compact(bits).map_err(|e| reject(TargetRejection::Malformed(e)))?;
    if target > params.pow_limit() {
        return Err(reject(TargetRejection::AboveLimit));
    }
    Ok(target)
}

/// Hashes compare as little-endian 256-bit integers.
#[must_use]
pub fn hash_to_u256(hash: &Hash256) -> U256 {
    U256::from_little_endian(hash)
}

/// `hash <= target(bits)`; malformed bits never pass.
#[must_use]
pub fn check_proof_of_work(hash: &Hash256, bits: u32, params: &ConsensusParams) -> bool {
    target_from_bits(bits, params).is_ok_and(|t| hash_to_u256(hash) <= t)
}

/// What retargeting needs to know about a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    pub height: u64,
    pub timestamp: u32,
    pub bits: u32,
}

/// `bits` for the block after the last entry of `history` (oldest first).
#[must_use]
pub fn next_work_required(history: &[BlockSummary], params: &ConsensusParams) -> u32 {
    let limit = params.pow_limit();
    let limit_bits = encode_compact(limit);
    let Some(tip) = history.last() else {
        return params.genesis.bits;
    };
    if params.pow_no_retargeting {
        return tip.bits;
    }

    let window = params.difficulty_window;
    let kept = window.saturating_sub(2 * params.difficulty_cut);

    let mut timestamps = Vec::with_capacity(window);
    let mut difficulties = Vec::with_capacity(window);
    for b in history.iter().rev().take(window) {
        if b.height == 0 {
            break;
        }
        timestamps.push(i64::from(b.timestamp));
        let target = decode_compact(b.bits).unwrap_or_else(|_| U256::one());
        let d = limit / target.max(U256::one());
        difficulties.push(d.max(U256::one()));
    }
    let length = timestamps.len();
    if length <= 1 {
        return limit_bits;
    }
    timestamps.reverse();
    difficulties.reverse();

    let mut cumulative = Vec::with_capacity(length);
    let mut acc = U256::zero();
    for d in &difficulties {
        acc = acc.saturating_add(*d);
        cumulative.push(acc);
    }
    timestamps.sort_unstable();

    let (cut_begin, cut_end) = if length <= kept {
        (0, length)
    } else {
        let b = (length - kept + 1) / 2;
        (b, b + kept)
    };
    if cut_begin + 2 > cut_end || cut_end > length {
        return limit_bits;
    }

    let time_span = (timestamps[cut_end - 1] - timestamps[cut_begin]).max(1);
    let total_work = cumulative[cut_end - 1] - cumulative[cut_begin];
    if total_work.is_zero() {
        return limit_bits;
    }

    let span = U256::from(time_span as u64);
    let spacing = U256::from(params.pow_target_spacing);
    let next_difficulty = (total_work.saturating_mul(spacing).saturating_add(span) - U256::one()) / span;
    let next_difficulty = next_difficulty.max(U256::one());
    let target = (limit / next_difficulty).min(limit).max(U256::one());
    let bits = encode_compact(target);
    tracing::debug!(
        length,
        cut_begin,
        cut_end,
        time_span,
        bits = format_args!("{bits:#010x}"),
        "retarget"
    );
    bits
}
