#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Botcoin genesis: deterministic construction of the height-0 block and
//! exhaustive validation of a candidate against it.
//!
//! Coinbase input script layout:
//!
//! | offset | bytes      | meaning                                  |
//! |--------|------------|------------------------------------------|
//! | 0      | `0x00`     | height push (`OP_0`, height 0)           |
//! | 1      | `len`      | direct push opcode, `len <= 75`          |
//! | 2      | `len` bytes| coinbase message, contains the marker    |

use core::fmt;

use botcoin_params::{ConsensusParams, GenesisSpec};
use botcoin_primitives::constants::{
    COINBASE_PREV_INDEX, NULL_HASH, OP_0, OP_1, OP_RETURN, SEQUENCE_FINAL,
    VERSIONBITS_TOP_BITS, VERSIONBITS_TOP_MASK,
};
use botcoin_primitives::{ct_eq_hash, Block, BlockHeader, Hash256, OutPoint, Transaction, TxIn, TxOut};
use thiserror::Error;

/// Timestamps strictly inside this window are sane for a genesis block.
pub const GENESIS_TIME_MIN_EXCLUSIVE: u32 = 1_704_067_200;
pub const GENESIS_TIME_MAX_EXCLUSIVE: u32 = 1_893_456_000;

/// Offset of the message bytes inside the coinbase input script.
pub const MESSAGE_OFFSET: usize = 2;
const MAX_DIRECT_PUSH: usize = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenesisField {
    PreviousHash,
    Timestamp,
    TransactionCount,
    CoinbaseMarker,
    CoinbaseHeight,
    Reward,
    OutputScript,
    Version,
    MerkleRoot,
    Bytes,
}

impl fmt::Display for GenesisField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PreviousHash => "previous_hash",
            Self::Timestamp => "timestamp",
            Self::TransactionCount => "transaction_count",
            Self::CoinbaseMarker => "coinbase_marker",
            Self::CoinbaseHeight => "coinbase_height",
            Self::Reward => "reward",
            Self::OutputScript => "output_script",
            Self::Version => "version",
            Self::MerkleRoot => "merkle_root",
            Self::Bytes => "bytes",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GenesisError {
    #[error("genesis mismatch in field `{field}`")]
    GenesisMismatch { field: GenesisField },
}

const fn mismatch(field: GenesisField) -> GenesisError {
    GenesisError::GenesisMismatch { field }
}

/// Append the minimal push of a block height (BIP34).
pub fn push_height(script: &mut Vec<u8>, height: u64) {
    match height {
        0 => script.push(OP_0),
        1..=16 => script.push(OP_1 + (height as u8) - 1),
        _ => {
            let mut bytes = height.to_le_bytes().to_vec();
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            // Keep the top bit clear so the number stays positive.
            if bytes.last().is_some_and(|b| b & 0x80 != 0) {
                bytes.push(0);
            }
            script.push(bytes.len() as u8);
            script.extend_from_slice(&bytes);
        }
    }
}

/// Read the height push at the start of a coinbase input script.
#[must_use]
pub fn read_height(script: &[u8]) -> Option<u64> {
    let (&op, rest) = script.split_first()?;
    match op {
        OP_0 => Some(0),
        0x51..=0x60 => Some(u64::from(op - OP_1) + 1),
        1..=8 => {
            let n = usize::from(op);
            let bytes = rest.get(..n)?;
            let mut v = 0u64;
            for (i, b) in bytes.iter().enumerate() {
                v |= u64::from(*b) << (8 * i);
            }
            Some(v)
        }
        _ => None,
    }
}

/// `OP_0 ‖ push(len) ‖ message`.
#[must_use]
pub fn coinbase_script_sig(spec: &GenesisSpec) -> Vec<u8> {
    let msg = spec.coinbase_message.as_bytes();
    debug_assert!(msg.len() <= MAX_DIRECT_PUSH);
    let mut s = Vec::with_capacity(MESSAGE_OFFSET + msg.len());
    push_height(&mut s, 0);
    s.push(msg.len() as u8);
    s.extend_from_slice(msg);
    s
}

/// `OP_RETURN ‖ push(output_tag)`; provably unspendable.
#[must_use]
pub fn genesis_output_script(spec: &GenesisSpec) -> Vec<u8> {
    let tag = spec.output_tag.as_bytes();
    let mut s = Vec::with_capacity(2 + tag.len());
    s.push(OP_RETURN);
    s.push(tag.len() as u8);
    s.extend_from_slice(tag);
    s
}

fn coinbase_tx(spec: &GenesisSpec) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TxIn {
            previous_output: OutPoint {
                txid: NULL_HASH,
                index: COINBASE_PREV_INDEX,
            },
            script_sig: coinbase_script_sig(spec),
            sequence: SEQUENCE_FINAL,
        }],
        outputs: vec![TxOut {
            value: spec.reward,
            script_pubkey: genesis_output_script(spec),
        }],
        lock_time: 0,
    }
}

/// Assemble the genesis block. Pure in `params`.
#[must_use]
pub fn build(params: &ConsensusParams) -> Block {
    let spec = &params.genesis;
    let coinbase = coinbase_tx(spec);
    let header = BlockHeader {
        version: spec.version,
        previous_hash: NULL_HASH,
        merkle_root: coinbase.txid(),
        timestamp: spec.timestamp,
        bits: spec.bits,
        nonce: spec.nonce,
    };
    Block {
        header,
        transactions: vec![coinbase],
    }
}

#[must_use]
pub fn genesis_hash(params: &ConsensusParams) -> Hash256 {
    build(params).hash()
}

/// The message field of the coinbase input script, when the documented
/// layout is present.
#[must_use]
pub fn coinbase_message(block: &Block) -> Option<&[u8]> {
    let script = &block.transactions.first()?.inputs.first()?.script_sig;
    let len = usize::from(*script.get(1)?);
    if len == 0 || len > MAX_DIRECT_PUSH {
        return None;
    }
    script.get(MESSAGE_OFFSET..MESSAGE_OFFSET + len)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn has_marker(block: &Block, marker: &[u8]) -> bool {
    if coinbase_message(block).is_some_and(|m| contains(m, marker)) {
        return true;
    }
    // Compatibility fallback: marker anywhere in the input script.
    block
        .transactions
        .first()
        .and_then(|tx| tx.inputs.first())
        .is_some_and(|i| contains(&i.script_sig, marker))
}

/// Check `candidate` against the network's genesis block, stopping at the
/// first failing field.
pub fn validate(candidate: &Block, params: &ConsensusParams) -> Result<(), GenesisError> {
    let result = check_fields(candidate, params);
    if let Err(GenesisError::GenesisMismatch { field }) = result {
        tracing::warn!(network = %params.network, %field, "genesis candidate rejected");
    }
    result
}

fn check_fields(candidate: &Block, params: &ConsensusParams) -> Result<(), GenesisError> {
    let spec = &params.genesis;
    let h = &candidate.header;

    if h.previous_hash != NULL_HASH {
        return Err(mismatch(GenesisField::PreviousHash));
    }
    if h.timestamp <= GENESIS_TIME_MIN_EXCLUSIVE || h.timestamp >= GENESIS_TIME_MAX_EXCLUSIVE {
        return Err(mismatch(GenesisField::Timestamp));
    }
    let [coinbase] = candidate.transactions.as_slice() else {
        return Err(mismatch(GenesisField::TransactionCount));
    };
    if !has_marker(candidate, spec.marker.as_bytes()) {
        return Err(mismatch(GenesisField::CoinbaseMarker));
    }
    let height = coinbase
        .inputs
        .first()
        .and_then(|i| read_height(&i.script_sig));
    if height != Some(0) {
        return Err(mismatch(GenesisField::CoinbaseHeight));
    }
    if coinbase.total_output() != Some(spec.reward) {
        return Err(mismatch(GenesisField::Reward));
    }
    let unspendable = coinbase
        .outputs
        .first()
        .is_some_and(|o| o.script_pubkey.first() == Some(&OP_RETURN));
    if !unspendable {
        return Err(mismatch(GenesisField::OutputScript));
    }
    if (h.version as u32) & VERSIONBITS_TOP_MASK != VERSIONBITS_TOP_BITS as u32 {
        return Err(mismatch(GenesisField::Version));
    }
    if !ct_eq_hash(&h.merkle_root, &candidate.compute_merkle_root()) {
        return Err(mismatch(GenesisField::MerkleRoot));
    }
    if candidate.serialize() != build(params).serialize() {
        return Err(mismatch(GenesisField::Bytes));
    }
    Ok(())
}
