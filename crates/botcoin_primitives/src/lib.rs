#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Botcoin primitives: hashing, fixed-width encodings, block/transaction layouts,
//! and compact difficulty targets.
//
// This crate holds the normative utilities shared by the params, genesis, pow,
// address and netid crates:
//
// - SHA-256d (block identity, txids, merkle nodes, Base58Check checksums)
// - Domain-tagged SHA3-256 with length framing (memory-hard PoW labels)
// - Fixed-width little-endian integers and CompactSize framing
// - The 80-byte header, transactions and the Bitcoin merkle construction
// - Compact `bits` <-> 256-bit target conversion

use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use subtle::ConstantTimeEq;

/// 32-byte hash in internal (little-endian) byte order.
pub type Hash256 = [u8; 32];

/// Amount in base units (1 coin = `constants::COIN`).
pub type Amount = i64;

pub mod block;
pub mod constants;
pub mod encode;
pub mod target;

pub use block::{merkle_root, Block, BlockHeader, OutPoint, Transaction, TxIn, TxOut, HEADER_LEN};
pub use encode::DecodeError;
pub use target::{decode_compact, encode_compact, CompactTarget, TargetError, U256};

/// Convert an unsigned integer to fixed-width little-endian bytes.
///
/// The output is exactly `W` bytes (no overlong encodings).
#[must_use]
pub fn le_bytes<const W: usize>(mut x: u128) -> [u8; W] {
    let mut out = [0u8; W];
    let mut i = 0usize;
    while i < W {
        out[i] = (x & 0xFF) as u8;
        x >>= 8;
        i += 1;
    }
    out
}

/// Read a `u64` from the first 8 bytes of a little-endian byte slice.
#[must_use]
pub fn u64_from_le(b: &[u8]) -> u64 {
    let mut x: u64 = 0;
    let mut i = 0usize;
    while i < 8 && i < b.len() {
        x |= u64::from(b[i]) << (8 * i as u64);
        i += 1;
    }
    x
}

/// `SHA256(SHA256(data))`.
#[must_use]
pub fn sha256d(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Domain-tagged SHA3-256 with length framing:
/// `H(tag_ascii, parts[])` = `SHA3_256`( UTF8(tag) || Σ ( LE(|p|,8) || p ) )
#[must_use]
pub fn h_tag(tag: &str, parts: &[&[u8]]) -> Hash256 {
    debug_assert!(
        tag.starts_with("botcoin."),
        "non-botcoin.* tag used in consensus hashing: {tag}"
    );
    let mut hasher = Sha3_256::new();
    hasher.update(tag.as_bytes());
    for p in parts {
        let len_le = le_bytes::<8>(p.len() as u128);
        hasher.update(len_le);
        hasher.update(p);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Constant-time equality for two 32-byte hashes.
#[must_use]
pub fn ct_eq_hash(a: &Hash256, b: &Hash256) -> bool {
    a.ct_eq(b).into()
}

/// Hex in display order (byte-reversed), the way block hashes and txids are shown.
#[must_use]
pub fn to_display_hex(hash: &Hash256) -> String {
    let mut rev = *hash;
    rev.reverse();
    hex::encode(rev)
}

/// Parse a display-order hex string back into internal byte order.
#[must_use]
pub fn from_display_hex(s: &str) -> Option<Hash256> {
    let bytes = hex::decode(s).ok()?;
    let mut out: Hash256 = bytes.try_into().ok()?;
    out.reverse();
    Some(out)
}
