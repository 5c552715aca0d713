#![forbid(unsafe_code)]

/// Base units per coin.
pub const COIN: i64 = 100_000_000;
/// Sanity bound on any single amount or sum of amounts.
pub const MAX_MONEY: i64 = 1_000_000_000 * COIN;

pub const NULL_HASH: [u8; 32] = [0u8; 32];
/// `prev_index` of a coinbase outpoint.
pub const COINBASE_PREV_INDEX: u32 = 0xffff_ffff;
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

// Script opcodes used by the consensus-identity layer.
pub const OP_0: u8 = 0x00;
pub const OP_1: u8 = 0x51;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;

/// Version-bits signalling: top three bits `001`.
pub const VERSIONBITS_TOP_BITS: i32 = 0x2000_0000;
pub const VERSIONBITS_TOP_MASK: u32 = 0xE000_0000;

pub const TAG_POW_L0: &str = "botcoin.pow.l0";
pub const TAG_POW_LBL: &str = "botcoin.pow.lbl";
pub const TAG_POW_IDX: &str = "botcoin.pow.idx";
pub const TAG_POW_MIX: &str = "botcoin.pow.mix";
pub const TAG_POW_ROUND: &str = "botcoin.pow.round";
pub const TAG_POW_OUT: &str = "botcoin.pow.out";
