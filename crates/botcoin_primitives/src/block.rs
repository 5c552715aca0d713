//! Block and transaction layouts with their canonical (Bitcoin, non-witness)
//! serialization.

use crate::constants::{COINBASE_PREV_INDEX, NULL_HASH};
use crate::encode::{
    read_compact_size, read_hash, read_i32, read_i64, read_u32, read_var_bytes,
    write_compact_size, write_var_bytes, DecodeError,
};
use crate::{sha256d, Amount, Hash256};

/// Serialized header width.
pub const HEADER_LEN: usize = 80;

/// Bound on the number of inputs/outputs/transactions a decoder will allocate for.
const MAX_ITEMS: u64 = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockHeader {
    pub version: i32,
    pub previous_hash: Hash256,
    pub merkle_root: Hash256,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    #[must_use]
    pub fn serialize(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&self.previous_hash);
        out[36..68].copy_from_slice(&self.merkle_root);
        out[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Decode exactly 80 bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut src = bytes;
        let h = Self::read_from(&mut src)?;
        if !src.is_empty() {
            return Err(DecodeError::Trailing);
        }
        Ok(h)
    }

    pub fn read_from(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            version: read_i32(src)?,
            previous_hash: read_hash(src)?,
            merkle_root: read_hash(src)?,
            timestamp: read_u32(src)?,
            bits: read_u32(src)?,
            nonce: read_u32(src)?,
        })
    }

    /// Block identity: SHA-256d of the 80 header bytes.
    #[must_use]
    pub fn hash(&self) -> Hash256 {
        sha256d(&self.serialize())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u32,
}

impl OutPoint {
    pub const NULL: Self = Self {
        txid: NULL_HASH,
        index: COINBASE_PREV_INDEX,
    };

    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_le_bytes());
        write_compact_size(out, self.inputs.len() as u64);
        for i in &self.inputs {
            out.extend_from_slice(&i.previous_output.txid);
            out.extend_from_slice(&i.previous_output.index.to_le_bytes());
            write_var_bytes(out, &i.script_sig);
            out.extend_from_slice(&i.sequence.to_le_bytes());
        }
        write_compact_size(out, self.outputs.len() as u64);
        for o in &self.outputs {
            out.extend_from_slice(&o.value.to_le_bytes());
            write_var_bytes(out, &o.script_pubkey);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        self.write_to(&mut out);
        out
    }

    pub fn read_from(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let version = read_i32(src)?;
        let n_in = bounded_count(src)?;
        let mut inputs = Vec::with_capacity(n_in);
        for _ in 0..n_in {
            let txid = read_hash(src)?;
            let index = read_u32(src)?;
            let script_sig = read_var_bytes(src)?;
            let sequence = read_u32(src)?;
            inputs.push(TxIn {
                previous_output: OutPoint { txid, index },
                script_sig,
                sequence,
            });
        }
        let n_out = bounded_count(src)?;
        let mut outputs = Vec::with_capacity(n_out);
        for _ in 0..n_out {
            let value = read_i64(src)?;
            let script_pubkey = read_var_bytes(src)?;
            outputs.push(TxOut {
                value,
                script_pubkey,
            });
        }
        let lock_time = read_u32(src)?;
        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut src = bytes;
        let tx = Self::read_from(&mut src)?;
        if !src.is_empty() {
            return Err(DecodeError::Trailing);
        }
        Ok(tx)
    }

    /// SHA-256d of the serialization.
    #[must_use]
    pub fn txid(&self) -> Hash256 {
        sha256d(&self.serialize())
    }

    #[must_use]
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    /// Sum of output values; `None` on overflow.
    #[must_use]
    pub fn total_output(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(0i64, |acc, o| acc.checked_add(o.value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 256);
        out.extend_from_slice(&self.header.serialize());
        write_compact_size(&mut out, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.write_to(&mut out);
        }
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut src = bytes;
        let header = BlockHeader::read_from(&mut src)?;
        let n = bounded_count(&mut src)?;
        let mut transactions = Vec::with_capacity(n);
        for _ in 0..n {
            transactions.push(Transaction::read_from(&mut src)?);
        }
        if !src.is_empty() {
            return Err(DecodeError::Trailing);
        }
        Ok(Self {
            header,
            transactions,
        })
    }

    #[must_use]
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    /// Merkle root recomputed from the transactions (not the header field).
    #[must_use]
    pub fn compute_merkle_root(&self) -> Hash256 {
        let ids: Vec<Hash256> = self.transactions.iter().map(Transaction::txid).collect();
        merkle_root(&ids)
    }
}

fn bounded_count(src: &mut &[u8]) -> Result<usize, DecodeError> {
    let n = read_compact_size(src)?;
    if n > MAX_ITEMS {
        return Err(DecodeError::Oversize(n));
    }
    // Each item occupies at least one byte; refuse counts the input cannot hold.
    if n > src.len() as u64 {
        return Err(DecodeError::Short);
    }
    usize::try_from(n).map_err(|_| DecodeError::Oversize(n))
}

/// Bitcoin merkle root: pairwise SHA-256d of `left ‖ right`, duplicating the
/// last node of an odd level. Empty input yields the zero hash.
#[must_use]
pub fn merkle_root(txids: &[Hash256]) -> Hash256 {
    if txids.is_empty() {
        return NULL_HASH;
    }
    let mut level: Vec<Hash256> = txids.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            if let Some(last) = level.last().copied() {
                level.push(last);
            }
        }
        level = level
            .chunks_exact(2)
            .map(|pair| {
                let mut buf = [0u8; 64];
                buf[..32].copy_from_slice(&pair[0]);
                buf[32..].copy_from_slice(&pair[1]);
                sha256d(&buf)
            })
            .collect();
    }
    level[0]
}
