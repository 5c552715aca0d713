//! Canonical byte framing: little-endian integers and Bitcoin `CompactSize`.

use thiserror::Error;

use crate::Hash256;

/// Upper bound on any length prefix accepted while decoding.
pub const MAX_VEC_LEN: u64 = 0x0200_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("input too short")]
    Short,
    #[error("trailing bytes after decode")]
    Trailing,
    #[error("non-canonical CompactSize encoding")]
    NonCanonicalSize,
    #[error("length prefix {0} exceeds limit")]
    Oversize(u64),
}

pub const fn read_exact<'a>(src: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if src.len() < n {
        return Err(DecodeError::Short);
    }
    let (a, b) = src.split_at(n);
    *src = b;
    Ok(a)
}

pub fn read_u8(src: &mut &[u8]) -> Result<u8, DecodeError> {
    Ok(read_exact(src, 1)?[0])
}

pub fn read_u16(src: &mut &[u8]) -> Result<u16, DecodeError> {
    let mut a = [0u8; 2];
    a.copy_from_slice(read_exact(src, 2)?);
    Ok(u16::from_le_bytes(a))
}

pub fn read_u32(src: &mut &[u8]) -> Result<u32, DecodeError> {
    let mut a = [0u8; 4];
    a.copy_from_slice(read_exact(src, 4)?);
    Ok(u32::from_le_bytes(a))
}

pub fn read_i32(src: &mut &[u8]) -> Result<i32, DecodeError> {
    let mut a = [0u8; 4];
    a.copy_from_slice(read_exact(src, 4)?);
    Ok(i32::from_le_bytes(a))
}

pub fn read_u64(src: &mut &[u8]) -> Result<u64, DecodeError> {
    let mut a = [0u8; 8];
    a.copy_from_slice(read_exact(src, 8)?);
    Ok(u64::from_le_bytes(a))
}

pub fn read_i64(src: &mut &[u8]) -> Result<i64, DecodeError> {
    let mut a = [0u8; 8];
    a.copy_from_slice(read_exact(src, 8)?);
    Ok(i64::from_le_bytes(a))
}

pub fn read_hash(src: &mut &[u8]) -> Result<Hash256, DecodeError> {
    let mut h = [0u8; 32];
    h.copy_from_slice(read_exact(src, 32)?);
    Ok(h)
}

/// `CompactSize`: `< 0xfd` one byte, then `0xfd`+u16, `0xfe`+u32, `0xff`+u64.
/// Non-minimal encodings are rejected.
pub fn read_compact_size(src: &mut &[u8]) -> Result<u64, DecodeError> {
    let n = match read_u8(src)? {
        0xfd => {
            let v = u64::from(read_u16(src)?);
            if v < 0xfd {
                return Err(DecodeError::NonCanonicalSize);
            }
            v
        }
        0xfe => {
            let v = u64::from(read_u32(src)?);
            if v <= 0xffff {
                return Err(DecodeError::NonCanonicalSize);
            }
            v
        }
        0xff => {
            let v = read_u64(src)?;
            if v <= 0xffff_ffff {
                return Err(DecodeError::NonCanonicalSize);
            }
            v
        }
        b => u64::from(b),
    };
    if n > MAX_VEC_LEN {
        return Err(DecodeError::Oversize(n));
    }
    Ok(n)
}

/// Read a `CompactSize`-prefixed byte vector.
pub fn read_var_bytes(src: &mut &[u8]) -> Result<Vec<u8>, DecodeError> {
    let n = read_compact_size(src)?;
    let n = usize::try_from(n).map_err(|_| DecodeError::Oversize(n))?;
    Ok(read_exact(src, n)?.to_vec())
}

pub fn write_compact_size(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

pub fn write_var_bytes(out: &mut Vec<u8>, b: &[u8]) {
    write_compact_size(out, b.len() as u64);
    out.extend_from_slice(b);
}
