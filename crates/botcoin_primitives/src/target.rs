//! Compact difficulty encoding (`bits`) and 256-bit targets.

pub use primitive_types::U256;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("compact target has the sign bit set")]
    Negative,
    #[error("compact target overflows 256 bits")]
    Overflow,
    #[error("compact target is zero")]
    Zero,
}

/// Expand `bits` into a 256-bit target.
///
/// Layout: high byte is the size in bytes, low 23 bits the mantissa, bit 23
/// the sign. Negative, overflowing and zero encodings are rejected.
pub fn decode_compact(bits: u32) -> Result<U256, TargetError> {
    let size = bits >> 24;
    let mut word = bits & 0x007f_ffff;
    let value = if size <= 3 {
        word >>= 8 * (3 - size);
        U256::from(word)
    } else {
        U256::from(word) << (8 * (size - 3)) as usize
    };
    if word != 0 && bits & 0x0080_0000 != 0 {
        return Err(TargetError::Negative);
    }
    if word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32)) {
        return Err(TargetError::Overflow);
    }
    if value.is_zero() {
        return Err(TargetError::Zero);
    }
    Ok(value)
}

/// Shortest compact form of `target` (rounds down to 23 mantissa bits).
#[must_use]
pub fn encode_compact(target: U256) -> u32 {
    let mut size = (target.bits() + 7) / 8;
    let mut compact = if size <= 3 {
        target.low_u32() << (8 * (3 - size))
    } else {
        (target >> (8 * (size - 3))).low_u32()
    };
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    compact | ((size as u32) << 24)
}

/// Typed wrapper over the header's `bits` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompactTarget(pub u32);

impl CompactTarget {
    pub fn to_target(self) -> Result<U256, TargetError> {
        decode_compact(self.0)
    }

    #[must_use]
    pub fn from_target(target: U256) -> Self {
        Self(encode_compact(target))
    }
}

impl From<u32> for CompactTarget {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be_hex(v: U256) -> String {
        let mut b = [0u8; 32];
        v.to_big_endian(&mut b);
        hex::encode(b)
    }

    #[test]
    fn decodes_easiest_target() {
        let t = decode_compact(0x207f_ffff).unwrap();
        assert_eq!(be_hex(t), format!("7fffff{}", "00".repeat(29)));
    }

    #[test]
    fn decodes_bitcoin_minimum_difficulty() {
        let t = decode_compact(0x1d00_ffff).unwrap();
        assert_eq!(be_hex(t), format!("00000000ffff{}", "00".repeat(26)));
    }

    #[test]
    fn small_sizes_shift_right() {
        assert_eq!(decode_compact(0x0301_2345).unwrap(), U256::from(0x0001_2345u32));
        assert_eq!(decode_compact(0x0201_2300).unwrap(), U256::from(0x0123u32));
        assert_eq!(decode_compact(0x0112_3456).unwrap(), U256::from(0x12u32));
    }

    #[test]
    fn rejects_malformed_encodings() {
        assert_eq!(decode_compact(0x0480_0001), Err(TargetError::Negative));
        assert_eq!(decode_compact(0xff12_3456), Err(TargetError::Overflow));
        assert_eq!(decode_compact(0x2201_0000), Err(TargetError::Overflow));
        assert_eq!(decode_compact(0x0000_0000), Err(TargetError::Zero));
        assert_eq!(decode_compact(0x0100_0012), Err(TargetError::Zero));
    }

    #[test]
    fn encode_is_canonical_inverse() {
        for bits in [0x207f_ffffu32, 0x1d00_ffff, 0x1b04_04cb, 0x0301_2345] {
            let t = decode_compact(bits).unwrap();
            assert_eq!(encode_compact(t), bits, "bits {bits:#x}");
        }
        // Mantissa with the sign bit set is bumped to the next size.
        assert_eq!(encode_compact(U256::from(0x80u32)), 0x0200_8000);
        assert_eq!(CompactTarget::from_target(U256::MAX >> 1).0, 0x207f_ffff);
    }
}
