//! Critical-bit location and direction arithmetic.
//!
//! Bit positions are numbered MSB-first: bit 0 is the most significant bit of
//! byte 0, bit 7 its least significant bit, bit 8 the MSB of byte 1, and so on.
//! Keys are compared as if zero-padded to infinite length.

use std::fmt;

/// The single bit that separates the two halves of a branch's subtree.
///
/// `bit_mask` holds every bit *except* the critical one, so that
/// `(1 + (bit_mask | c)) >> 8` is 1 exactly when the critical bit is set in `c`.
/// Field order makes the derived `Ord` follow bit position: a larger
/// `(byte_offset, bit_mask)` pair is a later bit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CritBit {
    pub(crate) byte_offset: usize,
    pub(crate) bit_mask: u8,
}

impl CritBit {
    /// Critical bit at the most significant set bit of `diff` within `byte_offset`.
    #[inline]
    pub(crate) fn from_diff(byte_offset: usize, diff: u8) -> Self {
        debug_assert_ne!(diff, 0);
        let bit_in_byte = diff.leading_zeros();
        Self {
            byte_offset,
            bit_mask: !(0x80u8 >> bit_in_byte),
        }
    }

    /// Critical bit at absolute MSB-first position `bit`.
    pub fn at(bit: usize) -> Self {
        Self {
            byte_offset: bit / 8,
            bit_mask: !(0x80u8 >> (bit % 8)),
        }
    }

    #[inline]
    pub fn byte_offset(self) -> usize {
        self.byte_offset
    }

    #[inline]
    pub fn bit_mask(self) -> u8 {
        self.bit_mask
    }

    /// Bit index within its byte, where `0` is the MSB and `7` is the LSB.
    #[inline]
    pub fn bit_in_byte(self) -> u32 {
        (!self.bit_mask).leading_zeros()
    }

    /// Absolute MSB-first bit position.
    #[inline]
    pub fn position(self) -> usize {
        self.byte_offset * 8 + self.bit_in_byte() as usize
    }

    /// Child index (0 or 1) selected by `key` at this bit. Bytes past the end of
    /// the key read as 0.
    #[inline]
    pub fn direction(self, key: &[u8]) -> usize {
        let c = key.get(self.byte_offset).copied().unwrap_or(0);
        ((1 + u32::from(self.bit_mask | c)) >> 8) as usize
    }
}

impl fmt::Debug for CritBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CritBit({}.{})", self.byte_offset, self.bit_in_byte())
    }
}

/// First bit at which `a` and `b` differ under zero padding.
///
/// Returns `None` when no such bit exists: the keys are equal, or the longer one
/// extends the shorter with zero bytes only.
pub fn crit_bit(a: &[u8], b: &[u8]) -> Option<CritBit> {
    let shared = a.len().min(b.len());
    if let Some(i) = (0..shared).find(|&i| a[i] != b[i]) {
        return Some(CritBit::from_diff(i, a[i] ^ b[i]));
    }

    let longer = if a.len() > b.len() { a } else { b };
    longer[shared..]
        .iter()
        .position(|&c| c != 0)
        .map(|off| CritBit::from_diff(shared + off, longer[shared + off]))
}

/// Whether `key` zero-padded to `prefix.len()` bytes equals `prefix`.
#[inline]
pub(crate) fn padded_starts_with(key: &[u8], prefix: &[u8]) -> bool {
    prefix
        .iter()
        .enumerate()
        .all(|(i, &p)| key.get(i).copied().unwrap_or(0) == p)
}
