use crate::models::buffer::SharedBytes;
use crate::utils::{bitmap_len, pack_bits};

/// Validity mask, one bit per row, LSB first. A set bit means the value is present.
///
/// Decoded masks are views into the file buffer; bits beyond `len` in the
/// last byte are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    bits: SharedBytes,
    len: usize,
}

impl Bitmap {
    /// Wrap packed bits. Returns `None` if `bits` is shorter than `ceil(len / 8)`.
    pub fn from_bytes(bits: SharedBytes, len: usize) -> Option<Self> {
        let need = bitmap_len(len);
        if bits.len() < need {
            return None;
        }
        let bits = bits.slice(0..need)?;
        Some(Self { bits, len })
    }

    pub fn from_bools(valid: &[bool]) -> Self {
        Self {
            bits: SharedBytes::from(pack_bits(valid.iter().copied(), valid.len())),
            len: valid.len(),
        }
    }

    pub fn new_set_all(len: usize, value: bool) -> Self {
        let fill = if value { 0xFF } else { 0x00 };
        let mut bits = vec![fill; bitmap_len(len)];
        // Keep the padding bits clear so encoded output does not depend on history.
        if value && len % 8 != 0 {
            if let Some(last) = bits.last_mut() {
                *last = (1u8 << (len % 8)) - 1;
            }
        }
        Self {
            bits: SharedBytes::from(bits),
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether row `i` holds a value. Panics if `i >= len`.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "bitmap index {i} out of range for {}", self.len);
        (self.bits[i / 8] >> (i % 8)) & 1 != 0
    }

    pub fn count_set(&self) -> usize {
        (0..self.len).filter(|i| self.get(*i)).count()
    }

    pub fn null_count(&self) -> usize {
        self.len - self.count_set()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Packed bytes, exactly `ceil(len / 8)` long.
    #[inline]
    pub fn as_bytes(&self) -> &SharedBytes {
        &self.bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmap_basics() {
        let bm = Bitmap::from_bools(&[true, false, true, true, false]);
        assert_eq!(bm.len(), 5);
        assert!(bm.get(0));
        assert!(!bm.get(1));
        assert_eq!(bm.count_set(), 3);
        assert_eq!(bm.null_count(), 2);
        assert_eq!(bm.as_bytes().as_slice(), &[0b0000_1101]);
    }

    #[test]
    fn test_new_set_all_clears_padding() {
        let bm = Bitmap::new_set_all(10, true);
        assert_eq!(bm.as_bytes().as_slice(), &[0xFF, 0b0000_0011]);
        assert_eq!(bm.count_set(), 10);
        let none = Bitmap::new_set_all(3, false);
        assert_eq!(none.null_count(), 3);
    }

    #[test]
    fn test_from_bytes_checks_length() {
        assert!(Bitmap::from_bytes(SharedBytes::from(vec![0u8]), 9).is_none());
        let bm = Bitmap::from_bytes(SharedBytes::from(vec![0b1u8, 0, 0]), 9).unwrap();
        assert_eq!(bm.as_bytes().len(), 2);
        assert!(bm.get(0));
    }
}
