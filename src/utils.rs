use minarrow::Vec64;

/// Checked round-up of a file offset to `align`. `None` on overflow.
#[inline]
pub fn align_up(n: u64, align: u64) -> Option<u64> {
    let rem = n % align;
    if rem == 0 {
        Some(n)
    } else {
        n.checked_add(align - rem)
    }
}

/// Number of bytes in an LSB-first bitmap holding `len` bits.
#[inline]
pub fn bitmap_len(len: usize) -> usize {
    len.div_ceil(8)
}

/// Packs a sequence of bools into a bit-packed buffer (LSB0).
/// Returns a new Vec<u8>.
pub fn pack_bits<I>(iter: I, len: usize) -> Vec<u8>
where
    I: Iterator<Item = bool>,
{
    let mut buf = vec![0u8; bitmap_len(len)];
    for (i, v) in iter.enumerate().take(len) {
        if v {
            buf[i / 8] |= 1 << (i % 8);
        }
    }
    buf
}

/// Copy `src` into `dst`, reversing the bytes of every `width`-byte element.
///
/// `width` of 0 or 1 is a plain copy.
pub fn copy_swapped(src: &[u8], dst: &mut [u8], width: usize) {
    debug_assert_eq!(src.len(), dst.len());
    if width <= 1 {
        dst.copy_from_slice(src);
        return;
    }
    for (s, d) in src.chunks_exact(width).zip(dst.chunks_exact_mut(width)) {
        for (i, b) in s.iter().rev().enumerate() {
            d[i] = *b;
        }
    }
}

/// Copy a 12-byte-per-row `(u64, u32)` entry table, swapping each field.
pub fn copy_swapped_entries(src: &[u8], dst: &mut [u8]) {
    debug_assert_eq!(src.len(), dst.len());
    for (s, d) in src.chunks_exact(12).zip(dst.chunks_exact_mut(12)) {
        copy_swapped(&s[..8], &mut d[..8], 8);
        copy_swapped(&s[8..], &mut d[8..], 4);
    }
}

/// Zero-filled 64-byte aligned buffer of `len` bytes.
pub fn zeroed_aligned(len: usize) -> Vec64<u8> {
    let mut buf = Vec64::with_capacity(len);
    buf.resize(len, 0u8);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_aligned() {
        let buf = zeroed_aligned(200);
        assert_eq!(buf.len(), 200);
        assert!(buf.iter().all(|b| *b == 0));
        assert_eq!(buf.as_ptr() as usize % 64, 0);
    }

    #[test]
    fn test_align_helpers() {
        assert_eq!(align_up(73, 8), Some(80));
        assert_eq!(align_up(u64::MAX, 8), None);
    }

    #[test]
    fn test_pack_bits() {
        let bits = [true, false, true, true, false, false, false, false, true];
        let packed = pack_bits(bits.iter().copied(), bits.len());
        assert_eq!(packed, vec![0b0000_1101, 0b0000_0001]);
    }

    #[test]
    fn test_copy_swapped() {
        let src = 0x0102_0304u32.to_le_bytes();
        let mut dst = [0u8; 4];
        copy_swapped(&src, &mut dst, 4);
        assert_eq!(dst, 0x0102_0304u32.to_be_bytes());

        let mut entry = Vec::new();
        entry.extend_from_slice(&7u64.to_le_bytes());
        entry.extend_from_slice(&3u32.to_le_bytes());
        let mut out = vec![0u8; 12];
        copy_swapped_entries(&entry, &mut out);
        assert_eq!(&out[..8], &7u64.to_be_bytes());
        assert_eq!(&out[8..], &3u32.to_be_bytes());
    }
}
