//! # File Header
//!
//! Fixed 72-byte preamble. The byte-order flag at offset 6 is read before
//! anything else, since it governs every multi-byte field that follows.
//!
//! ```text
//! off  size  field
//!   0     4  magic "BTBL"
//!   4     2  format version
//!   6     1  byte order (0 little, 1 big)
//!   7     1  layout flags (bit 0: 64-byte alignment)
//!   8     8  row count
//!  16     4  column count
//!  20     4  reserved
//!  24     8  directory offset      32  8  directory size
//!  40     8  heap offset           48  8  heap size
//!  56     8  metadata offset       64  8  metadata size
//! ```

use crate::constants::{BINTABLE_MAGIC, FLAG_SIMD64, FORMAT_VERSION, HEADER_LEN, KNOWN_FLAGS};
use crate::enums::{AlignmentPolicy, ByteOrder};
use crate::error::{BintableError, Result};
use crate::models::frames::fields::{FieldReader, FieldWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u16,
    pub byte_order: ByteOrder,
    pub flags: u8,
    pub row_count: u64,
    pub column_count: u32,
    pub directory_offset: u64,
    pub directory_size: u64,
    pub heap_offset: u64,
    pub heap_size: u64,
    pub metadata_offset: u64,
    pub metadata_size: u64,
}

impl FileHeader {
    #[inline]
    pub fn policy(&self) -> AlignmentPolicy {
        if self.flags & FLAG_SIMD64 != 0 {
            AlignmentPolicy::Simd64
        } else {
            AlignmentPolicy::Natural
        }
    }

    #[inline]
    pub fn flags_for(policy: AlignmentPolicy) -> u8 {
        match policy {
            AlignmentPolicy::Natural => 0,
            AlignmentPolicy::Simd64 => FLAG_SIMD64,
        }
    }

    /// Declared total file length.
    pub fn file_len(&self) -> Option<u64> {
        self.metadata_offset.checked_add(self.metadata_size)
    }

    /// Serialise into the first [`HEADER_LEN`] bytes of `out`.
    pub fn write(&self, out: &mut [u8]) {
        let mut w = FieldWriter::new(&mut out[..HEADER_LEN], self.byte_order);
        w.put_bytes(BINTABLE_MAGIC);
        w.put_u16(self.version);
        w.put_u8(self.byte_order.flag());
        w.put_u8(self.flags);
        w.put_u64(self.row_count);
        w.put_u32(self.column_count);
        w.put_u32(0);
        w.put_u64(self.directory_offset);
        w.put_u64(self.directory_size);
        w.put_u64(self.heap_offset);
        w.put_u64(self.heap_size);
        w.put_u64(self.metadata_offset);
        w.put_u64(self.metadata_size);
        debug_assert_eq!(w.position(), HEADER_LEN);
    }

    /// Parse and check magic, version and flags.
    ///
    /// Section bounds are checked against the buffer by the decoder, which
    /// knows the buffer length.
    pub fn read(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            // A short buffer that does not even start with the magic is a
            // foreign file rather than a cut-off one.
            let prefix = &buf[..buf.len().min(BINTABLE_MAGIC.len())];
            if prefix != &BINTABLE_MAGIC[..prefix.len()] {
                return Err(bad_magic(prefix));
            }
            return Err(BintableError::truncated("header", HEADER_LEN as u64, buf.len()));
        }
        if &buf[..4] != BINTABLE_MAGIC {
            return Err(bad_magic(&buf[..4]));
        }

        let byte_order = ByteOrder::from_flag(buf[6]).ok_or_else(|| {
            BintableError::UnsupportedVersion(format!("unknown byte order flag {}", buf[6]))
        })?;

        let mut r = FieldReader::new(&buf[..HEADER_LEN], byte_order);
        let header = (|| {
            r.skip(4)?;
            let version = r.get_u16()?;
            r.skip(1)?;
            let flags = r.get_u8()?;
            let row_count = r.get_u64()?;
            let column_count = r.get_u32()?;
            r.skip(4)?;
            Some(FileHeader {
                version,
                byte_order,
                flags,
                row_count,
                column_count,
                directory_offset: r.get_u64()?,
                directory_size: r.get_u64()?,
                heap_offset: r.get_u64()?,
                heap_size: r.get_u64()?,
                metadata_offset: r.get_u64()?,
                metadata_size: r.get_u64()?,
            })
        })()
        .ok_or_else(|| BintableError::truncated("header", HEADER_LEN as u64, buf.len()))?;

        if header.version == 0 || header.version > FORMAT_VERSION {
            return Err(BintableError::UnsupportedVersion(format!(
                "format version {} (this build reads up to {FORMAT_VERSION})",
                header.version
            )));
        }
        if header.flags & !KNOWN_FLAGS != 0 {
            return Err(BintableError::UnsupportedVersion(format!(
                "unknown layout flags {:#010b}",
                header.flags
            )));
        }
        Ok(header)
    }
}

fn bad_magic(found: &[u8]) -> BintableError {
    BintableError::BadMagic {
        expected: *BINTABLE_MAGIC,
        found: found.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(order: ByteOrder) -> FileHeader {
        FileHeader {
            version: FORMAT_VERSION,
            byte_order: order,
            flags: FLAG_SIMD64,
            row_count: 10,
            column_count: 3,
            directory_offset: 72,
            directory_size: 384,
            heap_offset: 1024,
            heap_size: 17,
            metadata_offset: 1041,
            metadata_size: 2,
        }
    }

    #[test]
    fn test_header_layout_is_fixed() {
        let mut buf = vec![0u8; HEADER_LEN];
        sample(ByteOrder::Big).write(&mut buf);
        assert_eq!(&buf[0..4], b"BTBL");
        assert_eq!(&buf[4..6], &[0u8, 1]);
        assert_eq!(buf[6], 1);
        assert_eq!(buf[7], FLAG_SIMD64);
        assert_eq!(&buf[8..16], &10u64.to_be_bytes());
        assert_eq!(&buf[16..20], &3u32.to_be_bytes());
        assert_eq!(&buf[64..72], &2u64.to_be_bytes());

        let parsed = FileHeader::read(&buf).unwrap();
        assert_eq!(parsed, sample(ByteOrder::Big));
        assert_eq!(parsed.policy(), AlignmentPolicy::Simd64);
        assert_eq!(parsed.file_len(), Some(1043));
    }

    #[test]
    fn test_little_endian_header() {
        let mut buf = vec![0u8; HEADER_LEN];
        sample(ByteOrder::Little).write(&mut buf);
        assert_eq!(&buf[4..6], &[1u8, 0]);
        assert_eq!(FileHeader::read(&buf).unwrap(), sample(ByteOrder::Little));
    }

    #[test]
    fn test_bad_magic_and_short_buffers() {
        let err = FileHeader::read(b"PK\x03\x04 not a table at all, but long enough to hold a header ....")
            .unwrap_err();
        assert!(matches!(err, BintableError::BadMagic { .. }));

        let err = FileHeader::read(b"XY").unwrap_err();
        assert!(matches!(err, BintableError::BadMagic { .. }));

        let err = FileHeader::read(b"BTBL\x01\x00").unwrap_err();
        assert!(matches!(
            err,
            BintableError::Truncated { section: "header", expected: 72, found: 6 }
        ));
    }

    #[test]
    fn test_rejects_newer_version_and_unknown_flags() {
        let mut buf = vec![0u8; HEADER_LEN];
        let mut h = sample(ByteOrder::Little);
        h.version = FORMAT_VERSION + 1;
        h.write(&mut buf);
        let err = FileHeader::read(&buf).unwrap_err();
        assert!(matches!(err, BintableError::UnsupportedVersion(_)));

        let mut h = sample(ByteOrder::Little);
        h.flags = 0b1000_0000;
        h.write(&mut buf);
        let err = FileHeader::read(&buf).unwrap_err();
        assert!(matches!(err, BintableError::UnsupportedVersion(_)));

        sample(ByteOrder::Little).write(&mut buf);
        buf[6] = 9;
        let err = FileHeader::read(&buf).unwrap_err();
        assert!(matches!(err, BintableError::UnsupportedVersion(_)));
    }
}
