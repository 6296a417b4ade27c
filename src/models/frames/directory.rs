//! # Column Directory
//!
//! One 128-byte record per column, in schema order, directly after the header.
//!
//! ```text
//! off  size  field
//!   0     2  name length
//!   2    64  name, UTF-8, zero padded
//!  66     1  kind tag
//!  67     1  nullable (0/1)
//!  68     1  shape rank (0..=4)
//!  69     1  reserved
//!  70     4  kind width (FixedBytes only)
//!  74    16  dims[4], unused entries zero
//!  90     6  reserved
//!  96     8  mask offset (u64::MAX when not nullable)
//! 104     8  mask size
//! 112     8  payload offset
//! 120     8  payload size
//! ```

use crate::constants::{DIRECTORY_RECORD_LEN, MAX_NAME_LEN, MAX_RANK, NO_MASK};
use crate::enums::ByteOrder;
use crate::error::{BintableError, Result};
use crate::models::frames::fields::{FieldReader, FieldWriter};
use crate::models::layout::ColumnLayout;
use crate::models::schema::ColumnDescriptor;
use crate::models::types::kind::ColumnKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub shape: Vec<u32>,
    pub mask_offset: Option<u64>,
    pub mask_size: u64,
    pub payload_offset: u64,
    pub payload_size: u64,
}

impl DirectoryRecord {
    pub fn new(desc: &ColumnDescriptor, placed: &ColumnLayout) -> Self {
        Self {
            name: desc.name.clone(),
            kind: desc.kind,
            nullable: desc.nullable,
            shape: desc.shape.clone(),
            mask_offset: placed.mask_offset,
            mask_size: placed.mask_size,
            payload_offset: placed.payload_offset,
            payload_size: placed.payload_size,
        }
    }

    /// Descriptor without a unit; units travel in the metadata block.
    pub fn descriptor(&self) -> ColumnDescriptor {
        ColumnDescriptor::new(self.name.clone(), self.kind)
            .with_shape(self.shape.clone())
            .nullable(self.nullable)
    }

    /// Whether the stored placement equals a planned one.
    pub fn matches(&self, planned: &ColumnLayout) -> bool {
        self.mask_offset == planned.mask_offset
            && self.mask_size == planned.mask_size
            && self.payload_offset == planned.payload_offset
            && self.payload_size == planned.payload_size
    }

    /// Serialise into the first [`DIRECTORY_RECORD_LEN`] bytes of `out`,
    /// which must be zeroed.
    pub fn write(&self, out: &mut [u8], order: ByteOrder) {
        let mut w = FieldWriter::new(&mut out[..DIRECTORY_RECORD_LEN], order);
        let name = self.name.as_bytes();
        w.put_u16(name.len() as u16);
        w.put_bytes(name);
        w.skip(MAX_NAME_LEN - name.len());
        w.put_u8(self.kind.tag());
        w.put_u8(self.nullable as u8);
        w.put_u8(self.shape.len() as u8);
        w.skip(1);
        w.put_u32(self.kind.width_param());
        for axis in 0..MAX_RANK {
            w.put_u32(self.shape.get(axis).copied().unwrap_or(0));
        }
        w.skip(6);
        w.put_u64(self.mask_offset.unwrap_or(NO_MASK));
        w.put_u64(self.mask_size);
        w.put_u64(self.payload_offset);
        w.put_u64(self.payload_size);
        debug_assert_eq!(w.position(), DIRECTORY_RECORD_LEN);
    }

    /// Parse record `index`. Structural nonsense is `CorruptDirectory`.
    pub fn read(raw: &[u8], order: ByteOrder, index: usize) -> Result<Self> {
        let corrupt = |what: String| BintableError::corrupt(format!("record {index}: {what}"));
        let short = || corrupt("record shorter than 128 bytes".to_string());

        let mut r = FieldReader::new(raw, order);
        let name_len = r.get_u16().ok_or_else(short)? as usize;
        let padded = r.get_bytes(MAX_NAME_LEN).ok_or_else(short)?;
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(corrupt(format!("name length {name_len}")));
        }
        let name = std::str::from_utf8(&padded[..name_len])
            .map_err(|_| corrupt("name is not UTF-8".to_string()))?
            .to_string();

        let tag = r.get_u8().ok_or_else(short)?;
        let nullable = match r.get_u8().ok_or_else(short)? {
            0 => false,
            1 => true,
            other => return Err(corrupt(format!("nullable flag {other}"))),
        };
        let rank = r.get_u8().ok_or_else(short)? as usize;
        r.skip(1).ok_or_else(short)?;
        let width = r.get_u32().ok_or_else(short)?;
        let kind = ColumnKind::from_tag(tag, width)
            .ok_or_else(|| corrupt(format!("kind tag {tag} with width {width}")))?;
        if rank > MAX_RANK {
            return Err(corrupt(format!("rank {rank}")));
        }
        let mut dims = [0u32; MAX_RANK];
        for d in dims.iter_mut() {
            *d = r.get_u32().ok_or_else(short)?;
        }
        if dims[rank..].iter().any(|d| *d != 0) {
            return Err(corrupt("dimensions beyond the declared rank".to_string()));
        }
        r.skip(6).ok_or_else(short)?;

        let mask_offset = r.get_u64().ok_or_else(short)?;
        let mask_size = r.get_u64().ok_or_else(short)?;
        let payload_offset = r.get_u64().ok_or_else(short)?;
        let payload_size = r.get_u64().ok_or_else(short)?;

        let mask_offset = match (nullable, mask_offset) {
            (false, NO_MASK) => None,
            (true, NO_MASK) => return Err(corrupt("nullable column without a mask".into())),
            (false, _) => return Err(corrupt("mask on a non-nullable column".into())),
            (true, offset) => Some(offset),
        };

        Ok(Self {
            name,
            kind,
            nullable,
            shape: dims[..rank].to_vec(),
            mask_offset,
            mask_size,
            payload_offset,
            payload_size,
        })
    }
}
