//! # Layout Planner
//!
//! Computes where every column's null mask and payload live in the file,
//! given only the schema, the row count and the alignment policy.
//!
//! ```text
//! +--------+----------------+-----+---------------------------+-----+------+----------+
//! | header | directory      | pad | col 0: [mask] pad payload | ... | heap | metadata |
//! | 72 B   | 128 B / column |     | col 1: ...                |     |      | (JSON)   |
//! +--------+----------------+-----+---------------------------+-----+------+----------+
//! ```
//!
//! Each column footprint starts on its own aligned boundary, so payload
//! bytes can be reinterpreted as typed elements in place. The heap follows
//! the last footprint on an 8-byte (or policy) boundary. Planning is a pure
//! function: equal inputs give equal offsets.

use crate::constants::{DIRECTORY_RECORD_LEN, HEADER_LEN, VAR_ENTRY_LEN};
use crate::enums::AlignmentPolicy;
use crate::error::{BintableError, Result};
use crate::models::schema::Schema;
use crate::utils::{align_up, bitmap_len};

/// Placement of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub column_index: usize,
    /// Start of the null mask; `None` for non-nullable columns.
    pub mask_offset: Option<u64>,
    pub mask_size: u64,
    pub payload_offset: u64,
    pub payload_size: u64,
}

impl ColumnLayout {
    /// First byte past the payload.
    #[inline]
    pub fn payload_end(&self) -> u64 {
        self.payload_offset + self.payload_size
    }
}

/// Byte plan for a whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub n_rows: u64,
    pub policy: AlignmentPolicy,
    pub directory_offset: u64,
    pub directory_size: u64,
    /// First byte of the first column footprint.
    pub payload_start: u64,
    pub columns: Vec<ColumnLayout>,
    pub heap_offset: u64,
    /// Zero until [`with_heap_size`](Self::with_heap_size) is applied.
    pub heap_size: u64,
}

impl Layout {
    /// Record the heap size once the variable-length data is known.
    pub fn with_heap_size(mut self, heap_size: u64) -> Result<Self> {
        self.heap_offset
            .checked_add(heap_size)
            .ok_or_else(|| BintableError::invalid_schema("heap size overflows 64-bit offsets"))?;
        self.heap_size = heap_size;
        Ok(self)
    }

    /// First byte past the heap; the metadata block starts here.
    #[inline]
    pub fn heap_end(&self) -> u64 {
        self.heap_offset + self.heap_size
    }
}

/// Plan the layout of `schema` for `n_rows` rows.
///
/// Fails with `InvalidSchema` if any offset would overflow 64 bits.
pub fn plan_layout(schema: &Schema, n_rows: u64, policy: AlignmentPolicy) -> Result<Layout> {
    let overflow = |name: &str| {
        BintableError::invalid_schema(format!(
            "layout of column '{name}' with {n_rows} rows overflows 64-bit offsets"
        ))
    };

    let directory_offset = HEADER_LEN as u64;
    let directory_size = (schema.len() as u64)
        .checked_mul(DIRECTORY_RECORD_LEN as u64)
        .ok_or_else(|| BintableError::invalid_schema("directory too large"))?;
    let min_align = policy.min_alignment() as u64;
    let mut cursor = directory_offset + directory_size;
    let payload_start = cursor;

    let mut columns = Vec::with_capacity(schema.len());
    for (column_index, desc) in schema.columns().iter().enumerate() {
        let align = (desc.kind.alignment_of() as u64).max(min_align);
        cursor = align_up(cursor, align).ok_or_else(|| overflow(&desc.name))?;

        let (mask_offset, mask_size) = if desc.nullable {
            let size = bitmap_len(usize::try_from(n_rows).map_err(|_| overflow(&desc.name))?)
                as u64;
            let offset = cursor;
            cursor = cursor.checked_add(size).ok_or_else(|| overflow(&desc.name))?;
            cursor = align_up(cursor, align).ok_or_else(|| overflow(&desc.name))?;
            (Some(offset), size)
        } else {
            (None, 0)
        };

        let row_width = match desc.kind.size_of() {
            Some(_) => desc.row_width().ok_or_else(|| overflow(&desc.name))?,
            None => VAR_ENTRY_LEN as u64,
        };
        let payload_size = n_rows
            .checked_mul(row_width)
            .ok_or_else(|| overflow(&desc.name))?;
        let payload_offset = cursor;
        cursor = cursor
            .checked_add(payload_size)
            .ok_or_else(|| overflow(&desc.name))?;

        columns.push(ColumnLayout {
            column_index,
            mask_offset,
            mask_size,
            payload_offset,
            payload_size,
        });
    }

    let heap_offset = align_up(cursor, policy.heap_alignment() as u64)
        .ok_or_else(|| BintableError::invalid_schema("heap offset overflows 64-bit offsets"))?;

    let payload_start = columns
        .first()
        .map_or(payload_start, |c| c.mask_offset.unwrap_or(c.payload_offset));

    log::debug!(
        "planned layout: {} columns, {} rows, payload at {}, heap at {} ({:?})",
        columns.len(),
        n_rows,
        payload_start,
        heap_offset,
        policy
    );

    Ok(Layout {
        n_rows,
        policy,
        directory_offset,
        directory_size,
        payload_start,
        columns,
        heap_offset,
        heap_size: 0,
    })
}
