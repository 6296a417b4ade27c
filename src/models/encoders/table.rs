//! # Table Encoder
//!
//! Serialises a [`Table`] into one contiguous bintable buffer.
//!
//! The layout is planned first and the output allocated once at its final
//! size, so every section is written in place. Output depends only on the
//! table contents and [`EncodeOptions`].

use crate::constants::{DIRECTORY_RECORD_LEN, FORMAT_VERSION, HEADER_LEN, VAR_ENTRY_LEN};
use crate::enums::{AlignmentPolicy, ByteOrder};
use crate::error::{BintableError, Result};
use crate::models::buffer::SharedBytes;
use crate::models::column::{Column, ColumnData};
use crate::models::frames::directory::DirectoryRecord;
use crate::models::frames::fields::FieldWriter;
use crate::models::frames::header::FileHeader;
use crate::models::frames::metadata::MetadataBlock;
use crate::models::layout::{plan_layout, ColumnLayout};
use crate::models::table::Table;
use crate::utils::{bitmap_len, copy_swapped, zeroed_aligned};

/// Encoder settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Byte order of the written file. Defaults to the host order.
    pub byte_order: ByteOrder,
    pub alignment: AlignmentPolicy,
}

/// Encode with default options (host byte order, natural alignment).
pub fn encode(table: &Table) -> Result<Vec<u8>> {
    encode_with(table, &EncodeOptions::default())
}

/// Encode `table` into a fresh buffer.
///
/// Fails with `SchemaMismatch` or `RowCountMismatch` before writing anything
/// if the columns disagree with the schema.
pub fn encode_with(table: &Table, options: &EncodeOptions) -> Result<Vec<u8>> {
    encode_into(table, options, |total| vec![0u8; total])
}

/// Encode into a 64-byte aligned buffer, ready to decode in place.
///
/// Offsets in the file are relative to its first byte, so only a buffer
/// whose base is itself aligned keeps the [`AlignmentPolicy`] guarantees
/// in memory.
pub fn encode_aligned(table: &Table, options: &EncodeOptions) -> Result<SharedBytes> {
    let out = encode_into(table, options, zeroed_aligned)?;
    Ok(SharedBytes::from_owner(out))
}

/// Plan, allocate the zeroed output through `alloc`, then write every section.
fn encode_into<B, F>(table: &Table, options: &EncodeOptions, alloc: F) -> Result<B>
where
    B: AsMut<[u8]>,
    F: FnOnce(usize) -> B,
{
    table.validate()?;
    let schema = table.schema();
    let n_rows = table.n_rows() as u64;
    let order = options.byte_order;

    let mut heap_size = 0u64;
    for (index, col) in table.columns().iter().enumerate() {
        let bytes = col
            .heap_bytes()
            .ok_or_else(|| malformed(table, index, "entry table shorter than its row count"))?;
        heap_size = heap_size
            .checked_add(bytes)
            .ok_or_else(|| BintableError::invalid_schema("heap size overflows 64-bit offsets"))?;
    }

    let layout = plan_layout(schema, n_rows, options.alignment)?.with_heap_size(heap_size)?;
    let metadata = MetadataBlock::collect(schema, table.meta()).to_bytes()?;
    let metadata_offset = layout.heap_end();
    let total = metadata_offset
        .checked_add(metadata.len() as u64)
        .and_then(|t| usize::try_from(t).ok())
        .ok_or_else(|| BintableError::invalid_schema("encoded table exceeds the address space"))?;

    log::debug!(
        "encoding {} rows x {} columns: {} bytes ({} heap, {} metadata), {:?}, {:?}",
        n_rows,
        schema.len(),
        total,
        heap_size,
        metadata.len(),
        order,
        options.alignment
    );

    let mut buf = alloc(total);
    let out = buf.as_mut();

    let header = FileHeader {
        version: FORMAT_VERSION,
        byte_order: order,
        flags: FileHeader::flags_for(options.alignment),
        row_count: n_rows,
        column_count: schema.len() as u32,
        directory_offset: layout.directory_offset,
        directory_size: layout.directory_size,
        heap_offset: layout.heap_offset,
        heap_size,
        metadata_offset,
        metadata_size: metadata.len() as u64,
    };
    header.write(&mut out[..HEADER_LEN]);

    for (i, (desc, placed)) in schema.columns().iter().zip(&layout.columns).enumerate() {
        let start = HEADER_LEN + i * DIRECTORY_RECORD_LEN;
        DirectoryRecord::new(desc, placed).write(&mut out[start..start + DIRECTORY_RECORD_LEN], order);
    }

    let heap_start = layout.heap_offset as usize;
    let mut heap_cursor = 0u64;
    for (index, (col, placed)) in table.columns().iter().zip(&layout.columns).enumerate() {
        write_mask(out, col, placed);
        match col.data() {
            ColumnData::Fixed(bytes) => {
                let dst = section(out, placed.payload_offset, placed.payload_size);
                if bytes.len() != dst.len() {
                    return Err(malformed(table, index, "payload size differs from its shape"));
                }
                if order.is_native() {
                    dst.copy_from_slice(bytes);
                } else {
                    copy_swapped(bytes, dst, col.kind().swap_width());
                }
            }
            ColumnData::Variable { .. } => {
                for row in 0..col.len() {
                    let value: &[u8] = if col.is_valid(row) {
                        col.row_bytes(row)
                            .ok_or_else(|| malformed(table, index, "entry points outside its values"))?
                    } else {
                        &[]
                    };
                    let at = heap_start + heap_cursor as usize;
                    out[at..at + value.len()].copy_from_slice(value);

                    let entry_at = placed.payload_offset as usize + row * VAR_ENTRY_LEN;
                    let mut w = FieldWriter::new(&mut out[entry_at..entry_at + VAR_ENTRY_LEN], order);
                    w.put_u64(heap_cursor);
                    w.put_u32(value.len() as u32);
                    heap_cursor += value.len() as u64;
                }
            }
        }
    }
    debug_assert_eq!(heap_cursor, heap_size);

    out[metadata_offset as usize..].copy_from_slice(&metadata);
    Ok(buf)
}

fn section(out: &mut [u8], offset: u64, size: u64) -> &mut [u8] {
    &mut out[offset as usize..(offset + size) as usize]
}

/// Copy the validity bits, keeping bits past the last row clear.
fn write_mask(out: &mut [u8], col: &Column, placed: &ColumnLayout) {
    let (Some(offset), Some(bitmap)) = (placed.mask_offset, col.validity()) else {
        return;
    };
    let dst = section(out, offset, placed.mask_size);
    let n = bitmap_len(col.len());
    dst[..n].copy_from_slice(&bitmap.as_bytes()[..n]);
    let tail = col.len() % 8;
    if tail != 0 {
        dst[n - 1] &= (1u8 << tail) - 1;
    }
}

fn malformed(table: &Table, index: usize, what: &str) -> BintableError {
    let name = table
        .schema()
        .column(index)
        .map_or_else(String::new, |d| d.name.clone());
    BintableError::CorruptPayload(format!("column {index} ({name}): {what}"))
}
