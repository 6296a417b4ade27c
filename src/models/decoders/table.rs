//! # Table Decoder
//!
//! Validates a bintable buffer and exposes its columns as views.
//!
//! Stages run in order and any failure discards everything built so far:
//!
//! 1. **Header**: magic, version, flags, section bounds.
//! 2. **Directory**: records parsed into a [`Schema`], the layout re-derived
//!    from it and compared field by field with the stored offsets.
//! 3. **Views**: masks and payloads sliced out of the shared buffer. Files in
//!    the host byte order are not copied; the other order is swapped into
//!    owned buffers up front, except for single-byte kinds which have
//!    nothing to swap.
//!
//! [`TableDecoder::state`] reports how far the last decode got.

use serde::Serialize;

use crate::constants::{DIRECTORY_RECORD_LEN, HEADER_LEN};
use crate::enums::{AlignmentPolicy, ByteOrder, DecodeState};
use crate::error::{BintableError, Result};
use crate::models::bitmap::Bitmap;
use crate::models::buffer::SharedBytes;
use crate::models::column::{Column, ColumnData};
use crate::models::frames::directory::DirectoryRecord;
use crate::models::frames::header::FileHeader;
use crate::models::frames::metadata::MetadataBlock;
use crate::models::layout::{plan_layout, Layout};
use crate::models::schema::{ColumnDescriptor, Schema};
use crate::models::table::{Table, TableMeta};
use crate::models::types::kind::ColumnKind;
use crate::utils::{copy_swapped, copy_swapped_entries, zeroed_aligned};

/// Decoder settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Return only these columns, in this order. `None` returns all of them.
    /// The whole file is validated either way.
    pub columns: Option<Vec<String>>,
}

impl DecodeOptions {
    pub fn with_columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Some(names.into_iter().map(Into::into).collect()),
        }
    }
}

/// Decode every column with default options.
pub fn decode(buffer: impl Into<SharedBytes>) -> Result<Table> {
    TableDecoder::new(DecodeOptions::default()).decode(buffer)
}

pub fn decode_with(buffer: impl Into<SharedBytes>, options: &DecodeOptions) -> Result<Table> {
    TableDecoder::new(options.clone()).decode(buffer)
}

/// Header and directory of a buffer, without building column views.
pub fn inspect(buffer: &[u8]) -> Result<FileSummary> {
    let checked = Structure::read(buffer)?;
    let metadata = MetadataBlock::from_bytes(checked.metadata_bytes(buffer))?;
    Ok(FileSummary::new(&checked, metadata))
}

/// Stateful decoder; one instance may decode several buffers in turn.
#[derive(Debug)]
pub struct TableDecoder {
    options: DecodeOptions,
    state: DecodeState,
}

impl TableDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            options,
            state: DecodeState::Unopened,
        }
    }

    #[inline]
    pub fn state(&self) -> DecodeState {
        self.state
    }

    #[inline]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode `buffer` into a table. Column views keep the buffer alive.
    pub fn decode(&mut self, buffer: impl Into<SharedBytes>) -> Result<Table> {
        self.transition(DecodeState::Unopened);
        let buffer = buffer.into();
        match self.run(&buffer) {
            Ok(table) => {
                self.transition(DecodeState::Ready);
                Ok(table)
            }
            Err(e) => {
                self.transition(DecodeState::Failed(e.kind()));
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: DecodeState) {
        log::trace!("decoder: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn run(&mut self, buffer: &SharedBytes) -> Result<Table> {
        let header = read_header(buffer)?;
        self.transition(DecodeState::HeaderValidated);

        let checked = Structure::from_header(buffer, header)?;
        self.transition(DecodeState::DirectoryValidated);

        let metadata = MetadataBlock::from_bytes(checked.metadata_bytes(buffer))?;
        let foreign = !header.byte_order.is_native();
        if foreign
            && checked
                .schema
                .columns()
                .iter()
                .any(|c| c.kind.swap_width() > 1 || c.kind.is_variable())
        {
            log::warn!(
                "file is {:?}-endian, host is {:?}-endian: column payloads are copied and byte-swapped",
                header.byte_order,
                ByteOrder::native()
            );
        }

        let n_rows = header.row_count as usize;
        let mut columns = Vec::with_capacity(checked.records.len());
        let heap = slice(buffer, checked.layout.heap_offset, checked.layout.heap_size)?;
        for (index, record) in checked.records.iter().enumerate() {
            columns.push(build_column(buffer, &heap, record, index, n_rows, header.byte_order)?);
        }

        let schema = apply_units(&checked.schema, &metadata)?;
        let table = Table::from_parts(schema, columns, n_rows).with_meta(metadata.meta);
        log::debug!(
            "decoded {} rows x {} columns ({} bytes, zero-copy: {})",
            n_rows,
            table.n_cols(),
            buffer.len(),
            !foreign
        );

        match &self.options.columns {
            Some(names) => table.select(names),
            None => Ok(table),
        }
    }
}

fn read_header(buffer: &[u8]) -> Result<FileHeader> {
    let header = FileHeader::read(buffer)?;
    let total = header
        .file_len()
        .ok_or_else(|| BintableError::corrupt("metadata section overflows 64-bit offsets"))?;
    let dir_end = header.directory_offset.saturating_add(header.directory_size);
    if (buffer.len() as u64) < dir_end {
        return Err(BintableError::truncated("directory", dir_end, buffer.len()));
    }
    if (buffer.len() as u64) < total {
        return Err(BintableError::truncated("file", total, buffer.len()));
    }
    if (buffer.len() as u64) > total {
        log::debug!(
            "ignoring {} trailing bytes after the metadata block",
            buffer.len() as u64 - total
        );
    }
    Ok(header)
}

/// Header, directory and re-derived layout that agree with each other.
#[derive(Debug)]
struct Structure {
    header: FileHeader,
    records: Vec<DirectoryRecord>,
    schema: Schema,
    layout: Layout,
}

impl Structure {
    fn read(buffer: &[u8]) -> Result<Self> {
        let header = read_header(buffer)?;
        Self::from_header(buffer, header)
    }

    fn from_header(buffer: &[u8], header: FileHeader) -> Result<Self> {
        let n_cols = header.column_count as usize;
        let expected_dir = (n_cols as u64) * DIRECTORY_RECORD_LEN as u64;
        if header.directory_offset != HEADER_LEN as u64 || header.directory_size != expected_dir {
            return Err(BintableError::corrupt(format!(
                "directory at {}+{}, expected {}+{} for {} columns",
                header.directory_offset, header.directory_size, HEADER_LEN, expected_dir, n_cols
            )));
        }

        let mut records = Vec::with_capacity(n_cols);
        for index in 0..n_cols {
            let start = HEADER_LEN + index * DIRECTORY_RECORD_LEN;
            let raw = &buffer[start..start + DIRECTORY_RECORD_LEN];
            records.push(DirectoryRecord::read(raw, header.byte_order, index)?);
        }

        let schema = Schema::new(records.iter().map(DirectoryRecord::descriptor).collect())
            .map_err(|e| match e {
                BintableError::InvalidSchema(msg) => BintableError::CorruptDirectory(msg),
                other => other,
            })?;

        for desc in schema.columns() {
            check_addressable(header.row_count, desc)?;
        }

        let layout = plan_layout(&schema, header.row_count, header.policy())
            .and_then(|l| l.with_heap_size(header.heap_size))
            .map_err(|e| BintableError::corrupt(e.to_string()))?;

        for (index, (record, planned)) in records.iter().zip(&layout.columns).enumerate() {
            if !record.matches(planned) {
                return Err(BintableError::corrupt(format!(
                    "column {index} ({}) stored at mask {:?}+{} payload {}+{}, layout expects mask {:?}+{} payload {}+{}",
                    record.name,
                    record.mask_offset,
                    record.mask_size,
                    record.payload_offset,
                    record.payload_size,
                    planned.mask_offset,
                    planned.mask_size,
                    planned.payload_offset,
                    planned.payload_size
                )));
            }
        }
        if header.heap_offset != layout.heap_offset {
            return Err(BintableError::corrupt(format!(
                "heap at {}, layout expects {}",
                header.heap_offset, layout.heap_offset
            )));
        }
        if header.metadata_offset != layout.heap_end() {
            return Err(BintableError::corrupt(format!(
                "metadata at {}, heap ends at {}",
                header.metadata_offset,
                layout.heap_end()
            )));
        }

        Ok(Self {
            header,
            records,
            schema,
            layout,
        })
    }

    fn metadata_bytes<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        let start = self.header.metadata_offset as usize;
        &buffer[start..start + self.header.metadata_size as usize]
    }
}

/// Rows times row width must fit the host address space.
fn check_addressable(rows: u64, desc: &ColumnDescriptor) -> Result<()> {
    let fits = usize::try_from(rows).is_ok()
        && desc
            .row_width()
            .and_then(|w| rows.checked_mul(w))
            .and_then(|bytes| usize::try_from(bytes).ok())
            .is_some();
    if fits {
        Ok(())
    } else {
        Err(BintableError::RowCountOverflow {
            rows,
            name: desc.name.clone(),
        })
    }
}

fn slice(buffer: &SharedBytes, offset: u64, size: u64) -> Result<SharedBytes> {
    let start = offset as usize;
    let end = offset
        .checked_add(size)
        .map(|e| e as usize)
        .ok_or_else(|| BintableError::corrupt("section end overflows"))?;
    buffer
        .slice(start..end)
        .ok_or_else(|| BintableError::truncated("section", offset + size, buffer.len()))
}

fn build_column(
    buffer: &SharedBytes,
    heap: &SharedBytes,
    record: &DirectoryRecord,
    index: usize,
    n_rows: usize,
    order: ByteOrder,
) -> Result<Column> {
    let foreign = !order.is_native();

    let validity = match record.mask_offset {
        Some(offset) => {
            let bits = slice(buffer, offset, record.mask_size)?;
            Some(Bitmap::from_bytes(bits, n_rows).ok_or_else(|| {
                BintableError::corrupt(format!("column {index} ({}): mask too short", record.name))
            })?)
        }
        None => None,
    };

    let payload = slice(buffer, record.payload_offset, record.payload_size)?;
    let data = if record.kind.is_variable() {
        let entries = if foreign {
            let mut owned = zeroed_aligned(payload.len());
            copy_swapped_entries(&payload, &mut owned);
            SharedBytes::from(owned)
        } else {
            payload
        };
        ColumnData::Variable {
            entries,
            values: heap.clone(),
        }
    } else if foreign && record.kind.swap_width() > 1 {
        let mut owned = zeroed_aligned(payload.len());
        copy_swapped(&payload, &mut owned, record.kind.swap_width());
        ColumnData::Fixed(SharedBytes::from(owned))
    } else {
        // single-byte kinds read the same in either order
        ColumnData::Fixed(payload)
    };

    let column = Column::from_parts(record.kind, record.shape.clone(), n_rows, validity, data);
    if record.kind.is_variable() {
        check_entries(&column, heap.len() as u64, record, index)?;
    }
    Ok(column)
}

/// Every entry must lie inside the heap; present `VarString` rows must be UTF-8.
fn check_entries(column: &Column, heap_size: u64, record: &DirectoryRecord, index: usize) -> Result<()> {
    for row in 0..column.len() {
        let (offset, length) = column.var_entry(row).ok_or_else(|| {
            BintableError::corrupt(format!("column {index} ({}): entry table too short", record.name))
        })?;
        let in_heap = offset
            .checked_add(length as u64)
            .is_some_and(|end| end <= heap_size);
        if !in_heap {
            return Err(BintableError::corrupt(format!(
                "column {index} ({}) row {row}: entry {offset}+{length} outside heap of {heap_size} bytes",
                record.name
            )));
        }
        if record.kind == ColumnKind::VarString && column.is_valid(row) {
            let bytes = column.row_bytes(row).unwrap_or_default();
            if std::str::from_utf8(bytes).is_err() {
                return Err(BintableError::CorruptPayload(format!(
                    "column {index} ({}) row {row} is not valid UTF-8",
                    record.name
                )));
            }
        }
    }
    Ok(())
}

fn apply_units(schema: &Schema, metadata: &MetadataBlock) -> Result<Schema> {
    if metadata.units.is_empty() {
        return Ok(schema.clone());
    }
    for name in metadata.units.keys() {
        if schema.index_of(name).is_none() {
            log::warn!("metadata names a unit for unknown column '{name}'; ignored");
        }
    }
    let columns = schema
        .columns()
        .iter()
        .map(|c| {
            let mut c = c.clone();
            c.unit = metadata.units.get(&c.name).cloned();
            c
        })
        .collect();
    Schema::new(columns)
}

/// Placement and structure of one column, as reported by [`inspect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: String,
    pub shape: Vec<u32>,
    pub nullable: bool,
    pub unit: Option<String>,
    pub mask_offset: Option<u64>,
    pub mask_size: u64,
    pub payload_offset: u64,
    pub payload_size: u64,
}

/// Header fields and directory of a bintable file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub version: u16,
    pub byte_order: String,
    pub alignment: String,
    pub row_count: u64,
    pub column_count: u32,
    pub directory_offset: u64,
    pub directory_size: u64,
    pub heap_offset: u64,
    pub heap_size: u64,
    pub metadata_offset: u64,
    pub metadata_size: u64,
    pub meta: TableMeta,
    pub columns: Vec<ColumnSummary>,
}

impl FileSummary {
    fn new(checked: &Structure, metadata: MetadataBlock) -> Self {
        let h = &checked.header;
        let columns = checked
            .records
            .iter()
            .map(|r| ColumnSummary {
                name: r.name.clone(),
                kind: r.kind.to_string(),
                shape: r.shape.clone(),
                nullable: r.nullable,
                unit: metadata.units.get(&r.name).cloned(),
                mask_offset: r.mask_offset,
                mask_size: r.mask_size,
                payload_offset: r.payload_offset,
                payload_size: r.payload_size,
            })
            .collect();
        Self {
            version: h.version,
            byte_order: match h.byte_order {
                ByteOrder::Little => "little".into(),
                ByteOrder::Big => "big".into(),
            },
            alignment: match h.policy() {
                AlignmentPolicy::Natural => "natural".into(),
                AlignmentPolicy::Simd64 => "simd64".into(),
            },
            row_count: h.row_count,
            column_count: h.column_count,
            directory_offset: h.directory_offset,
            directory_size: h.directory_size,
            heap_offset: h.heap_offset,
            heap_size: h.heap_size,
            metadata_offset: h.metadata_offset,
            metadata_size: h.metadata_size,
            meta: metadata.meta,
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::VAR_ENTRY_LEN;
    use crate::error::ErrorKind;
    use crate::models::encoders::table::{encode, encode_with, EncodeOptions};
    use crate::test_helpers::{mixed_table, string_table};

    #[test]
    fn test_state_machine_reaches_ready() {
        let bytes = encode(&mixed_table(10)).unwrap();
        let mut decoder = TableDecoder::new(DecodeOptions::default());
        assert_eq!(decoder.state(), DecodeState::Unopened);
        let table = decoder.decode(bytes).unwrap();
        assert_eq!(decoder.state(), DecodeState::Ready);
        assert_eq!(table, mixed_table(10));
    }

    #[test]
    fn test_failed_state_records_kind() {
        let mut bytes = encode(&mixed_table(4)).unwrap();
        bytes[0] = b'X';
        let mut decoder = TableDecoder::new(DecodeOptions::default());
        assert!(decoder.decode(bytes.clone()).is_err());
        assert_eq!(decoder.state(), DecodeState::Failed(ErrorKind::BadMagic));

        bytes[0] = b'B';
        bytes.truncate(bytes.len() - 1);
        assert!(decoder.decode(bytes).is_err());
        assert_eq!(decoder.state(), DecodeState::Failed(ErrorKind::Truncated));
    }

    #[test]
    fn test_heap_entry_outside_heap_is_corrupt() {
        let table = string_table(&[Some("abc"), Some("de")]);
        let bytes = encode_with(
            &table,
            &EncodeOptions {
                byte_order: ByteOrder::Little,
                ..Default::default()
            },
        )
        .unwrap();
        let checked = Structure::read(&bytes).unwrap();
        let entry = checked.records[0].payload_offset as usize + VAR_ENTRY_LEN;
        let mut bad = bytes.clone();
        bad[entry + 8..entry + 12].copy_from_slice(&100u32.to_le_bytes());
        let err = decode(bad).unwrap_err();
        assert!(matches!(err, BintableError::CorruptDirectory(_)), "{err}");
    }

    #[test]
    fn test_foreign_order_swaps_only_multi_byte_columns() {
        let table = mixed_table(7);
        let options = EncodeOptions {
            byte_order: ByteOrder::native().opposite(),
            ..Default::default()
        };
        let input = SharedBytes::from(encode_with(&table, &options).unwrap());
        let decoded = decode(input.clone()).unwrap();
        assert_eq!(decoded, table);

        let flag = decoded.column_by_name("flag").unwrap().fixed_bytes().unwrap();
        assert!(flag.is_within(&input));
        let ra = decoded.column_by_name("ra").unwrap().fixed_bytes().unwrap();
        assert!(!ra.is_within(&input));
        assert!(ra.is_simd_aligned());
    }

    #[test]
    fn test_invalid_utf8_is_corrupt_payload() {
        let table = string_table(&[Some("ok")]);
        let bytes = encode(&table).unwrap();
        let checked = Structure::read(&bytes).unwrap();
        let mut bad = bytes.clone();
        bad[checked.layout.heap_offset as usize] = 0xFF;
        let err = decode(bad).unwrap_err();
        assert!(matches!(err, BintableError::CorruptPayload(_)), "{err}");
    }

    #[test]
    fn test_inspect_reports_layout() {
        let table = mixed_table(10);
        let bytes = encode(&table).unwrap();
        let summary = inspect(&bytes).unwrap();
        assert_eq!(summary.row_count, 10);
        assert_eq!(summary.column_count, table.n_cols() as u32);
        assert_eq!(summary.alignment, "natural");
        let layout = plan_layout(table.schema(), 10, AlignmentPolicy::Natural).unwrap();
        for (col, planned) in summary.columns.iter().zip(&layout.columns) {
            assert_eq!(col.payload_offset, planned.payload_offset);
            assert_eq!(col.mask_offset, planned.mask_offset);
        }
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"row_count\":10"));
    }

    #[test]
    fn test_row_count_overflow() {
        let bytes = encode(&mixed_table(2)).unwrap();
        let mut header = FileHeader::read(&bytes).unwrap();
        header.row_count = u64::MAX / 2;
        let mut bad = bytes.clone();
        header.write(&mut bad);
        let err = decode(bad).unwrap_err();
        assert!(matches!(err, BintableError::RowCountOverflow { .. }), "{err}");
    }
}
