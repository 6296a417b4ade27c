//! CSV Encoder for Minarrow Tables.
//! - Handles Int/UInt of every width, Float32, Float64, Boolean and String32.
//! - Supports custom delimiter, header row, quoting, and null representation.
//! - Serialises to any `Write`.
//!
//! With the default null representation (the empty field), empty strings are
//! written as `""` so they read back as empty strings rather than nulls.

use std::io::Write;

use minarrow::{Array, Bitmask, FieldArray, NumericArray, Table, TextArray};

use crate::error::{BintableError, Result};

/// Options for CSV encoding.
#[derive(Debug, Clone)]
pub struct CsvEncodeOptions {
    /// Delimiter (e.g., b',' for CSV, b'\t' for TSV).
    pub delimiter: u8,
    /// Whether to write a header row.
    pub write_header: bool,
    /// String written for nulls.
    pub null_repr: String,
    /// Quote character (default: '"').
    pub quote: u8,
}

impl Default for CsvEncodeOptions {
    fn default() -> Self {
        CsvEncodeOptions {
            delimiter: b',',
            write_header: true,
            null_repr: String::new(),
            quote: b'"',
        }
    }
}

impl CsvEncodeOptions {
    fn needs_quotes(&self, s: &str) -> bool {
        (s.is_empty() && self.null_repr.is_empty())
            || s == self.null_repr
            || s.bytes().any(|b| b == self.delimiter || b == self.quote || b == b'\n' || b == b'\r')
            || s.starts_with(' ')
            || s.ends_with(' ')
    }

    fn write_text<W: Write>(&self, writer: &mut W, s: &str) -> Result<()> {
        if !self.needs_quotes(s) {
            writer.write_all(s.as_bytes())?;
            return Ok(());
        }
        let mut out = Vec::with_capacity(s.len() + 2);
        out.push(self.quote);
        for &b in s.as_bytes() {
            if b == self.quote {
                out.push(self.quote);
            }
            out.push(b);
        }
        out.push(self.quote);
        writer.write_all(&out)?;
        Ok(())
    }
}

fn null_mask(col: &FieldArray) -> Result<Option<&Bitmask>> {
    let mask = match &col.array {
        Array::NumericArray(arr) => arr.null_mask(),
        Array::BooleanArray(arr) => arr.null_mask.as_ref(),
        Array::TextArray(TextArray::String32(arr)) => arr.null_mask.as_ref(),
        _ => return Err(unsupported(col)),
    };
    Ok(mask)
}

fn unsupported(col: &FieldArray) -> BintableError {
    BintableError::UnsupportedType(format!(
        "column '{}' of type {:?} cannot be written as CSV",
        col.field.name, col.field.dtype
    ))
}

macro_rules! write_value {
    ($writer:expr, $arr:expr, $row:expr) => {
        write!($writer, "{}", $arr.data.as_slice()[$row])?
    };
}

fn write_cell<W: Write>(
    writer: &mut W,
    col: &FieldArray,
    row: usize,
    options: &CsvEncodeOptions,
) -> Result<()> {
    match &col.array {
        Array::NumericArray(n) => match n {
            #[cfg(feature = "extended_numeric_types")]
            NumericArray::Int8(a) => write_value!(writer, a, row),
            #[cfg(feature = "extended_numeric_types")]
            NumericArray::Int16(a) => write_value!(writer, a, row),
            NumericArray::Int32(a) => write_value!(writer, a, row),
            NumericArray::Int64(a) => write_value!(writer, a, row),
            #[cfg(feature = "extended_numeric_types")]
            NumericArray::UInt8(a) => write_value!(writer, a, row),
            #[cfg(feature = "extended_numeric_types")]
            NumericArray::UInt16(a) => write_value!(writer, a, row),
            NumericArray::UInt32(a) => write_value!(writer, a, row),
            NumericArray::UInt64(a) => write_value!(writer, a, row),
            NumericArray::Float32(a) => write_value!(writer, a, row),
            NumericArray::Float64(a) => write_value!(writer, a, row),
            _ => return Err(unsupported(col)),
        },
        Array::BooleanArray(a) => {
            let text: &[u8] = if a.data.get(row) { b"true" } else { b"false" };
            writer.write_all(text)?
        }
        Array::TextArray(TextArray::String32(a)) => {
            let offsets: &[u32] = a.offsets.as_slice();
            let raw = offsets
                .get(row..row + 2)
                .and_then(|w| a.data.as_slice().get(w[0] as usize..w[1] as usize))
                .ok_or_else(|| {
                    BintableError::CorruptPayload(format!(
                        "column '{}' row {row}: string offsets out of range",
                        col.field.name
                    ))
                })?;
            options.write_text(writer, &String::from_utf8_lossy(raw))?;
        }
        _ => return Err(unsupported(col)),
    }
    Ok(())
}

/// Serialise a Minarrow Table to `writer` as CSV.
///
/// Fails with `UnsupportedType` before writing anything if a column has no
/// CSV rendering, and with `Io` on any writer error.
pub fn encode_table_csv<W: Write>(
    table: &Table,
    mut writer: W,
    options: &CsvEncodeOptions,
) -> Result<()> {
    let masks = table
        .cols
        .iter()
        .map(null_mask)
        .collect::<Result<Vec<_>>>()?;

    log::debug!("encoding CSV: {} rows x {} columns", table.n_rows, table.cols.len());

    if options.write_header {
        for (i, col) in table.cols.iter().enumerate() {
            if i > 0 {
                writer.write_all(&[options.delimiter])?;
            }
            options.write_text(&mut writer, &col.field.name)?;
        }
        writer.write_all(b"\n")?;
    }

    for row in 0..table.n_rows {
        for (i, (col, mask)) in table.cols.iter().zip(&masks).enumerate() {
            if i > 0 {
                writer.write_all(&[options.delimiter])?;
            }
            if mask.is_some_and(|m| !m.get(row)) {
                writer.write_all(options.null_repr.as_bytes())?;
            } else {
                write_cell(&mut writer, col, row, options)?;
            }
        }
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
