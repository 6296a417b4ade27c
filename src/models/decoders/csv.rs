//! CSV Decoder for Minarrow Tables.
//! - Accepts any `BufRead` (file, byte slice).
//! - Infers column types or follows a provided field list.
//! - Types: Int32, Int64, UInt32, UInt64, Float32, Float64, Boolean, String32,
//!   plus the 8/16-bit integers under `extended_numeric_types`.
//! - Custom delimiter, null tokens and quote character.
//!
//! Quoted fields are taken literally: `""` is an empty string, never a null,
//! and surrounding whitespace inside quotes is kept. Unquoted fields are
//! trimmed and matched against the null tokens.

use std::io::BufRead;
use std::sync::Arc;

use minarrow::{
    Array, ArrowType, Bitmask, BooleanArray, Buffer, Field, FieldArray, FloatArray, IntegerArray,
    NumericArray, StringArray, Table, TextArray, Vec64,
};

use crate::error::{BintableError, Result};

/// Options for CSV decoding.
#[derive(Debug, Clone)]
pub struct CsvDecodeOptions {
    /// Delimiter (e.g., b',' for CSV, b'\t' for TSV).
    pub delimiter: u8,
    /// Unquoted tokens read as null (compared case-insensitively).
    pub nulls: Vec<String>,
    /// Quote character (default: '"').
    pub quote: u8,
    /// Whether the first record holds column names.
    pub has_header: bool,
    /// Column fields. If None, types are inferred.
    pub schema: Option<Vec<Field>>,
    /// Load every column as String32.
    pub all_as_text: bool,
    /// Name of the resulting table.
    pub table_name: String,
}

impl Default for CsvDecodeOptions {
    fn default() -> Self {
        CsvDecodeOptions {
            delimiter: b',',
            nulls: vec!["".into(), "NA".into(), "null".into()],
            quote: b'"',
            has_header: true,
            schema: None,
            all_as_text: false,
            table_name: "csv".into(),
        }
    }
}

/// One parsed cell.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cell {
    text: String,
    quoted: bool,
}

impl Cell {
    fn value<'a>(&'a self, nulls: &[String]) -> Option<&'a str> {
        if self.quoted {
            return Some(&self.text);
        }
        let v = self.text.trim();
        if nulls.iter().any(|n| n.eq_ignore_ascii_case(v)) {
            None
        } else {
            Some(v)
        }
    }
}

/// Decode CSV from `reader` into a Minarrow Table.
///
/// Fails with [`BintableError::Csv`] on ragged rows, unterminated quotes, a
/// header/schema width mismatch, or a value that does not parse as its
/// column type.
pub fn decode_csv<R: BufRead>(mut reader: R, options: &CsvDecodeOptions) -> Result<Table> {
    let mut names: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut width: Option<usize> = options.schema.as_ref().map(Vec::len);
    let mut line_no = 0usize;
    let mut buf = Vec::new();

    while read_record(&mut reader, options.quote, &mut buf, &mut line_no)? {
        // Blank lines are only data in single-column files, and never before the first record.
        if buf.is_empty() && (width != Some(1) || (names.is_none() && rows.is_empty())) {
            continue;
        }
        let cells = split_record(&buf, options.delimiter, options.quote);
        match width {
            Some(w) if cells.len() != w => {
                return Err(BintableError::Csv(format!(
                    "line {line_no}: expected {w} fields, found {}",
                    cells.len()
                )))
            }
            None => width = Some(cells.len()),
            _ => {}
        }
        if options.has_header && names.is_none() {
            names = Some(cells.into_iter().map(|c| c.text.trim().to_string()).collect());
        } else {
            rows.push(cells);
        }
    }

    let width = width.unwrap_or(0);
    let names = names.unwrap_or_else(|| (0..width).map(|i| format!("col{}", i + 1)).collect());
    let n_rows = rows.len();

    let fields: Vec<Field> = match &options.schema {
        Some(fields) => fields.clone(),
        None => names
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let dtype = if options.all_as_text {
                    ArrowType::String
                } else {
                    infer_type(rows.iter().map(|r| &r[col]), &options.nulls)
                };
                Field {
                    name: name.clone(),
                    dtype,
                    nullable: false,
                    metadata: Default::default(),
                }
            })
            .collect(),
    };

    let mut cols = Vec::with_capacity(fields.len());
    for (col, mut field) in fields.into_iter().enumerate() {
        let values: Vec<Option<&str>> = rows.iter().map(|r| r[col].value(&options.nulls)).collect();
        let array = parse_column(&field, &values)?;
        field.nullable |= values.iter().any(Option::is_none);
        cols.push(FieldArray::new(field, array));
    }

    log::debug!("decoded CSV: {} rows x {} columns", n_rows, cols.len());
    Ok(Table {
        name: options.table_name.clone(),
        cols,
        n_rows,
    })
}

/// Read one logical record into `buf`, joining lines while a quote is open.
/// Returns false at end of input.
fn read_record<R: BufRead>(
    reader: &mut R,
    quote: u8,
    buf: &mut Vec<u8>,
    line_no: &mut usize,
) -> Result<bool> {
    buf.clear();
    let start_line = *line_no + 1;
    loop {
        let n = reader.read_until(b'\n', buf)?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(false);
            }
            return Err(BintableError::Csv(format!(
                "line {start_line}: unterminated quoted field"
            )));
        }
        *line_no += 1;
        if buf.iter().filter(|&&b| b == quote).count() % 2 == 0 {
            break;
        }
    }
    if buf.ends_with(b"\n") {
        buf.pop();
    }
    if buf.ends_with(b"\r") {
        buf.pop();
    }
    Ok(true)
}

/// Split a record into cells. A doubled quote inside quotes is a literal quote.
fn split_record(line: &[u8], delimiter: u8, quote: u8) -> Vec<Cell> {
    let mut cells = Vec::new();
    let mut field = Vec::with_capacity(32);
    let mut in_quotes = false;
    let mut quoted = false;
    let mut i = 0;
    while i < line.len() {
        let b = line[i];
        if in_quotes {
            if b == quote {
                if line.get(i + 1) == Some(&quote) {
                    field.push(quote);
                    i += 1;
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(b);
            }
        } else if b == quote {
            in_quotes = true;
            quoted = true;
        } else if b == delimiter {
            cells.push(Cell {
                text: String::from_utf8_lossy(&field).into_owned(),
                quoted,
            });
            field.clear();
            quoted = false;
        } else {
            field.push(b);
        }
        i += 1;
    }
    cells.push(Cell {
        text: String::from_utf8_lossy(&field).into_owned(),
        quoted,
    });
    cells
}

/// Narrowest of Boolean, Int64, UInt64, Float64 that holds every non-null
/// value, else String. A column with no values at all is String.
fn infer_type<'a, I>(cells: I, nulls: &[String]) -> ArrowType
where
    I: Iterator<Item = &'a Cell>,
{
    let mut seen = false;
    let mut is_bool = true;
    let mut is_i64 = true;
    let mut is_u64 = true;
    let mut is_f64 = true;
    for cell in cells {
        let Some(v) = cell.value(nulls) else { continue };
        if cell.quoted {
            return ArrowType::String;
        }
        seen = true;
        is_bool &= parse_bool(v).is_some();
        is_i64 &= v.parse::<i64>().is_ok();
        is_u64 &= v.parse::<u64>().is_ok();
        is_f64 &= v.parse::<f64>().is_ok();
    }
    if !seen {
        ArrowType::String
    } else if is_bool {
        ArrowType::Boolean
    } else if is_i64 {
        ArrowType::Int64
    } else if is_u64 {
        ArrowType::UInt64
    } else if is_f64 {
        ArrowType::Float64
    } else {
        ArrowType::String
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "t" => Some(true),
        "false" | "f" => Some(false),
        _ => None,
    }
}

/// Validity mask (1 = present), or None when nothing is null.
fn validity(values: &[Option<&str>]) -> Option<Bitmask> {
    if values.iter().all(Option::is_some) {
        return None;
    }
    let present: Vec<bool> = values.iter().map(Option::is_some).collect();
    Some(Bitmask::from_bools(&present))
}

fn parse_values<T: std::str::FromStr + Default>(
    field: &Field,
    values: &[Option<&str>],
) -> Result<Vec<T>> {
    values
        .iter()
        .enumerate()
        .map(|(row, v)| match v {
            None => Ok(T::default()),
            Some(s) => s.parse::<T>().map_err(|_| {
                BintableError::Csv(format!(
                    "column '{}' row {row}: cannot parse {s:?} as {:?}",
                    field.name, field.dtype
                ))
            }),
        })
        .collect()
}

macro_rules! numeric_column {
    ($field:expr, $values:expr, $t:ty, $variant:ident, $array:ident) => {{
        let parsed = parse_values::<$t>($field, $values)?;
        Array::NumericArray(NumericArray::$variant(Arc::new($array {
            data: Buffer::from(Vec64::from_slice(&parsed)),
            null_mask: validity($values),
        })))
    }};
}

fn parse_column(field: &Field, values: &[Option<&str>]) -> Result<Array> {
    let array = match &field.dtype {
        #[cfg(feature = "extended_numeric_types")]
        ArrowType::Int8 => numeric_column!(field, values, i8, Int8, IntegerArray),
        #[cfg(feature = "extended_numeric_types")]
        ArrowType::Int16 => numeric_column!(field, values, i16, Int16, IntegerArray),
        ArrowType::Int32 => numeric_column!(field, values, i32, Int32, IntegerArray),
        ArrowType::Int64 => numeric_column!(field, values, i64, Int64, IntegerArray),
        #[cfg(feature = "extended_numeric_types")]
        ArrowType::UInt8 => numeric_column!(field, values, u8, UInt8, IntegerArray),
        #[cfg(feature = "extended_numeric_types")]
        ArrowType::UInt16 => numeric_column!(field, values, u16, UInt16, IntegerArray),
        ArrowType::UInt32 => numeric_column!(field, values, u32, UInt32, IntegerArray),
        ArrowType::UInt64 => numeric_column!(field, values, u64, UInt64, IntegerArray),
        ArrowType::Float32 => numeric_column!(field, values, f32, Float32, FloatArray),
        ArrowType::Float64 => numeric_column!(field, values, f64, Float64, FloatArray),
        ArrowType::Boolean => {
            let mut bits = Vec::with_capacity(values.len());
            for (row, v) in values.iter().enumerate() {
                let b = match v {
                    None => false,
                    Some(s) => parse_bool(s).ok_or_else(|| {
                        BintableError::Csv(format!(
                            "column '{}' row {row}: cannot parse {s:?} as a boolean",
                            field.name
                        ))
                    })?,
                };
                bits.push(b);
            }
            Array::BooleanArray(Arc::new(BooleanArray::new(
                Bitmask::from_bools(&bits),
                validity(values),
            )))
        }
        ArrowType::String => {
            let mut offsets = Vec::with_capacity(values.len() + 1);
            let mut data = Vec::new();
            offsets.push(0u32);
            for v in values {
                data.extend_from_slice(v.unwrap_or_default().as_bytes());
                let end = u32::try_from(data.len()).map_err(|_| {
                    BintableError::Csv(format!(
                        "column '{}' holds more than 4 GiB of text",
                        field.name
                    ))
                })?;
                offsets.push(end);
            }
            Array::TextArray(TextArray::String32(Arc::new(StringArray::new(
                Buffer::from(Vec64::from_slice(&data)),
                validity(values),
                Buffer::from(Vec64::from_slice(&offsets)),
            ))))
        }
        other => {
            return Err(BintableError::UnsupportedType(format!(
                "CSV column '{}' cannot be read as {other:?}",
                field.name
            )))
        }
    };
    Ok(array)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn decode(text: &str) -> Table {
        decode_csv(Cursor::new(text.as_bytes()), &CsvDecodeOptions::default()).unwrap()
    }

    #[test]
    fn test_infers_types_and_nulls() {
        let table = decode("id,ra,ok,name\n1,10.5,true,vega\n2,,false,\n3,-0.25,T,\"\"\n");
        assert_eq!(table.n_rows, 3);
        let dtypes: Vec<ArrowType> = table.cols.iter().map(|c| c.field.dtype.clone()).collect();
        assert_eq!(
            dtypes,
            vec![ArrowType::Int64, ArrowType::Float64, ArrowType::Boolean, ArrowType::String]
        );

        assert!(!table.cols[0].field.nullable);
        assert!(table.cols[1].field.nullable);

        match &table.cols[1].array {
            Array::NumericArray(NumericArray::Float64(a)) => {
                let mask = a.null_mask.as_ref().unwrap();
                assert!(mask.get(0));
                assert!(!mask.get(1));
                assert_eq!(a.data.as_slice()[2], -0.25);
            }
            other => panic!("unexpected array {other:?}"),
        }

        match &table.cols[3].array {
            Array::TextArray(TextArray::String32(a)) => {
                let mask = a.null_mask.as_ref().unwrap();
                // row 1 is an unquoted empty field (null), row 2 a quoted empty string
                assert!(!mask.get(1));
                assert!(mask.get(2));
                assert_eq!(a.offsets.as_slice(), &[0u32, 4, 4, 4]);
            }
            other => panic!("unexpected array {other:?}"),
        }
    }

    #[test]
    fn test_quoted_fields_span_lines() {
        let table = decode("a,b\n\"x, \"\"y\"\"\n z\",7\n");
        assert_eq!(table.n_rows, 1);
        match &table.cols[0].array {
            Array::TextArray(TextArray::String32(a)) => {
                assert_eq!(a.data.as_slice(), "x, \"y\"\n z".as_bytes());
            }
            other => panic!("unexpected array {other:?}"),
        }
    }

    #[test]
    fn test_ragged_row_is_error() {
        let err = decode_csv(Cursor::new(&b"a,b\n1,2\n3\n"[..]), &CsvDecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, BintableError::Csv(ref m) if m.contains("line 3")));
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        let err = decode_csv(Cursor::new(&b"a\n\"open\n"[..]), &CsvDecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, BintableError::Csv(_)));
    }

    #[test]
    fn test_explicit_schema_and_no_header() {
        let opts = CsvDecodeOptions {
            has_header: false,
            schema: Some(vec![Field {
                name: "v".into(),
                dtype: ArrowType::Int32,
                nullable: false,
                metadata: Default::default(),
            }]),
            ..Default::default()
        };
        let table = decode_csv(Cursor::new(&b"5\r\n-6\r\n"[..]), &opts).unwrap();
        match &table.cols[0].array {
            Array::NumericArray(NumericArray::Int32(a)) => {
                assert_eq!(a.data.as_slice(), &[5, -6]);
            }
            other => panic!("unexpected array {other:?}"),
        }

        let bad = decode_csv(Cursor::new(&b"x\n"[..]), &opts).unwrap_err();
        assert!(matches!(bad, BintableError::Csv(_)));
    }

    #[test]
    fn test_header_only_gives_empty_string_columns() {
        let table = decode("a,b\n");
        assert_eq!(table.n_rows, 0);
        assert_eq!(table.cols.len(), 2);
        assert_eq!(table.cols[0].field.dtype, ArrowType::String);
    }
}
