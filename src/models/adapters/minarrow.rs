//! # Minarrow Adapter
//!
//! Bridges `minarrow::Table` and the bintable [`Table`].
//!
//! Supported columns: signed/unsigned integers (8/16-bit behind the
//! `extended_numeric_types` feature), `Float32`/`Float64`, `Boolean` and
//! `String32`. Physical units ride in the field metadata under `"unit"`,
//! and the minarrow table name in the table metadata under `"name"`.
//!
//! Shaped columns, fixed-width byte strings and binary columns have no
//! minarrow counterpart and fail with `UnsupportedType`.

use std::sync::Arc;

use minarrow::{
    Array, ArrowType, Bitmask, BooleanArray, Buffer, Field, FieldArray, FloatArray, IntegerArray,
    NumericArray, StringArray, Table as MinarrowTable, TextArray, Vec64,
};
use serde_json::Value;

use crate::constants::UNIT_METADATA_KEY;
use crate::error::{BintableError, Result};
use crate::models::column::{Column, ColumnBuilder};
use crate::models::schema::{ColumnDescriptor, Schema};
use crate::models::table::{Table, TableMeta};
use crate::models::types::kind::ColumnKind;
use crate::traits::native_type::NativeType;
use crate::traits::table_source::{FromTable, TableSource};

/// Table metadata key carrying the minarrow table name.
const TABLE_NAME_KEY: &str = "name";

fn unsupported(col: &FieldArray) -> BintableError {
    BintableError::UnsupportedType(format!(
        "column '{}' has minarrow type {:?}",
        col.field.name, col.field.dtype
    ))
}

/// Column kind of a minarrow array, if bintable can hold it.
fn kind_of(array: &Array) -> Option<ColumnKind> {
    let kind = match array {
        Array::NumericArray(num) => match num {
            #[cfg(feature = "extended_numeric_types")]
            NumericArray::Int8(_) => ColumnKind::Int8,
            #[cfg(feature = "extended_numeric_types")]
            NumericArray::Int16(_) => ColumnKind::Int16,
            NumericArray::Int32(_) => ColumnKind::Int32,
            NumericArray::Int64(_) => ColumnKind::Int64,
            #[cfg(feature = "extended_numeric_types")]
            NumericArray::UInt8(_) => ColumnKind::UInt8,
            #[cfg(feature = "extended_numeric_types")]
            NumericArray::UInt16(_) => ColumnKind::UInt16,
            NumericArray::UInt32(_) => ColumnKind::UInt32,
            NumericArray::UInt64(_) => ColumnKind::UInt64,
            NumericArray::Float32(_) => ColumnKind::Float32,
            NumericArray::Float64(_) => ColumnKind::Float64,
            _ => return None,
        },
        Array::BooleanArray(_) => ColumnKind::Bool,
        Array::TextArray(TextArray::String32(_)) => ColumnKind::VarString,
        _ => return None,
    };
    Some(kind)
}

/// Push `values` row by row, consulting the Arrow validity mask (1 = present).
fn fill_numeric<T: NativeType>(
    values: &[T],
    mask: Option<&Bitmask>,
    n_rows: usize,
    builder: &mut ColumnBuilder,
) -> Result<()> {
    for (row, v) in values.iter().take(n_rows).enumerate() {
        match mask {
            Some(m) if !m.get(row) => builder.push_null()?,
            _ => builder.push(*v)?,
        }
    }
    Ok(())
}

impl TableSource for MinarrowTable {
    fn schema(&self) -> Result<Schema> {
        let mut columns = Vec::with_capacity(self.cols.len());
        for col in &self.cols {
            let kind = kind_of(&col.array).ok_or_else(|| unsupported(col))?;
            let mut desc = ColumnDescriptor::new(col.field.name.clone(), kind)
                .nullable(col.field.nullable || col.null_count > 0);
            if let Some(unit) = col.field.metadata.get(UNIT_METADATA_KEY) {
                desc = desc.with_unit(unit.clone());
            }
            columns.push(desc);
        }
        Schema::new(columns)
    }

    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn fill_column(&self, index: usize, builder: &mut ColumnBuilder) -> Result<()> {
        let col = self
            .cols
            .get(index)
            .ok_or_else(|| BintableError::invalid_schema(format!("no column {index}")))?;
        let n = self.n_rows;
        match &col.array {
            Array::NumericArray(num) => match num {
                #[cfg(feature = "extended_numeric_types")]
                NumericArray::Int8(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                #[cfg(feature = "extended_numeric_types")]
                NumericArray::Int16(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                NumericArray::Int32(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                NumericArray::Int64(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                #[cfg(feature = "extended_numeric_types")]
                NumericArray::UInt8(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                #[cfg(feature = "extended_numeric_types")]
                NumericArray::UInt16(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                NumericArray::UInt32(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                NumericArray::UInt64(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                NumericArray::Float32(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                NumericArray::Float64(a) => fill_numeric(a.data.as_slice(), a.null_mask.as_ref(), n, builder),
                _ => Err(unsupported(col)),
            },
            Array::BooleanArray(a) => {
                for row in 0..n {
                    match &a.null_mask {
                        Some(m) if !m.get(row) => builder.push_null()?,
                        _ => builder.push_bool(a.data.get(row))?,
                    }
                }
                Ok(())
            }
            Array::TextArray(TextArray::String32(a)) => {
                let offsets: &[u32] = a.offsets.as_slice();
                let data: &[u8] = a.data.as_slice();
                for row in 0..n {
                    if let Some(m) = &a.null_mask {
                        if !m.get(row) {
                            builder.push_null()?;
                            continue;
                        }
                    }
                    let value = offsets
                        .get(row..row + 2)
                        .and_then(|w| data.get(w[0] as usize..w[1] as usize))
                        .ok_or_else(|| {
                            BintableError::CorruptPayload(format!(
                                "column '{}' row {row}: string offsets out of range",
                                col.field.name
                            ))
                        })?;
                    builder.push_bytes(value)?;
                }
                Ok(())
            }
            _ => Err(unsupported(col)),
        }
    }

    fn table_meta(&self) -> TableMeta {
        let mut meta = TableMeta::new();
        if !self.name.is_empty() {
            meta.insert(TABLE_NAME_KEY.to_string(), Value::String(self.name.clone()));
        }
        meta
    }
}

fn validity_mask(col: &Column) -> Option<Bitmask> {
    col.validity()
        .map(|bm| Bitmask::from_bools(&bm.iter().collect::<Vec<bool>>()))
}

macro_rules! numeric_array {
    ($col:expr, $t:ty, $variant:ident, $array:ident) => {{
        let values: Vec<$t> = $col.to_vec::<$t>().unwrap_or_default();
        Array::NumericArray(NumericArray::$variant(Arc::new($array {
            data: Buffer::from(Vec64::from_slice(&values)),
            null_mask: validity_mask($col),
        })))
    }};
}

fn to_array(desc: &ColumnDescriptor, col: &Column) -> Result<(ArrowType, Array)> {
    if !desc.shape.is_empty() {
        return Err(BintableError::UnsupportedType(format!(
            "column '{}' has per-row shape {:?}; minarrow columns are scalar",
            desc.name, desc.shape
        )));
    }
    let out = match desc.kind {
        #[cfg(feature = "extended_numeric_types")]
        ColumnKind::Int8 => (ArrowType::Int8, numeric_array!(col, i8, Int8, IntegerArray)),
        #[cfg(feature = "extended_numeric_types")]
        ColumnKind::Int16 => (ArrowType::Int16, numeric_array!(col, i16, Int16, IntegerArray)),
        ColumnKind::Int32 => (ArrowType::Int32, numeric_array!(col, i32, Int32, IntegerArray)),
        ColumnKind::Int64 => (ArrowType::Int64, numeric_array!(col, i64, Int64, IntegerArray)),
        #[cfg(feature = "extended_numeric_types")]
        ColumnKind::UInt8 => (ArrowType::UInt8, numeric_array!(col, u8, UInt8, IntegerArray)),
        #[cfg(feature = "extended_numeric_types")]
        ColumnKind::UInt16 => (ArrowType::UInt16, numeric_array!(col, u16, UInt16, IntegerArray)),
        ColumnKind::UInt32 => (ArrowType::UInt32, numeric_array!(col, u32, UInt32, IntegerArray)),
        ColumnKind::UInt64 => (ArrowType::UInt64, numeric_array!(col, u64, UInt64, IntegerArray)),
        ColumnKind::Float32 => (ArrowType::Float32, numeric_array!(col, f32, Float32, FloatArray)),
        ColumnKind::Float64 => (ArrowType::Float64, numeric_array!(col, f64, Float64, FloatArray)),
        ColumnKind::Bool => {
            let values: Vec<bool> = (0..col.len())
                .map(|row| col.bool_value(row).unwrap_or(false))
                .collect();
            let array = BooleanArray::new(Bitmask::from_bools(&values), validity_mask(col));
            (ArrowType::Boolean, Array::BooleanArray(Arc::new(array)))
        }
        ColumnKind::VarString => {
            let mut offsets = Vec::with_capacity(col.len() + 1);
            let mut data = Vec::new();
            offsets.push(0u32);
            for row in 0..col.len() {
                if let Some(s) = col.str_value(row) {
                    data.extend_from_slice(s.as_bytes());
                }
                let end = u32::try_from(data.len()).map_err(|_| {
                    BintableError::UnsupportedType(format!(
                        "column '{}' holds more than 4 GiB of text; String32 offsets overflow",
                        desc.name
                    ))
                })?;
                offsets.push(end);
            }
            let array = StringArray::new(
                Buffer::from(Vec64::from_slice(&data)),
                validity_mask(col),
                Buffer::from(Vec64::from_slice(&offsets)),
            );
            (ArrowType::String, Array::TextArray(TextArray::String32(Arc::new(array))))
        }
        other => {
            return Err(BintableError::UnsupportedType(format!(
                "column '{}' of kind {other} has no minarrow counterpart",
                desc.name
            )))
        }
    };
    Ok(out)
}

impl FromTable for MinarrowTable {
    fn from_table(table: &Table) -> Result<Self> {
        let mut cols = Vec::with_capacity(table.n_cols());
        for (desc, col) in table.schema().columns().iter().zip(table.columns()) {
            let (dtype, array) = to_array(desc, col)?;
            let field = Field {
                name: desc.name.clone(),
                dtype,
                nullable: desc.nullable,
                metadata: desc
                    .unit
                    .iter()
                    .map(|u| (UNIT_METADATA_KEY.to_string(), u.clone()))
                    .collect(),
            };
            cols.push(FieldArray::new(field, array));
        }
        let name = table
            .meta()
            .get(TABLE_NAME_KEY)
            .and_then(Value::as_str)
            .unwrap_or("bintable")
            .to_string();
        Ok(MinarrowTable {
            name,
            cols,
            n_rows: table.n_rows(),
        })
    }
}
