//! # Columns
//!
//! A [`Column`] is either a contiguous run of fixed-width elements or a table
//! of `(heap_offset, length)` entries indexing into a values region. Both
//! forms sit on [`SharedBytes`], so a decoded column is a view over the file
//! buffer and a built column owns its bytes, with one API for both.
//!
//! Columns are assembled with [`ColumnBuilder`], which enforces the
//! descriptor's kind, shape and nullability row by row.

use zerocopy::FromBytes;

use crate::constants::VAR_ENTRY_LEN;
use crate::error::{BintableError, Result};
use crate::models::bitmap::Bitmap;
use crate::models::buffer::SharedBytes;
use crate::models::schema::ColumnDescriptor;
use crate::models::types::kind::ColumnKind;
use crate::traits::native_type::NativeType;

/// Backing storage of a column.
#[derive(Debug, Clone)]
pub enum ColumnData {
    /// `len * row_width` bytes, native byte order, row-major.
    Fixed(SharedBytes),

    /// `len * 12` bytes of native-order `(u64 offset, u32 length)` entries,
    /// plus the region those offsets point into.
    Variable {
        entries: SharedBytes,
        values: SharedBytes,
    },
}

#[derive(Debug, Clone)]
pub struct Column {
    kind: ColumnKind,
    shape: Vec<u32>,
    len: usize,
    validity: Option<Bitmap>,
    data: ColumnData,
}

impl Column {
    /// Assemble a column without checking sizes; callers have validated them.
    pub(crate) fn from_parts(
        kind: ColumnKind,
        shape: Vec<u32>,
        len: usize,
        validity: Option<Bitmap>,
        data: ColumnData,
    ) -> Self {
        Self {
            kind,
            shape,
            len,
            validity,
            data,
        }
    }

    #[inline]
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    #[inline]
    pub fn shape(&self) -> &[u32] {
        &self.shape
    }

    /// Row count.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.validity.is_some()
    }

    #[inline]
    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    #[inline]
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Whether row `row` holds a value; always true for non-nullable columns.
    pub fn is_valid(&self, row: usize) -> bool {
        self.validity.as_ref().map_or(true, |bm| bm.get(row))
    }

    pub fn null_count(&self) -> usize {
        self.validity.as_ref().map_or(0, Bitmap::null_count)
    }

    /// Elements per row (product of the shape).
    pub fn elements_per_row(&self) -> usize {
        self.shape.iter().map(|d| *d as usize).product()
    }

    /// Raw payload of a fixed-width column.
    pub fn fixed_bytes(&self) -> Option<&SharedBytes> {
        match &self.data {
            ColumnData::Fixed(bytes) => Some(bytes),
            ColumnData::Variable { .. } => None,
        }
    }

    /// Typed zero-copy view over all elements.
    ///
    /// `None` if `T` does not match the column kind, or the payload is not
    /// aligned for `T` in memory. Use [`to_vec`](Self::to_vec) or
    /// [`value`](Self::value) for alignment-independent access.
    pub fn as_slice<T: NativeType>(&self) -> Option<&[T]> {
        if T::KIND != self.kind {
            return None;
        }
        let bytes = self.fixed_bytes()?;
        <[T]>::ref_from_bytes(bytes.as_slice()).ok()
    }

    /// Element `index` (row-major across rows and shape) read by value.
    pub fn value<T: NativeType>(&self, index: usize) -> Option<T> {
        if T::KIND != self.kind {
            return None;
        }
        let size = std::mem::size_of::<T>();
        let bytes = self.fixed_bytes()?;
        let start = index.checked_mul(size)?;
        let chunk = bytes.get(start..start.checked_add(size)?)?;
        T::read_from_bytes(chunk).ok()
    }

    /// All elements copied out, regardless of alignment.
    pub fn to_vec<T: NativeType>(&self) -> Option<Vec<T>> {
        if T::KIND != self.kind {
            return None;
        }
        if let Some(slice) = self.as_slice::<T>() {
            return Some(slice.to_vec());
        }
        let bytes = self.fixed_bytes()?;
        bytes
            .chunks_exact(std::mem::size_of::<T>())
            .map(|chunk| T::read_from_bytes(chunk).ok())
            .collect()
    }

    /// Value of a scalar `Bool` column at `row`.
    pub fn bool_value(&self, row: usize) -> Option<bool> {
        if self.kind != ColumnKind::Bool {
            return None;
        }
        self.fixed_bytes()?.get(row).map(|b| *b != 0)
    }

    /// `(heap_offset, length)` entry of a variable column at `row`.
    pub fn var_entry(&self, row: usize) -> Option<(u64, u32)> {
        let ColumnData::Variable { entries, .. } = &self.data else {
            return None;
        };
        let start = row.checked_mul(VAR_ENTRY_LEN)?;
        let raw = entries.get(start..start.checked_add(VAR_ENTRY_LEN)?)?;
        let offset = u64::from_ne_bytes(raw[..8].try_into().ok()?);
        let length = u32::from_ne_bytes(raw[8..].try_into().ok()?);
        Some((offset, length))
    }

    /// Bytes of `row`: the row's slice of a fixed column, or its heap entry.
    pub fn row_bytes(&self, row: usize) -> Option<&[u8]> {
        if row >= self.len {
            return None;
        }
        match &self.data {
            ColumnData::Fixed(bytes) => {
                let width = self.kind.size_of()?.checked_mul(self.elements_per_row())?;
                let start = row.checked_mul(width)?;
                bytes.get(start..start.checked_add(width)?)
            }
            ColumnData::Variable { values, .. } => {
                let (offset, length) = self.var_entry(row)?;
                let start = usize::try_from(offset).ok()?;
                values.get(start..start.checked_add(length as usize)?)
            }
        }
    }

    /// Text of a `VarString` row. `None` for absent rows, other kinds, or invalid UTF-8.
    pub fn str_value(&self, row: usize) -> Option<&str> {
        if self.kind != ColumnKind::VarString || !self.is_valid(row) {
            return None;
        }
        std::str::from_utf8(self.row_bytes(row)?).ok()
    }

    /// Bytes of a variable-length row. `None` for absent rows or fixed kinds.
    pub fn bytes_value(&self, row: usize) -> Option<&[u8]> {
        if !self.kind.is_variable() || !self.is_valid(row) {
            return None;
        }
        self.row_bytes(row)
    }

    /// Heap bytes the encoder writes for this column: the lengths of all
    /// present rows. Zero for fixed columns.
    pub(crate) fn heap_bytes(&self) -> Option<u64> {
        if !self.kind.is_variable() {
            return Some(0);
        }
        (0..self.len).try_fold(0u64, |acc, row| {
            let (_, length) = self.var_entry(row)?;
            if self.is_valid(row) {
                acc.checked_add(length as u64)
            } else {
                Some(acc)
            }
        })
    }
}

impl PartialEq for Column {
    /// Logical equality: kind, shape, row count, null pattern and row contents.
    /// Where the bytes live (view or owned) does not matter.
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind
            || self.shape != other.shape
            || self.len != other.len
            || self.is_nullable() != other.is_nullable()
        {
            return false;
        }
        (0..self.len).all(|row| {
            self.is_valid(row) == other.is_valid(row)
                && self.row_bytes(row) == other.row_bytes(row)
        })
    }
}

/// Row-by-row column construction against a descriptor.
#[derive(Debug)]
pub struct ColumnBuilder {
    index: usize,
    descriptor: ColumnDescriptor,
    elements_per_row: usize,
    rows: usize,
    data: Vec<u8>,
    entries: Vec<u8>,
    values: Vec<u8>,
    validity: Vec<bool>,
}

impl ColumnBuilder {
    /// `index` is the column's position in its schema; it only labels errors.
    pub fn new(index: usize, descriptor: &ColumnDescriptor, capacity: usize) -> Self {
        let elements_per_row = descriptor.shape.iter().map(|d| *d as usize).product();
        let (data, entries) = match descriptor.kind.size_of() {
            Some(size) => (
                Vec::with_capacity(capacity * elements_per_row * size),
                Vec::new(),
            ),
            None => (Vec::new(), Vec::with_capacity(capacity * VAR_ENTRY_LEN)),
        };
        Self {
            index,
            descriptor: descriptor.clone(),
            elements_per_row,
            rows: 0,
            data,
            entries,
            values: Vec::new(),
            validity: Vec::with_capacity(if descriptor.nullable { capacity } else { 0 }),
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }

    /// Rows pushed so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    fn mismatch(&self, found: impl Into<String>) -> BintableError {
        BintableError::SchemaMismatch {
            index: self.index,
            name: self.descriptor.name.clone(),
            expected: self.descriptor.structure(),
            found: found.into(),
        }
    }

    fn mark_present(&mut self) {
        self.rows += 1;
        if self.descriptor.nullable {
            self.validity.push(true);
        }
    }

    /// Push one row of `elements_per_row` numeric values.
    pub fn push_values<T: NativeType>(&mut self, row: &[T]) -> Result<()> {
        if T::KIND != self.descriptor.kind {
            return Err(self.mismatch(format!("{} values", T::KIND)));
        }
        if row.len() != self.elements_per_row {
            return Err(self.mismatch(format!("row of {} elements", row.len())));
        }
        for v in row {
            self.data.extend_from_slice(v.as_bytes());
        }
        self.mark_present();
        Ok(())
    }

    /// Push one scalar numeric value.
    pub fn push<T: NativeType>(&mut self, value: T) -> Result<()> {
        self.push_values(std::slice::from_ref(&value))
    }

    /// Push one row of booleans (a single value for scalar columns).
    pub fn push_bools(&mut self, row: &[bool]) -> Result<()> {
        if self.descriptor.kind != ColumnKind::Bool {
            return Err(self.mismatch("bool values"));
        }
        if row.len() != self.elements_per_row {
            return Err(self.mismatch(format!("row of {} elements", row.len())));
        }
        self.data.extend(row.iter().map(|b| *b as u8));
        self.mark_present();
        Ok(())
    }

    pub fn push_bool(&mut self, value: bool) -> Result<()> {
        self.push_bools(&[value])
    }

    /// Push one row of a `FixedBytes(w)` column: `w * elements_per_row` bytes.
    pub fn push_fixed_bytes(&mut self, row: &[u8]) -> Result<()> {
        let ColumnKind::FixedBytes(width) = self.descriptor.kind else {
            return Err(self.mismatch("fixed bytes"));
        };
        if row.len() != width as usize * self.elements_per_row {
            return Err(self.mismatch(format!("{} bytes", row.len())));
        }
        self.data.extend_from_slice(row);
        self.mark_present();
        Ok(())
    }

    /// Push a text row into a `VarString` or `VarBytes` column.
    pub fn push_str(&mut self, value: &str) -> Result<()> {
        if !self.descriptor.kind.is_variable() {
            return Err(self.mismatch("text"));
        }
        self.push_var(value.as_bytes())
    }

    /// Push a binary row into a `VarBytes` column.
    pub fn push_bytes(&mut self, value: &[u8]) -> Result<()> {
        match self.descriptor.kind {
            ColumnKind::VarBytes => self.push_var(value),
            ColumnKind::VarString => match std::str::from_utf8(value) {
                Ok(s) => self.push_var(s.as_bytes()),
                Err(_) => Err(self.mismatch("non UTF-8 bytes")),
            },
            _ => Err(self.mismatch("variable-length bytes")),
        }
    }

    fn push_var(&mut self, value: &[u8]) -> Result<()> {
        let length = u32::try_from(value.len()).map_err(|_| {
            BintableError::UnsupportedType(format!(
                "row {} of column '{}' is {} bytes, limit is {}",
                self.rows,
                self.descriptor.name,
                value.len(),
                u32::MAX
            ))
        })?;
        self.entries
            .extend_from_slice(&(self.values.len() as u64).to_ne_bytes());
        self.entries.extend_from_slice(&length.to_ne_bytes());
        self.values.extend_from_slice(value);
        self.mark_present();
        Ok(())
    }

    /// Push an absent row. Fixed columns get zeroed elements, variable columns
    /// a zero-length entry.
    pub fn push_null(&mut self) -> Result<()> {
        if !self.descriptor.nullable {
            return Err(self.mismatch("null in non-nullable column"));
        }
        match self.descriptor.kind.size_of() {
            Some(size) => {
                let width = size * self.elements_per_row;
                self.data.resize(self.data.len() + width, 0);
            }
            None => {
                self.entries
                    .extend_from_slice(&(self.values.len() as u64).to_ne_bytes());
                self.entries.extend_from_slice(&0u32.to_ne_bytes());
            }
        }
        self.rows += 1;
        self.validity.push(false);
        Ok(())
    }

    pub fn finish(self) -> Column {
        let validity = self
            .descriptor
            .nullable
            .then(|| Bitmap::from_bools(&self.validity));
        let data = if self.descriptor.kind.is_variable() {
            ColumnData::Variable {
                entries: SharedBytes::from(self.entries),
                values: SharedBytes::from(self.values),
            }
        } else {
            ColumnData::Fixed(SharedBytes::from(self.data))
        };
        Column::from_parts(
            self.descriptor.kind,
            self.descriptor.shape,
            self.rows,
            validity,
            data,
        )
    }
}
