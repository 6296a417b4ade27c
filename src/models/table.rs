//! # Table
//!
//! Schema plus columns matching it 1:1 by position, a fixed row count and
//! free-form table metadata (`meta`), e.g. survey name or epoch.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{BintableError, Result};
use crate::models::column::{Column, ColumnBuilder};
use crate::models::schema::Schema;
use crate::traits::table_source::TableSource;

/// Table-level metadata, kept sorted so encoded output is deterministic.
pub type TableMeta = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
pub struct Table {
    schema: Schema,
    columns: Vec<Column>,
    n_rows: usize,
    meta: TableMeta,
}

impl Table {
    /// Assemble without checking that the columns match the schema.
    ///
    /// The encoder re-checks every table and reports `SchemaMismatch` or
    /// `RowCountMismatch`, so this is safe to use for tables of unknown origin.
    pub fn from_parts(schema: Schema, columns: Vec<Column>, n_rows: usize) -> Self {
        Self {
            schema,
            columns,
            n_rows,
            meta: TableMeta::new(),
        }
    }

    /// Assemble and validate.
    pub fn try_new(schema: Schema, columns: Vec<Column>, n_rows: usize) -> Result<Self> {
        let table = Self::from_parts(schema, columns, n_rows);
        table.validate()?;
        Ok(table)
    }

    /// Build a table by pulling every column out of an adapter.
    pub fn from_source<S: TableSource + ?Sized>(source: &S) -> Result<Self> {
        let schema = source.schema()?;
        let n_rows = source.n_rows();
        let mut columns = Vec::with_capacity(schema.len());
        for (index, descriptor) in schema.columns().iter().enumerate() {
            let mut builder = ColumnBuilder::new(index, descriptor, n_rows);
            source.fill_column(index, &mut builder)?;
            columns.push(builder.finish());
        }
        let table = Self::try_new(schema, columns, n_rows)?;
        Ok(table.with_meta(source.table_meta()))
    }

    pub fn with_meta(mut self, meta: TableMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Check column count, per-column kind/shape/nullability and row counts.
    pub fn validate(&self) -> Result<()> {
        let descriptors = self.schema.columns();
        if descriptors.len() != self.columns.len() {
            let index = descriptors.len().min(self.columns.len());
            let name = descriptors
                .get(index)
                .map_or_else(|| "<extra>".to_string(), |d| d.name.clone());
            return Err(BintableError::SchemaMismatch {
                index,
                name,
                expected: format!("{} columns", descriptors.len()),
                found: format!("{} columns", self.columns.len()),
            });
        }
        for (index, (desc, col)) in descriptors.iter().zip(&self.columns).enumerate() {
            if desc.kind != col.kind()
                || desc.shape != col.shape()
                || desc.nullable != col.is_nullable()
            {
                let nullable = if col.is_nullable() { ", nullable" } else { "" };
                return Err(BintableError::SchemaMismatch {
                    index,
                    name: desc.name.clone(),
                    expected: desc.structure(),
                    found: format!("{}{:?}{}", col.kind(), col.shape(), nullable),
                });
            }
            let mask_len = col.validity().map_or(self.n_rows, |bm| bm.len());
            for found in [col.len(), mask_len] {
                if found != self.n_rows {
                    return Err(BintableError::RowCountMismatch {
                        index,
                        name: desc.name.clone(),
                        expected: self.n_rows,
                        found,
                    });
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.schema.index_of(name).and_then(|i| self.columns.get(i))
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn meta(&self) -> &TableMeta {
        &self.meta
    }

    #[inline]
    pub fn meta_mut(&mut self) -> &mut TableMeta {
        &mut self.meta
    }

    /// New table with only `names`, in that order. Column views are shared, not copied.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut descriptors = Vec::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let index = self.schema.index_of(name).ok_or_else(|| {
                BintableError::SchemaMismatch {
                    index: position,
                    name: name.to_string(),
                    expected: "a column of this table".into(),
                    found: "no such column".into(),
                }
            })?;
            descriptors.push(self.schema.columns()[index].clone());
            columns.push(self.columns[index].clone());
        }
        let schema = Schema::new(descriptors)?;
        Ok(Table::from_parts(schema, columns, self.n_rows).with_meta(self.meta.clone()))
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.n_rows == other.n_rows
            && self.columns == other.columns
            && self.meta == other.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::ColumnDescriptor;
    use crate::models::types::kind::ColumnKind;

    fn int_column(desc: &ColumnDescriptor, values: &[i64]) -> Column {
        let mut b = ColumnBuilder::new(0, desc, values.len());
        for v in values {
            b.push(*v).unwrap();
        }
        b.finish()
    }

    #[test]
    fn test_try_new_checks_row_counts() {
        let a = ColumnDescriptor::new("a", ColumnKind::Int64);
        let b = ColumnDescriptor::new("b", ColumnKind::Int64);
        let schema = Schema::new(vec![a.clone(), b.clone()]).unwrap();
        let err = Table::try_new(
            schema,
            vec![int_column(&a, &[1, 2, 3]), int_column(&b, &[1, 2])],
            3,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BintableError::RowCountMismatch { index: 1, expected: 3, found: 2, .. }
        ));
    }

    #[test]
    fn test_try_new_checks_kinds_and_count() {
        let a = ColumnDescriptor::new("a", ColumnKind::Int64);
        let schema = Schema::new(vec![a.clone()]).unwrap();
        let wrong = ColumnDescriptor::new("a", ColumnKind::Float32);
        let mut b = ColumnBuilder::new(0, &wrong, 1);
        b.push(1.0f32).unwrap();
        let err = Table::try_new(schema.clone(), vec![b.finish()], 1).unwrap_err();
        assert!(matches!(err, BintableError::SchemaMismatch { index: 0, .. }));

        let err = Table::try_new(schema, vec![], 0).unwrap_err();
        assert!(matches!(err, BintableError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_select_reorders_and_shares() {
        let a = ColumnDescriptor::new("a", ColumnKind::Int64);
        let b = ColumnDescriptor::new("b", ColumnKind::Int64).with_unit("s");
        let schema = Schema::new(vec![a.clone(), b.clone()]).unwrap();
        let table = Table::try_new(
            schema,
            vec![int_column(&a, &[1, 2]), int_column(&b, &[3, 4])],
            2,
        )
        .unwrap();
        let picked = table.select(&["b", "a"]).unwrap();
        assert_eq!(picked.schema().names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(picked.schema().columns()[0].unit.as_deref(), Some("s"));
        let original = table.column(1).unwrap().fixed_bytes().unwrap();
        let selected = picked.column(0).unwrap().fixed_bytes().unwrap();
        assert!(selected.shares_owner(original));

        assert!(table.select(&["zzz"]).is_err());
    }
}
