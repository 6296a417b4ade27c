//! # Schema
//!
//! Ordered, immutable list of column descriptors. All structural validation
//! happens in [`Schema::new`], so a `Schema` value is always plannable apart
//! from size overflow, which depends on the row count.

use std::collections::HashSet;
use std::sync::Arc;

use crate::constants::{MAX_NAME_LEN, MAX_RANK};
use crate::error::{BintableError, Result};
use crate::models::types::kind::ColumnKind;

/// Name, kind and per-row shape of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    /// Per-row dimensions; empty for scalars.
    pub shape: Vec<u32>,
    pub nullable: bool,
    /// Physical unit string, e.g. `"deg"` or `"km / s"`.
    pub unit: Option<String>,
}

impl ColumnDescriptor {
    /// Scalar, non-nullable column without a unit.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            shape: Vec::new(),
            nullable: false,
            unit: None,
        }
    }

    pub fn with_shape(mut self, shape: impl Into<Vec<u32>>) -> Self {
        self.shape = shape.into();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Elements per row, i.e. the product of the shape (1 for scalars).
    pub fn elements_per_row(&self) -> Option<u64> {
        self.shape
            .iter()
            .try_fold(1u64, |acc, d| acc.checked_mul(*d as u64))
    }

    /// Fixed bytes per row (`elements_per_row * size_of`), or the entry width
    /// for heap-backed kinds.
    pub fn row_width(&self) -> Option<u64> {
        match self.kind.size_of() {
            Some(size) => self.elements_per_row()?.checked_mul(size as u64),
            None => Some(crate::constants::VAR_ENTRY_LEN as u64),
        }
    }

    /// Same structure (kind, shape, nullability), ignoring name and unit.
    pub fn structure(&self) -> String {
        let nullable = if self.nullable { ", nullable" } else { "" };
        format!("{}{:?}{}", self.kind, self.shape, nullable)
    }

    fn validate(&self, index: usize) -> Result<()> {
        let name = &self.name;
        if name.is_empty() {
            return Err(BintableError::invalid_schema(format!(
                "column {index} has an empty name"
            )));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(BintableError::invalid_schema(format!(
                "column {index} name '{name}' is {} bytes, limit is {MAX_NAME_LEN}",
                name.len()
            )));
        }
        if self.shape.len() > MAX_RANK {
            return Err(BintableError::invalid_schema(format!(
                "column '{name}' has rank {}, limit is {MAX_RANK}",
                self.shape.len()
            )));
        }
        if let Some(axis) = self.shape.iter().position(|d| *d == 0) {
            return Err(BintableError::invalid_schema(format!(
                "column '{name}' declares a zero-length dimension at axis {axis}"
            )));
        }
        if self.kind.is_variable() && !self.shape.is_empty() {
            return Err(BintableError::invalid_schema(format!(
                "column '{name}' is {} and cannot have a shape",
                self.kind
            )));
        }
        if self.kind == ColumnKind::FixedBytes(0) {
            return Err(BintableError::invalid_schema(format!(
                "column '{name}' has zero-width fixed bytes"
            )));
        }
        Ok(())
    }
}

/// Validated, ordered column descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Arc<[ColumnDescriptor]>,
}

impl Schema {
    /// Build a schema, rejecting duplicate or oversized names, zero-length
    /// dimensions and shapes on heap-backed kinds.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            column.validate(index)?;
            if !seen.insert(column.name.as_str()) {
                return Err(BintableError::invalid_schema(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        if u32::try_from(columns.len()).is_err() {
            return Err(BintableError::invalid_schema("too many columns"));
        }
        Ok(Self {
            columns: columns.into(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[inline]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    #[inline]
    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_schema() {
        let schema = Schema::new(vec![
            ColumnDescriptor::new("id", ColumnKind::Int64),
            ColumnDescriptor::new("flux", ColumnKind::Float32)
                .with_shape(vec![3, 4])
                .nullable(true)
                .with_unit("Jy"),
            ColumnDescriptor::new("name", ColumnKind::VarString).nullable(true),
        ])
        .unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.index_of("name"), Some(2));
        assert_eq!(schema.columns()[1].elements_per_row(), Some(12));
        assert_eq!(schema.columns()[1].row_width(), Some(48));
        assert_eq!(schema.columns()[2].row_width(), Some(12));
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "flux", "name"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Schema::new(vec![
            ColumnDescriptor::new("a", ColumnKind::Int8),
            ColumnDescriptor::new("a", ColumnKind::Int16),
        ])
        .unwrap_err();
        assert!(matches!(err, BintableError::InvalidSchema(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let err = Schema::new(vec![
            ColumnDescriptor::new("m", ColumnKind::Float64).with_shape(vec![3, 0]),
        ])
        .unwrap_err();
        assert!(matches!(err, BintableError::InvalidSchema(_)));
    }

    #[test]
    fn test_structural_limits() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(Schema::new(vec![ColumnDescriptor::new(long, ColumnKind::Int8)]).is_err());
        assert!(Schema::new(vec![ColumnDescriptor::new("", ColumnKind::Int8)]).is_err());
        assert!(Schema::new(vec![
            ColumnDescriptor::new("r", ColumnKind::Int8).with_shape(vec![1, 1, 1, 1, 1])
        ])
        .is_err());
        assert!(Schema::new(vec![
            ColumnDescriptor::new("s", ColumnKind::VarString).with_shape(vec![2])
        ])
        .is_err());
        assert!(Schema::new(vec![ColumnDescriptor::new("b", ColumnKind::FixedBytes(0))]).is_err());
    }

    #[test]
    fn test_empty_schema_is_valid() {
        let schema = Schema::new(Vec::new()).unwrap();
        assert!(schema.is_empty());
    }
}
