//! # Errors
//!
//! Unified error type for every bintable operation.
//!
//! Encode-side variants (`InvalidSchema`, `SchemaMismatch`, `RowCountMismatch`)
//! are caller-correctable. Decode-side variants (`BadMagic`, `UnsupportedVersion`,
//! `Truncated`, `CorruptDirectory`, `RowCountOverflow`, `CorruptPayload`) mean
//! the bytes came from a foreign tool or were damaged. Nothing is retried or
//! repaired inside the crate; every error is terminal for the operation.

use std::io;

use thiserror::Error;

/// Unified error type for all bintable operations.
#[derive(Debug, Error)]
pub enum BintableError {
    /// The schema itself is unusable (duplicate names, zero dimensions, overflow...).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A table's columns do not match its own schema.
    #[error("schema mismatch at column {index} ({name}): expected {expected}, found {found}")]
    SchemaMismatch {
        index: usize,
        name: String,
        expected: String,
        found: String,
    },

    /// A column's row count differs from the table's declared row count.
    #[error("row count mismatch at column {index} ({name}): expected {expected} rows, found {found}")]
    RowCountMismatch {
        index: usize,
        name: String,
        expected: usize,
        found: usize,
    },

    /// The header signature is not `BTBL`.
    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: Vec<u8> },

    /// Format version or layout flags newer than this crate understands.
    #[error("unsupported format: {0}")]
    UnsupportedVersion(String),

    /// The buffer ends before the header, directory or declared data does.
    #[error("truncated {section}: need {expected} bytes, buffer has {found}")]
    Truncated {
        section: &'static str,
        expected: u64,
        found: u64,
    },

    /// The column directory is inconsistent with the format or with itself.
    #[error("corrupt directory: {0}")]
    CorruptDirectory(String),

    /// Row count times row width does not fit the host address space.
    #[error("row count {rows} overflows the address space for column {name}")]
    RowCountOverflow { rows: u64, name: String },

    /// Payload bytes are structurally valid but semantically broken (bad UTF-8...).
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// The host table contains a type the adapter cannot express, or vice versa.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Malformed CSV input in the CSV bridge.
    #[error("CSV error: {0}")]
    Csv(String),

    /// Underlying I/O failure (open, mmap, write, rename).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Fieldless discriminant of [`BintableError`], used to record decoder failure states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidSchema,
    SchemaMismatch,
    RowCountMismatch,
    BadMagic,
    UnsupportedVersion,
    Truncated,
    CorruptDirectory,
    RowCountOverflow,
    CorruptPayload,
    UnsupportedType,
    Csv,
    Io,
}

impl BintableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BintableError::InvalidSchema(_) => ErrorKind::InvalidSchema,
            BintableError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            BintableError::RowCountMismatch { .. } => ErrorKind::RowCountMismatch,
            BintableError::BadMagic { .. } => ErrorKind::BadMagic,
            BintableError::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            BintableError::Truncated { .. } => ErrorKind::Truncated,
            BintableError::CorruptDirectory(_) => ErrorKind::CorruptDirectory,
            BintableError::RowCountOverflow { .. } => ErrorKind::RowCountOverflow,
            BintableError::CorruptPayload(_) => ErrorKind::CorruptPayload,
            BintableError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            BintableError::Csv(_) => ErrorKind::Csv,
            BintableError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_schema(msg: impl Into<String>) -> Self {
        BintableError::InvalidSchema(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        BintableError::CorruptDirectory(msg.into())
    }

    pub(crate) fn truncated(section: &'static str, expected: u64, found: usize) -> Self {
        BintableError::Truncated {
            section,
            expected,
            found: found as u64,
        }
    }
}

pub type Result<T> = std::result::Result<T, BintableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = BintableError::truncated("header", 72, 10);
        assert_eq!(err.kind(), ErrorKind::Truncated);
        assert_eq!(
            err.to_string(),
            "truncated header: need 72 bytes, buffer has 10"
        );

        let io_err: BintableError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io_err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_mismatch_message_names_column() {
        let err = BintableError::RowCountMismatch {
            index: 2,
            name: "ra".into(),
            expected: 10,
            found: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains("column 2 (ra)"));
        assert!(msg.contains("expected 10"));
    }
}
