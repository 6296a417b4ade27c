//! Memory-mapped bintable file reader.
//!
//! # Overview
//! Maps a whole `.btbl` file read-only and decodes it in place. Fixed-width
//! columns, entry tables and the heap of a native-order file come back as
//! views into the mapping, so opening a large table costs the directory
//! parse and UTF-8 validation of its string columns, nothing more.
//!
//! # Zero-Copy
//! The mapping starts at file offset 0 and is page aligned, so every
//! in-file alignment (natural or 64 bytes) holds in memory as well. Files
//! written in the opposite byte order still decode, but their fixed columns
//! are swapped into owned buffers.
//!
//! # Lifetime
//! Decoded tables keep the mapping alive through shared ownership. Dropping
//! the reader does not invalidate tables already produced from it.
//!
//! # Platform:
//! Uses POSIX `mmap(2)`, supported on Unix-like systems only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::models::buffer::{ByteOwner, SharedBytes};
use crate::models::decoders::table::{decode_with, inspect, DecodeOptions, FileSummary};
use crate::models::mmap::MemMap;
use crate::models::table::Table;

/// Zero-copy bintable reader backed by a memory map.
///
/// ```ignore
/// let reader = MmapTableReader::open("survey.btbl")?;
/// let table = reader.read_table_with(&DecodeOptions::with_columns(["ra", "dec"]))?;
/// ```
pub struct MmapTableReader {
    path: PathBuf,
    region: Arc<MemMap>,
}

impl MmapTableReader {
    /// Map `path` read-only. The contents are not validated until a read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let region = Arc::new(MemMap::open(&path)?);
        Ok(Self { path, region })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the mapped file in bytes.
    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Mapped bytes.
    pub fn bytes(&self) -> &[u8] {
        self.region.as_slice()
    }

    /// Header and directory summary without building any column.
    pub fn inspect(&self) -> Result<FileSummary> {
        inspect(self.region.as_slice())
    }

    /// Decode every column.
    pub fn read_table(&self) -> Result<Table> {
        self.read_table_with(&DecodeOptions::default())
    }

    /// Decode with a projection or other options.
    pub fn read_table_with(&self, options: &DecodeOptions) -> Result<Table> {
        let owner: ByteOwner = self.region.clone();
        let table = decode_with(SharedBytes::from_arc(owner), options)?;
        log::debug!(
            "read {} rows x {} columns from {}",
            table.n_rows(),
            table.n_cols(),
            self.path.display()
        );
        Ok(table)
    }
}
