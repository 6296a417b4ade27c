//! Heap-allocated bintable file reader (no mmap).
//!
//! Reads the whole file into one 64-byte aligned buffer and decodes views into
//! it. Useful where mapping is unavailable or the file lives on a filesystem
//! that does not support it.

use std::io::Read;
use std::path::Path;

use minarrow::Vec64;
use tokio::io::AsyncReadExt;

use crate::error::Result;
use crate::models::buffer::SharedBytes;
use crate::models::decoders::table::{decode_with, inspect, DecodeOptions, FileSummary};
use crate::models::table::Table;
use crate::utils::zeroed_aligned;

#[derive(Clone)]
pub struct FileTableReader {
    data: SharedBytes,
}

impl FileTableReader {
    /// Read `path` into memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = std::fs::File::open(path.as_ref())?;
        let mut buf = zeroed(file.metadata()?.len())?;
        file.read_exact(&mut buf)?;
        log::debug!("loaded {} bytes from {}", buf.len(), path.as_ref().display());
        Ok(Self { data: buf.into() })
    }

    /// Async variant of [`open`](Self::open).
    pub async fn open_async<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = tokio::fs::File::open(path.as_ref()).await?;
        let mut buf = zeroed(file.metadata().await?.len())?;
        file.read_exact(&mut buf).await?;
        log::debug!("loaded {} bytes from {}", buf.len(), path.as_ref().display());
        Ok(Self { data: buf.into() })
    }

    /// Wrap bytes already in memory, realigning them if needed.
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Self { data: buf.into() }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn inspect(&self) -> Result<FileSummary> {
        inspect(&self.data)
    }

    pub fn read_table(&self) -> Result<Table> {
        self.read_table_with(&DecodeOptions::default())
    }

    pub fn read_table_with(&self, options: &DecodeOptions) -> Result<Table> {
        decode_with(self.data.clone(), options)
    }
}

fn zeroed(len: u64) -> Result<Vec64<u8>> {
    let len = usize::try_from(len).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::OutOfMemory, "file exceeds the address space")
    })?;
    Ok(zeroed_aligned(len))
}

/// Read and decode a bintable file in one call.
pub async fn read_table_from_file<P: AsRef<Path>>(
    path: P,
    options: &DecodeOptions,
) -> Result<Table> {
    FileTableReader::open_async(path).await?.read_table_with(options)
}
