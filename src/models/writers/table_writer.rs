//! # Table Writer
//!
//! Async file output for encoded tables.
//!
//! Writes go to a sibling temporary file which is synced and then renamed
//! over the destination, so readers never observe a half-written table. On
//! any failure the temporary is removed and the destination is untouched.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::encoders::table::{encode_with, EncodeOptions};
use crate::models::table::Table;

/// Encode `table` and atomically replace `path` with the result.
pub async fn write_table_to_file<P: AsRef<Path>>(
    path: P,
    table: &Table,
    options: &EncodeOptions,
) -> Result<()> {
    let bytes = encode_with(table, options)?;
    write_atomic(path.as_ref(), &bytes).await?;
    log::info!(
        "wrote {} rows x {} columns ({} bytes) to {}",
        table.n_rows(),
        table.n_cols(),
        bytes.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Write `bytes` to a temporary next to `path`, then rename it into place.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    if let Err(e) = write_synced(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// `dir/name.btbl` -> `dir/.name.btbl.<pid>.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or(OsStr::new("bintable")));
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
