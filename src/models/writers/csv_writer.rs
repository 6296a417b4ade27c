//! # CSV Writer
//!
//! File output for [`minarrow::Table`] as CSV, replacing the destination
//! atomically like the bintable writer does.

use std::path::Path;

use minarrow::Table;

use crate::error::Result;
use crate::models::encoders::csv::{encode_table_csv, CsvEncodeOptions};
use crate::models::writers::table_writer::write_atomic;

/// Serialise `table` as CSV and atomically replace `path` with it.
pub async fn write_csv_file<P: AsRef<Path>>(
    path: P,
    table: &Table,
    options: &CsvEncodeOptions,
) -> Result<()> {
    let mut out = Vec::new();
    encode_table_csv(table, &mut out, options)?;
    write_atomic(path.as_ref(), &out).await?;
    log::info!(
        "wrote {} rows x {} columns of CSV to {}",
        table.n_rows,
        table.cols.len(),
        path.as_ref().display()
    );
    Ok(())
}
