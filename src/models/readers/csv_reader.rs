//! CSV file input for the CLI and callers without their own reader.
//!
//! See [`CsvDecodeOptions`] for configuration.

use std::io::Cursor;
use std::path::Path;

use minarrow::Table;

use crate::error::Result;
use crate::models::decoders::csv::{decode_csv, CsvDecodeOptions};

/// Read a whole CSV file and decode it into a Minarrow Table.
pub async fn read_csv_file<P: AsRef<Path>>(path: P, options: &CsvDecodeOptions) -> Result<Table> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    log::debug!("loaded {} bytes of CSV from {}", bytes.len(), path.as_ref().display());
    decode_csv(Cursor::new(bytes), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BintableError;

    #[tokio::test]
    async fn test_read_csv_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), "a,b\n1,x\n2,y\n").await.unwrap();
        let table = read_csv_file(file.path(), &CsvDecodeOptions::default())
            .await
            .unwrap();
        assert_eq!(table.n_rows, 2);
        assert_eq!(table.cols[1].field.name, "b");
    }

    #[tokio::test]
    async fn test_missing_csv_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_csv_file(dir.path().join("absent.csv"), &CsvDecodeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BintableError::Io(_)));
    }
}
