use crate::error::Result;
use crate::models::column::ColumnBuilder;
use crate::models::schema::Schema;
use crate::models::table::{Table, TableMeta};

/// Read-only view of a host table that the codec can ingest.
///
/// Implementors describe their columns as a [`Schema`] and stream each
/// column's rows, including nulls, into a [`ColumnBuilder`]. The core never
/// depends on the host table library; adapters implement this trait on
/// the host type instead.
pub trait TableSource {
    /// Column descriptors in host order.
    fn schema(&self) -> Result<Schema>;

    /// Row count shared by every column.
    fn n_rows(&self) -> usize;

    /// Push every row of column `index`, in order, into `builder`.
    fn fill_column(&self, index: usize, builder: &mut ColumnBuilder) -> Result<()>;

    /// Table-level metadata, if the host has any.
    fn table_meta(&self) -> TableMeta {
        TableMeta::new()
    }
}

/// Construction of a host table from a decoded [`Table`].
pub trait FromTable: Sized {
    fn from_table(table: &Table) -> Result<Self>;
}
