//! Trailing JSON block: table metadata plus per-column units.
//!
//! ```json
//! {"meta": {"survey": "gaia"}, "units": {"ra": "deg"}}
//! ```
//!
//! Keys are sorted (`BTreeMap`), so equal tables give equal bytes. A table
//! with neither metadata nor units writes an empty block.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BintableError, Result};
use crate::models::schema::Schema;
use crate::models::table::TableMeta;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataBlock {
    #[serde(default)]
    pub meta: TableMeta,
    #[serde(default)]
    pub units: BTreeMap<String, String>,
}

impl MetadataBlock {
    pub fn collect(schema: &Schema, meta: &TableMeta) -> Self {
        let units = schema
            .columns()
            .iter()
            .filter_map(|c| c.unit.as_ref().map(|u| (c.name.clone(), u.clone())))
            .collect();
        Self {
            meta: meta.clone(),
            units,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty() && self.units.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::to_vec(self).map_err(|e| {
            BintableError::invalid_schema(format!("table metadata is not serialisable: {e}"))
        })
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(raw)
            .map_err(|e| BintableError::CorruptPayload(format!("metadata block: {e}")))
    }
}
