//! # Test Helpers - *Table Generators*
//!
//! Deterministic fixtures shared by the unit tests. Row contents are a pure
//! function of the row index, so two calls with the same `n` build equal
//! tables.

use serde_json::json;

use crate::models::column::ColumnBuilder;
use crate::models::schema::{ColumnDescriptor, Schema};
use crate::models::table::{Table, TableMeta};
use crate::models::types::kind::ColumnKind;

/// Four columns covering the main placement cases:
///
/// - `flag`: `Bool`, no mask
/// - `ra`: nullable `Float64` with unit `deg`, every third row absent
/// - `name`: nullable `VarString`, every fourth row absent, every fifth empty
/// - `img`: `Int16` with a `[3, 4]` shape per row
pub(crate) fn mixed_table(n: usize) -> Table {
    let descriptors = vec![
        ColumnDescriptor::new("flag", ColumnKind::Bool),
        ColumnDescriptor::new("ra", ColumnKind::Float64)
            .nullable(true)
            .with_unit("deg"),
        ColumnDescriptor::new("name", ColumnKind::VarString).nullable(true),
        ColumnDescriptor::new("img", ColumnKind::Int16).with_shape(vec![3, 4]),
    ];

    let mut flag = ColumnBuilder::new(0, &descriptors[0], n);
    let mut ra = ColumnBuilder::new(1, &descriptors[1], n);
    let mut name = ColumnBuilder::new(2, &descriptors[2], n);
    let mut img = ColumnBuilder::new(3, &descriptors[3], n);
    for i in 0..n {
        flag.push_bool(i % 2 == 0).unwrap();
        if i % 3 == 1 {
            ra.push_null().unwrap();
        } else {
            ra.push(i as f64 * 0.25 - 10.0).unwrap();
        }
        if i % 4 == 3 {
            name.push_null().unwrap();
        } else if i % 5 == 0 {
            name.push_str("").unwrap();
        } else {
            name.push_str(&format!("star-{i}")).unwrap();
        }
        let pixels: Vec<i16> = (0..12).map(|k| ((i * 12 + k) as i16).wrapping_sub(50)).collect();
        img.push_values(&pixels).unwrap();
    }

    let columns = vec![flag.finish(), ra.finish(), name.finish(), img.finish()];
    Table::try_new(Schema::new(descriptors).unwrap(), columns, n).unwrap()
}

/// Single nullable `VarString` column named `s`.
pub(crate) fn string_table(rows: &[Option<&str>]) -> Table {
    let desc = ColumnDescriptor::new("s", ColumnKind::VarString).nullable(true);
    let mut b = ColumnBuilder::new(0, &desc, rows.len());
    for row in rows {
        match row {
            Some(s) => b.push_str(s).unwrap(),
            None => b.push_null().unwrap(),
        }
    }
    Table::try_new(Schema::new(vec![desc]).unwrap(), vec![b.finish()], rows.len()).unwrap()
}

/// One column of every kind, with table metadata.
pub(crate) fn all_kinds_table(n: usize) -> Table {
    let descriptors = vec![
        ColumnDescriptor::new("i8", ColumnKind::Int8),
        ColumnDescriptor::new("i16", ColumnKind::Int16),
        ColumnDescriptor::new("i32", ColumnKind::Int32).nullable(true),
        ColumnDescriptor::new("i64", ColumnKind::Int64),
        ColumnDescriptor::new("u8", ColumnKind::UInt8),
        ColumnDescriptor::new("u16", ColumnKind::UInt16),
        ColumnDescriptor::new("u32", ColumnKind::UInt32),
        ColumnDescriptor::new("u64", ColumnKind::UInt64).nullable(true),
        ColumnDescriptor::new("f32", ColumnKind::Float32).with_unit("mag"),
        ColumnDescriptor::new("f64", ColumnKind::Float64),
        ColumnDescriptor::new("ok", ColumnKind::Bool).nullable(true),
        ColumnDescriptor::new("id", ColumnKind::FixedBytes(4)),
        ColumnDescriptor::new("s", ColumnKind::VarString),
        ColumnDescriptor::new("blob", ColumnKind::VarBytes).nullable(true),
    ];
    let mut b: Vec<ColumnBuilder> = descriptors
        .iter()
        .enumerate()
        .map(|(i, d)| ColumnBuilder::new(i, d, n))
        .collect();

    for i in 0..n {
        let v = i as i64 - 3;
        b[0].push(v as i8).unwrap();
        b[1].push((v as i16).wrapping_mul(300)).unwrap();
        if i % 2 == 0 {
            b[2].push_null().unwrap();
        } else {
            b[2].push((v as i32).wrapping_mul(70_000)).unwrap();
        }
        b[3].push(v.wrapping_mul(5_000_000_000)).unwrap();
        b[4].push(i as u8).unwrap();
        b[5].push((i as u16).wrapping_mul(1000)).unwrap();
        b[6].push((i as u32).wrapping_mul(100_000)).unwrap();
        if i % 3 == 0 {
            b[7].push_null().unwrap();
        } else {
            b[7].push(u64::MAX - i as u64).unwrap();
        }
        b[8].push(i as f32 / 3.0).unwrap();
        b[9].push(-(i as f64) * 1.5e300).unwrap();
        if i % 4 == 2 {
            b[10].push_null().unwrap();
        } else {
            b[10].push_bool(i % 3 == 0).unwrap();
        }
        b[11].push_fixed_bytes(&(i as u32).to_be_bytes()).unwrap();
        b[12].push_str(&"x".repeat(i % 7)).unwrap();
        if i % 5 == 4 {
            b[13].push_null().unwrap();
        } else {
            b[13].push_bytes(&[i as u8, 0, 0xFF]).unwrap();
        }
    }

    let columns = b.into_iter().map(ColumnBuilder::finish).collect();
    let mut meta = TableMeta::new();
    meta.insert("survey".into(), json!("fixture"));
    meta.insert("epoch".into(), json!(2016.0));
    Table::try_new(Schema::new(descriptors).unwrap(), columns, n)
        .unwrap()
        .with_meta(meta)
}
