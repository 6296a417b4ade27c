//! File readers, the atomic writer, and the minarrow/CSV bridge end to end.

use std::sync::Arc;

use bintable::models::decoders::csv::{decode_csv, CsvDecodeOptions};
use bintable::models::encoders::csv::{encode_table_csv, CsvEncodeOptions};
use bintable::models::readers::csv_reader::read_csv_file;
use bintable::models::writers::csv_writer::write_csv_file;
use bintable::{
    read_table_from_file, write_table_to_file, BintableError, ByteOrder, ColumnBuilder,
    ColumnDescriptor, ColumnKind, DecodeOptions, EncodeOptions, FileTableReader, FromTable,
    Schema, Table,
};
use minarrow::{Array, ArrowType, Buffer, Field, FieldArray, FloatArray, NumericArray, Vec64};
use tempfile::tempdir;

fn survey(n: usize) -> Table {
    let descriptors = vec![
        ColumnDescriptor::new("id", ColumnKind::Int64),
        ColumnDescriptor::new("flux", ColumnKind::Float64).nullable(true).with_unit("Jy"),
        ColumnDescriptor::new("field", ColumnKind::VarString),
    ];
    let mut b: Vec<ColumnBuilder> = descriptors
        .iter()
        .enumerate()
        .map(|(i, d)| ColumnBuilder::new(i, d, n))
        .collect();
    for i in 0..n {
        b[0].push(i as i64 - 5).unwrap();
        if i % 7 == 3 {
            b[1].push_null().unwrap();
        } else {
            b[1].push(i as f64 * 1.5e-3).unwrap();
        }
        b[2].push_str(["north", "south", "equatorial"][i % 3]).unwrap();
    }
    let cols = b.into_iter().map(ColumnBuilder::finish).collect();
    Table::try_new(Schema::new(descriptors).unwrap(), cols, n).unwrap()
}

#[tokio::test]
async fn test_write_then_read_owned() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("survey.btbl");
    let table = survey(40);

    write_table_to_file(&path, &table, &EncodeOptions::default()).await.unwrap();
    let decoded = read_table_from_file(&path, &DecodeOptions::default()).await.unwrap();
    assert_eq!(decoded, table);

    let reader = FileTableReader::open(&path).unwrap();
    assert_eq!(reader.inspect().unwrap().row_count, 40);
}

#[cfg(feature = "mmap")]
#[tokio::test]
async fn test_mmap_reader_zero_copy() {
    use bintable::MmapTableReader;

    let dir = tempdir().unwrap();
    let path = dir.path().join("survey.btbl");
    let table = survey(100);
    write_table_to_file(&path, &table, &EncodeOptions::default()).await.unwrap();

    let reader = MmapTableReader::open(&path).unwrap();
    let decoded = reader.read_table().unwrap();
    assert_eq!(decoded, table);

    let ids = decoded.column_by_name("id").unwrap();
    assert!(ids.fixed_bytes().unwrap().is_within(reader.bytes()));
    // the mapping is page aligned, so typed views always succeed
    let view = ids.as_slice::<i64>().unwrap();
    assert_eq!(view[0], -5);
    assert_eq!(view.len(), 100);
}

#[cfg(feature = "mmap")]
#[tokio::test]
async fn test_mmap_reader_foreign_order() {
    use bintable::MmapTableReader;

    let dir = tempdir().unwrap();
    let path = dir.path().join("swapped.btbl");
    let table = survey(12);
    let options = EncodeOptions {
        byte_order: ByteOrder::native().opposite(),
        ..Default::default()
    };
    write_table_to_file(&path, &table, &options).await.unwrap();

    let reader = MmapTableReader::open(&path).unwrap();
    let decoded = reader.read_table().unwrap();
    assert_eq!(decoded, table);
    let ids = decoded.column_by_name("id").unwrap();
    assert!(!ids.fixed_bytes().unwrap().is_within(reader.bytes()));
}

#[tokio::test]
async fn test_atomic_writer_keeps_old_file_on_encode_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("survey.btbl");
    let table = survey(4);
    write_table_to_file(&path, &table, &EncodeOptions::default()).await.unwrap();
    let before = std::fs::read(&path).unwrap();

    let broken = Table::from_parts(table.schema().clone(), table.columns()[..2].to_vec(), 4);
    let err = write_table_to_file(&path, &broken, &EncodeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BintableError::SchemaMismatch { .. }));
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_minarrow_round_trip_keeps_units() {
    let flux = FieldArray::new(
        Field {
            name: "flux".into(),
            dtype: ArrowType::Float64,
            nullable: false,
            metadata: [("unit".to_string(), "Jy".to_string())].into_iter().collect(),
        },
        Array::NumericArray(NumericArray::Float64(Arc::new(FloatArray {
            data: Buffer::from(Vec64::from_slice(&[1.0f64, 2.5, -0.75])),
            null_mask: None,
        }))),
    );
    let host = minarrow::Table {
        name: "fluxes".into(),
        cols: vec![flux],
        n_rows: 3,
    };

    let table = Table::from_source(&host).unwrap();
    assert_eq!(table.schema().column(0).unwrap().unit.as_deref(), Some("Jy"));

    let bytes = bintable::encode(&table).unwrap();
    let back = minarrow::Table::from_table(&bintable::decode(bytes).unwrap()).unwrap();
    assert_eq!(back.name, "fluxes");
    assert_eq!(back.n_rows, 3);
    assert_eq!(back.cols[0].field.metadata.get("unit").map(String::as_str), Some("Jy"));
    match &back.cols[0].array {
        Array::NumericArray(NumericArray::Float64(a)) => {
            assert_eq!(a.data.as_slice(), &[1.0, 2.5, -0.75]);
        }
        other => panic!("unexpected array {other:?}"),
    }
}

#[test]
fn test_shaped_column_has_no_minarrow_form() {
    let desc = ColumnDescriptor::new("psf", ColumnKind::Float32).with_shape(vec![2]);
    let mut b = ColumnBuilder::new(0, &desc, 1);
    b.push_values(&[1.0f32, 2.0]).unwrap();
    let table = Table::try_new(Schema::new(vec![desc]).unwrap(), vec![b.finish()], 1).unwrap();
    let err = minarrow::Table::from_table(&table).unwrap_err();
    assert!(matches!(err, BintableError::UnsupportedType(_)));
}

#[tokio::test]
async fn test_csv_to_bintable_to_csv() {
    let dir = tempdir().unwrap();
    let csv_in = dir.path().join("in.csv");
    let csv_out = dir.path().join("out.csv");
    let btbl = dir.path().join("mid.btbl");
    let source = "id,mag,name,seen\n1,12.5,alpha,true\n2,,\"\",false\n3,-0.5,\"g, h\",\n";
    tokio::fs::write(&csv_in, source).await.unwrap();

    let host = read_csv_file(&csv_in, &CsvDecodeOptions::default()).await.unwrap();
    let table = Table::from_source(&host).unwrap();
    assert_eq!(table.column_by_name("mag").unwrap().null_count(), 1);
    write_table_to_file(&btbl, &table, &EncodeOptions::default()).await.unwrap();

    let decoded = read_table_from_file(&btbl, &DecodeOptions::default()).await.unwrap();
    let back = minarrow::Table::from_table(&decoded).unwrap();
    write_csv_file(&csv_out, &back, &CsvEncodeOptions::default()).await.unwrap();
    assert_eq!(tokio::fs::read_to_string(&csv_out).await.unwrap(), source);
}

#[test]
fn test_csv_projection_via_bintable() {
    let csv = "a,b,c\n1,x,0.5\n2,y,1.5\n";
    let host = decode_csv(csv.as_bytes(), &CsvDecodeOptions::default()).unwrap();
    let table = Table::from_source(&host).unwrap();
    let bytes = bintable::encode(&table).unwrap();
    let picked =
        bintable::decode_with(bytes, &DecodeOptions::with_columns(["c", "a"])).unwrap();

    let mut out = Vec::new();
    let host = minarrow::Table::from_table(&picked).unwrap();
    encode_table_csv(&host, &mut out, &CsvEncodeOptions::default()).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "c,a\n0.5,1\n1.5,2\n");
}
