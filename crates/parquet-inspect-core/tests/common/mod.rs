#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use parquet::basic::{Compression, LogicalType, Repetition, TimeUnit, Type as PhysicalType};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, Int64Type};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::{WriterProperties, WriterVersion};
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::Type;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub const BASE_TS: i64 = 1_700_000_000_000;

/// Column order of [`write_sample`].
pub const ID: i64 = 0;
pub const PRICE: i64 = 1;
pub const NAME: i64 = 2;
pub const TS: i64 = 3;
pub const FLAG: i64 = 4;

pub fn price_of(i: i64) -> i64 {
    12_345 + i
}

/// Every fourth name is null.
pub fn name_of(i: i64) -> Option<String> {
    (i % 4 != 0).then(|| format!("n{i}"))
}

fn schema() -> TestResult<Type> {
    let id = Type::primitive_type_builder("id", PhysicalType::INT64)
        .with_repetition(Repetition::REQUIRED)
        .build()?;
    let price = Type::primitive_type_builder("price", PhysicalType::INT64)
        .with_repetition(Repetition::REQUIRED)
        .with_logical_type(Some(LogicalType::Decimal {
            scale: 2,
            precision: 10,
        }))
        .with_precision(10)
        .with_scale(2)
        .build()?;
    let name = Type::primitive_type_builder("name", PhysicalType::BYTE_ARRAY)
        .with_repetition(Repetition::OPTIONAL)
        .with_logical_type(Some(LogicalType::String))
        .build()?;
    let ts = Type::primitive_type_builder("ts", PhysicalType::INT64)
        .with_repetition(Repetition::REQUIRED)
        .with_logical_type(Some(LogicalType::Timestamp {
            is_adjusted_to_u_t_c: true,
            unit: TimeUnit::MILLIS,
        }))
        .build()?;
    let flag = Type::primitive_type_builder("flag", PhysicalType::BOOLEAN)
        .with_repetition(Repetition::REQUIRED)
        .build()?;

    Ok(Type::group_type_builder("schema")
        .with_fields(vec![
            Arc::new(id),
            Arc::new(price),
            Arc::new(name),
            Arc::new(ts),
            Arc::new(flag),
        ])
        .build()?)
}

/// Small pages so every chunk spans several of them.
pub fn small_pages(compression: Compression, version: WriterVersion) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(compression)
        .set_writer_version(version)
        .set_write_batch_size(3)
        .set_data_page_row_count_limit(3)
        .set_key_value_metadata(Some(vec![KeyValue::new(
            "origin".to_string(),
            "tests".to_string(),
        )]))
        .build()
}

/// Write `rows` rows split into row groups of `rows_per_group`.
pub fn write_sample(
    path: &Path,
    rows: i64,
    rows_per_group: i64,
    props: WriterProperties,
) -> TestResult {
    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, Arc::new(schema()?), Arc::new(props))?;

    let mut start = 0;
    while start < rows {
        let end = (start + rows_per_group).min(rows);
        let range = start..end;
        let mut rg = writer.next_row_group()?;

        let mut col = rg.next_column()?.ok_or("missing id column")?;
        let ids: Vec<i64> = range.clone().collect();
        col.typed::<Int64Type>().write_batch(&ids, None, None)?;
        col.close()?;

        let mut col = rg.next_column()?.ok_or("missing price column")?;
        let prices: Vec<i64> = range.clone().map(price_of).collect();
        col.typed::<Int64Type>().write_batch(&prices, None, None)?;
        col.close()?;

        let mut col = rg.next_column()?.ok_or("missing name column")?;
        let names: Vec<ByteArray> = range
            .clone()
            .filter_map(name_of)
            .map(|n| ByteArray::from(n.as_str()))
            .collect();
        let defs: Vec<i16> = range.clone().map(|i| i16::from(name_of(i).is_some())).collect();
        col.typed::<ByteArrayType>()
            .write_batch(&names, Some(&defs), None)?;
        col.close()?;

        let mut col = rg.next_column()?.ok_or("missing ts column")?;
        let ts: Vec<i64> = range.clone().map(|i| BASE_TS + i * 1_000).collect();
        col.typed::<Int64Type>().write_batch(&ts, None, None)?;
        col.close()?;

        let mut col = rg.next_column()?.ok_or("missing flag column")?;
        let flags: Vec<bool> = range.clone().map(|i| i % 2 == 0).collect();
        col.typed::<BoolType>().write_batch(&flags, None, None)?;
        col.close()?;

        rg.close()?;
        start = end;
    }

    writer.close()?;
    Ok(())
}
