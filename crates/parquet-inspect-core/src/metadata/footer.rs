//! Loading the file footer.
//!
//! The footer is parsed once with the `parquet` crate's
//! [`SerializedFileReader`] and converted into this crate's own records, so
//! the rest of the engine never depends on the parquet crate's types.

use std::fs::File;
use std::path::Path;

use bytes::Bytes;
use parquet::basic::{
    Compression, ConvertedType as PqConvertedType, LogicalType as PqLogicalType,
    Repetition as PqRepetition, TimeUnit as PqTimeUnit, Type as PqPhysicalType,
};
use parquet::file::metadata::ParquetMetaData;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::statistics::Statistics;
use parquet::schema::types::Type;
use snafu::prelude::*;

use crate::error::{FooterSnafu, InspectResult, OpenFileSnafu};
use crate::metadata::{
    Codec, ColumnChunk, ConvertedType, FileMetadata, KeyValueEntry, LogicalType, PhysicalType,
    RawStatistics, Repetition, RowGroup, SchemaElement, TimeUnit,
};

/// Read and convert the footer of the file at `path`.
pub fn load_from_path(path: &Path) -> InspectResult<FileMetadata> {
    let file = File::open(path).context(OpenFileSnafu {
        path: path.display().to_string(),
    })?;
    let reader = SerializedFileReader::new(file).context(FooterSnafu)?;
    Ok(convert(reader.metadata()))
}

/// Read and convert the footer of an in-memory file.
pub fn load_from_bytes(data: Bytes) -> InspectResult<FileMetadata> {
    let reader = SerializedFileReader::new(data).context(FooterSnafu)?;
    Ok(convert(reader.metadata()))
}

/// Convert parquet crate metadata into [`FileMetadata`].
pub fn convert(meta: &ParquetMetaData) -> FileMetadata {
    let file_meta = meta.file_metadata();
    let descr = file_meta.schema_descr();

    let mut schema = Vec::new();
    flatten_schema(descr.root_schema(), &mut schema);

    let row_groups = meta
        .row_groups()
        .iter()
        .enumerate()
        .map(|(ordinal, rg)| RowGroup {
            ordinal,
            num_rows: rg.num_rows(),
            total_byte_size: rg.total_byte_size(),
            total_compressed_size: rg.compressed_size(),
            columns: rg
                .columns()
                .iter()
                .map(|col| {
                    let col_descr = col.column_descr();
                    ColumnChunk {
                        path_in_schema: col.column_path().parts().to_vec(),
                        physical_type: physical_type(col.column_type()),
                        codec: codec(col.compression()),
                        num_values: col.num_values(),
                        dictionary_page_offset: col.dictionary_page_offset(),
                        data_page_offset: col.data_page_offset(),
                        total_compressed_size: col.compressed_size(),
                        total_uncompressed_size: col.uncompressed_size(),
                        statistics: col.statistics().map(statistics),
                        max_def_level: col_descr.max_def_level(),
                        max_rep_level: col_descr.max_rep_level(),
                    }
                })
                .collect(),
        })
        .collect();

    let key_value_metadata = file_meta
        .key_value_metadata()
        .map(|kvs| {
            kvs.iter()
                .map(|kv| KeyValueEntry {
                    key: kv.key.clone(),
                    value: kv.value.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    FileMetadata {
        version: file_meta.version(),
        num_rows: file_meta.num_rows(),
        created_by: file_meta.created_by().map(str::to_string),
        key_value_metadata,
        schema,
        row_groups,
    }
}

/// Depth-first pre-order flattening, the order the footer stores it in.
fn flatten_schema(ty: &Type, out: &mut Vec<SchemaElement>) {
    let info = ty.get_basic_info();
    let repetition = info.has_repetition().then(|| repetition(info.repetition()));
    let converted_type = converted_type(info.converted_type());
    let logical_type = info.logical_type_ref().and_then(logical_type);

    match ty {
        Type::PrimitiveType {
            physical_type: physical,
            type_length,
            scale,
            precision,
            ..
        } => {
            let physical = physical_type(*physical);
            out.push(SchemaElement {
                name: info.name().to_string(),
                physical_type: Some(physical),
                type_length: (physical == PhysicalType::FixedLenByteArray && *type_length >= 0)
                    .then_some(*type_length),
                repetition,
                logical_type,
                converted_type,
                precision: (*precision >= 0).then_some(*precision),
                scale: (*scale >= 0).then_some(*scale),
                num_children: 0,
            });
        }
        Type::GroupType { fields, .. } => {
            out.push(SchemaElement {
                name: info.name().to_string(),
                physical_type: None,
                type_length: None,
                repetition,
                logical_type,
                converted_type,
                precision: None,
                scale: None,
                num_children: fields.len(),
            });
            for field in fields {
                flatten_schema(field, out);
            }
        }
    }
}

fn statistics(stats: &Statistics) -> RawStatistics {
    let min = stats.min_bytes_opt().map(<[u8]>::to_vec);
    let max = stats.max_bytes_opt().map(<[u8]>::to_vec);
    let null_count = stats.null_count_opt().map(|n| n as i64);
    let distinct_count = stats.distinct_count_opt().map(|n| n as i64);

    if stats.is_min_max_deprecated() {
        RawStatistics {
            min,
            max,
            min_value: None,
            max_value: None,
            null_count,
            distinct_count,
        }
    } else {
        RawStatistics {
            min: None,
            max: None,
            min_value: min,
            max_value: max,
            null_count,
            distinct_count,
        }
    }
}

fn physical_type(physical: PqPhysicalType) -> PhysicalType {
    match physical {
        PqPhysicalType::BOOLEAN => PhysicalType::Boolean,
        PqPhysicalType::INT32 => PhysicalType::Int32,
        PqPhysicalType::INT64 => PhysicalType::Int64,
        PqPhysicalType::INT96 => PhysicalType::Int96,
        PqPhysicalType::FLOAT => PhysicalType::Float,
        PqPhysicalType::DOUBLE => PhysicalType::Double,
        PqPhysicalType::BYTE_ARRAY => PhysicalType::ByteArray,
        PqPhysicalType::FIXED_LEN_BYTE_ARRAY => PhysicalType::FixedLenByteArray,
    }
}

#[allow(unreachable_patterns)]
fn codec(compression: Compression) -> Codec {
    match compression {
        Compression::UNCOMPRESSED => Codec::Uncompressed,
        Compression::SNAPPY => Codec::Snappy,
        Compression::GZIP(_) => Codec::Gzip,
        Compression::LZO => Codec::Lzo,
        Compression::BROTLI(_) => Codec::Brotli,
        Compression::LZ4 => Codec::Lz4,
        Compression::ZSTD(_) => Codec::Zstd,
        Compression::LZ4_RAW => Codec::Lz4Raw,
        _ => Codec::Unknown(-1),
    }
}

fn repetition(repetition: PqRepetition) -> Repetition {
    match repetition {
        PqRepetition::REQUIRED => Repetition::Required,
        PqRepetition::OPTIONAL => Repetition::Optional,
        PqRepetition::REPEATED => Repetition::Repeated,
    }
}

fn time_unit(unit: &PqTimeUnit) -> TimeUnit {
    match unit {
        PqTimeUnit::MILLIS => TimeUnit::Millis,
        PqTimeUnit::MICROS => TimeUnit::Micros,
        PqTimeUnit::NANOS => TimeUnit::Nanos,
    }
}

fn logical_type(logical: &PqLogicalType) -> Option<LogicalType> {
    #[allow(unreachable_patterns)]
    let mapped = match logical {
        PqLogicalType::String => LogicalType::String,
        PqLogicalType::Map => LogicalType::Map,
        PqLogicalType::List => LogicalType::List,
        PqLogicalType::Enum => LogicalType::Enum,
        PqLogicalType::Decimal { scale, precision } => LogicalType::Decimal {
            precision: *precision,
            scale: *scale,
        },
        PqLogicalType::Date => LogicalType::Date,
        PqLogicalType::Time {
            is_adjusted_to_u_t_c,
            unit,
        } => LogicalType::Time {
            unit: time_unit(unit),
            is_utc: *is_adjusted_to_u_t_c,
        },
        PqLogicalType::Timestamp {
            is_adjusted_to_u_t_c,
            unit,
        } => LogicalType::Timestamp {
            unit: time_unit(unit),
            is_utc: *is_adjusted_to_u_t_c,
        },
        PqLogicalType::Integer {
            bit_width,
            is_signed,
        } => LogicalType::Integer {
            bit_width: *bit_width,
            signed: *is_signed,
        },
        PqLogicalType::Unknown => LogicalType::Unknown,
        PqLogicalType::Json => LogicalType::Json,
        PqLogicalType::Bson => LogicalType::Bson,
        PqLogicalType::Uuid => LogicalType::Uuid,
        PqLogicalType::Float16 => LogicalType::Float16,
        PqLogicalType::Variant { .. } => LogicalType::Variant,
        PqLogicalType::Geometry { .. } => LogicalType::Geometry,
        PqLogicalType::Geography { .. } => LogicalType::Geography,
        _ => return None,
    };
    Some(mapped)
}

#[allow(unreachable_patterns)]
fn converted_type(converted: PqConvertedType) -> Option<ConvertedType> {
    Some(match converted {
        PqConvertedType::NONE => return None,
        PqConvertedType::UTF8 => ConvertedType::Utf8,
        PqConvertedType::MAP => ConvertedType::Map,
        PqConvertedType::MAP_KEY_VALUE => ConvertedType::MapKeyValue,
        PqConvertedType::LIST => ConvertedType::List,
        PqConvertedType::ENUM => ConvertedType::Enum,
        PqConvertedType::DECIMAL => ConvertedType::Decimal,
        PqConvertedType::DATE => ConvertedType::Date,
        PqConvertedType::TIME_MILLIS => ConvertedType::TimeMillis,
        PqConvertedType::TIME_MICROS => ConvertedType::TimeMicros,
        PqConvertedType::TIMESTAMP_MILLIS => ConvertedType::TimestampMillis,
        PqConvertedType::TIMESTAMP_MICROS => ConvertedType::TimestampMicros,
        PqConvertedType::UINT_8 => ConvertedType::Uint8,
        PqConvertedType::UINT_16 => ConvertedType::Uint16,
        PqConvertedType::UINT_32 => ConvertedType::Uint32,
        PqConvertedType::UINT_64 => ConvertedType::Uint64,
        PqConvertedType::INT_8 => ConvertedType::Int8,
        PqConvertedType::INT_16 => ConvertedType::Int16,
        PqConvertedType::INT_32 => ConvertedType::Int32,
        PqConvertedType::INT_64 => ConvertedType::Int64,
        PqConvertedType::JSON => ConvertedType::Json,
        PqConvertedType::BSON => ConvertedType::Bson,
        PqConvertedType::INTERVAL => ConvertedType::Interval,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
    use parquet::file::properties::WriterProperties;
    use parquet::file::writer::SerializedFileWriter;
    use std::sync::Arc;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// message schema { required int64 id; optional group info { optional binary name (STRING); } }
    fn write_nested() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let id = Type::primitive_type_builder("id", PqPhysicalType::INT64)
            .with_repetition(PqRepetition::REQUIRED)
            .build()?;
        let name = Type::primitive_type_builder("name", PqPhysicalType::BYTE_ARRAY)
            .with_repetition(PqRepetition::OPTIONAL)
            .with_logical_type(Some(PqLogicalType::String))
            .build()?;
        let info = Type::group_type_builder("info")
            .with_repetition(PqRepetition::OPTIONAL)
            .with_fields(vec![Arc::new(name)])
            .build()?;
        let schema = Type::group_type_builder("schema")
            .with_fields(vec![Arc::new(id), Arc::new(info)])
            .build()?;

        let mut buf = Vec::new();
        let props = Arc::new(WriterProperties::builder().build());
        let mut writer = SerializedFileWriter::new(&mut buf, Arc::new(schema), props)?;
        let mut rg = writer.next_row_group()?;

        let mut col = rg.next_column()?.ok_or("missing id column")?;
        col.typed::<Int64Type>().write_batch(&[1, 2, 3], None, None)?;
        col.close()?;

        let mut col = rg.next_column()?.ok_or("missing name column")?;
        let names = [ByteArray::from("a"), ByteArray::from("b")];
        col.typed::<ByteArrayType>()
            .write_batch(&names, Some(&[2, 0, 2]), None)?;
        col.close()?;

        rg.close()?;
        writer.close()?;
        Ok(buf)
    }

    #[test]
    fn schema_is_flattened_in_pre_order() -> TestResult {
        let meta = load_from_bytes(Bytes::from(write_nested()?))?;

        let names: Vec<&str> = meta.schema.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["schema", "id", "info", "name"]);
        assert_eq!(meta.schema[0].num_children, 2);
        assert_eq!(meta.schema[0].repetition, None);
        assert_eq!(meta.schema[2].num_children, 1);
        assert_eq!(meta.schema[3].logical_type, Some(LogicalType::String));
        assert_eq!(meta.num_leaf_columns(), 2);
        Ok(())
    }

    #[test]
    fn column_chunks_carry_levels_and_statistics() -> TestResult {
        let meta = load_from_bytes(Bytes::from(write_nested()?))?;
        assert_eq!(meta.num_rows, 3);
        assert_eq!(meta.row_groups.len(), 1);

        let cols = &meta.row_groups[0].columns;
        assert_eq!(cols[0].path_in_schema, vec!["id".to_string()]);
        assert_eq!(cols[0].physical_type, PhysicalType::Int64);
        assert_eq!(cols[0].max_def_level, 0);
        let stats = cols[0].statistics.as_ref().ok_or("missing statistics")?;
        assert_eq!(stats.effective_min(), 1i64.to_le_bytes());
        assert_eq!(stats.effective_max(), 3i64.to_le_bytes());

        assert_eq!(cols[1].dotted_path(), "info.name");
        assert_eq!(cols[1].max_def_level, 2);
        assert_eq!(cols[1].num_values, 3);
        Ok(())
    }

    #[test]
    fn garbage_is_a_footer_error() {
        let err = load_from_bytes(Bytes::from_static(b"not a parquet file")).unwrap_err();
        assert!(matches!(err, crate::error::InspectError::Footer { .. }));
    }
}
