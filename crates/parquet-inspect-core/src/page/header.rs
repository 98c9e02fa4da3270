//! Page header decoding.
//!
//! Every page starts with a compact-protocol `PageHeader` struct. The header
//! is decoded in place from the byte source so its encoded size is known
//! exactly: the payload starts at `offset + header_size`.

use std::io::{Read, Seek, SeekFrom};

use snafu::prelude::*;

use crate::error::{InspectResult, IoSnafu, MalformedHeaderSnafu};
use crate::metadata::{Encoding, PageType, RawStatistics};
use crate::thrift::{CompactReader, FieldHeader, ThriftError, ThriftResult};

/// Decoded page header.
#[derive(Clone, Debug, PartialEq)]
pub struct PageHeader {
    /// Kind of page.
    pub page_type: PageType,
    /// Payload size after decompression.
    pub uncompressed_page_size: i32,
    /// Payload size on disk.
    pub compressed_page_size: i32,
    /// Optional CRC32 of the payload.
    pub crc: Option<i32>,
    /// Present on `DATA_PAGE`.
    pub data_page_header: Option<DataPageHeader>,
    /// Present on `DICTIONARY_PAGE`.
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    /// Present on `DATA_PAGE_V2`.
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

/// Header of a version 1 data page.
#[derive(Clone, Debug, PartialEq)]
pub struct DataPageHeader {
    /// Number of values, nulls included.
    pub num_values: i32,
    /// Value encoding.
    pub encoding: Encoding,
    /// Definition level encoding.
    pub definition_level_encoding: Encoding,
    /// Repetition level encoding.
    pub repetition_level_encoding: Encoding,
    /// Optional page statistics.
    pub statistics: Option<RawStatistics>,
}

/// Header of a dictionary page.
#[derive(Clone, Debug, PartialEq)]
pub struct DictionaryPageHeader {
    /// Number of dictionary entries.
    pub num_values: i32,
    /// Encoding of the entries.
    pub encoding: Encoding,
    /// Whether the entries are sorted.
    pub is_sorted: Option<bool>,
}

/// Header of a version 2 data page.
#[derive(Clone, Debug, PartialEq)]
pub struct DataPageHeaderV2 {
    /// Number of values, nulls included.
    pub num_values: i32,
    /// Number of nulls.
    pub num_nulls: i32,
    /// Number of rows.
    pub num_rows: i32,
    /// Value encoding.
    pub encoding: Encoding,
    /// Byte length of the (uncompressed) definition levels.
    pub definition_levels_byte_length: i32,
    /// Byte length of the (uncompressed) repetition levels.
    pub repetition_levels_byte_length: i32,
    /// Whether the value section is compressed.
    pub is_compressed: bool,
    /// Optional page statistics.
    pub statistics: Option<RawStatistics>,
}

/// Seek to `offset` and decode one page header.
///
/// Returns the header and the number of bytes it occupied. On success the
/// source is positioned at the first payload byte.
pub fn read_page_header<R: Read + Seek>(
    source: &mut R,
    offset: u64,
) -> InspectResult<(PageHeader, u64)> {
    source.seek(SeekFrom::Start(offset)).context(IoSnafu {
        offset,
        operation: "seek",
    })?;

    let mut reader = CompactReader::new(&mut *source);
    let header = decode_page_header(&mut reader).context(MalformedHeaderSnafu { offset })?;
    Ok((header, reader.consumed()))
}

/// Decode a `PageHeader` struct from a compact-protocol stream.
pub fn decode_page_header<R: Read>(r: &mut CompactReader<R>) -> ThriftResult<PageHeader> {
    let mut page_type = None;
    let mut uncompressed = None;
    let mut compressed = None;
    let mut crc = None;
    let mut data_page_header = None;
    let mut dictionary_page_header = None;
    let mut data_page_header_v2 = None;

    r.struct_begin()?;
    while let Some(field) = r.field_begin()? {
        match field.id {
            1 => {
                let id = r.read_i32()?;
                page_type = Some(PageType::from_thrift(id).ok_or(ThriftError::InvalidValue {
                    structure: "PageHeader",
                    field: "type",
                    value: i64::from(id),
                })?);
            }
            2 => uncompressed = Some(r.read_i32()?),
            3 => compressed = Some(r.read_i32()?),
            4 => crc = Some(r.read_i32()?),
            5 => data_page_header = Some(decode_data_page_header(r)?),
            7 => dictionary_page_header = Some(decode_dictionary_page_header(r)?),
            8 => data_page_header_v2 = Some(decode_data_page_header_v2(r)?),
            // 6 is the (empty) index page header.
            _ => r.skip(field.field_type)?,
        }
    }
    r.struct_end();

    let compressed_page_size = required(compressed, "PageHeader", "compressed_page_size")?;
    ensure!(
        compressed_page_size >= 0,
        crate::thrift::InvalidValueSnafu {
            structure: "PageHeader",
            field: "compressed_page_size",
            value: i64::from(compressed_page_size),
        }
    );

    Ok(PageHeader {
        page_type: required(page_type, "PageHeader", "type")?,
        uncompressed_page_size: required(uncompressed, "PageHeader", "uncompressed_page_size")?,
        compressed_page_size,
        crc,
        data_page_header,
        dictionary_page_header,
        data_page_header_v2,
    })
}

fn decode_data_page_header<R: Read>(r: &mut CompactReader<R>) -> ThriftResult<DataPageHeader> {
    let mut num_values = None;
    let mut encoding = None;
    let mut def_encoding = None;
    let mut rep_encoding = None;
    let mut statistics = None;

    r.struct_begin()?;
    while let Some(field) = r.field_begin()? {
        match field.id {
            1 => num_values = Some(r.read_i32()?),
            2 => encoding = Some(Encoding::from_thrift(r.read_i32()?)),
            3 => def_encoding = Some(Encoding::from_thrift(r.read_i32()?)),
            4 => rep_encoding = Some(Encoding::from_thrift(r.read_i32()?)),
            5 => statistics = Some(decode_statistics(r)?),
            _ => r.skip(field.field_type)?,
        }
    }
    r.struct_end();

    Ok(DataPageHeader {
        num_values: required(num_values, "DataPageHeader", "num_values")?,
        encoding: required(encoding, "DataPageHeader", "encoding")?,
        definition_level_encoding: def_encoding.unwrap_or(Encoding::Rle),
        repetition_level_encoding: rep_encoding.unwrap_or(Encoding::Rle),
        statistics,
    })
}

fn decode_dictionary_page_header<R: Read>(
    r: &mut CompactReader<R>,
) -> ThriftResult<DictionaryPageHeader> {
    let mut num_values = None;
    let mut encoding = None;
    let mut is_sorted = None;

    r.struct_begin()?;
    while let Some(field) = r.field_begin()? {
        match field.id {
            1 => num_values = Some(r.read_i32()?),
            2 => encoding = Some(Encoding::from_thrift(r.read_i32()?)),
            3 => is_sorted = Some(r.read_bool()?),
            _ => r.skip(field.field_type)?,
        }
    }
    r.struct_end();

    Ok(DictionaryPageHeader {
        num_values: required(num_values, "DictionaryPageHeader", "num_values")?,
        encoding: encoding.unwrap_or(Encoding::Plain),
        is_sorted,
    })
}

fn decode_data_page_header_v2<R: Read>(
    r: &mut CompactReader<R>,
) -> ThriftResult<DataPageHeaderV2> {
    let mut num_values = None;
    let mut num_nulls = 0;
    let mut num_rows = 0;
    let mut encoding = None;
    let mut def_len = 0;
    let mut rep_len = 0;
    let mut is_compressed = true;
    let mut statistics = None;

    r.struct_begin()?;
    while let Some(field) = r.field_begin()? {
        match field.id {
            1 => num_values = Some(r.read_i32()?),
            2 => num_nulls = r.read_i32()?,
            3 => num_rows = r.read_i32()?,
            4 => encoding = Some(Encoding::from_thrift(r.read_i32()?)),
            5 => def_len = r.read_i32()?,
            6 => rep_len = r.read_i32()?,
            7 => is_compressed = r.read_bool()?,
            8 => statistics = Some(decode_statistics(r)?),
            _ => r.skip(field.field_type)?,
        }
    }
    r.struct_end();

    Ok(DataPageHeaderV2 {
        num_values: required(num_values, "DataPageHeaderV2", "num_values")?,
        num_nulls,
        num_rows,
        encoding: required(encoding, "DataPageHeaderV2", "encoding")?,
        definition_levels_byte_length: def_len,
        repetition_levels_byte_length: rep_len,
        is_compressed,
        statistics,
    })
}

fn decode_statistics<R: Read>(r: &mut CompactReader<R>) -> ThriftResult<RawStatistics> {
    let mut stats = RawStatistics::default();

    r.struct_begin()?;
    while let Some(FieldHeader { id, field_type }) = r.field_begin()? {
        match id {
            1 => stats.max = Some(r.read_binary()?),
            2 => stats.min = Some(r.read_binary()?),
            3 => stats.null_count = Some(r.read_i64()?),
            4 => stats.distinct_count = Some(r.read_i64()?),
            5 => stats.max_value = Some(r.read_binary()?),
            6 => stats.min_value = Some(r.read_binary()?),
            _ => r.skip(field_type)?,
        }
    }
    r.struct_end();

    Ok(stats)
}

fn required<T>(value: Option<T>, structure: &'static str, field: &'static str) -> ThriftResult<T> {
    value.ok_or(ThriftError::MissingField { structure, field })
}

/// Byte-level builders for page streams with an exact layout.
#[cfg(test)]
pub(crate) mod testing {
    use crate::thrift::writer::CompactWriter;

    /// Encode a dictionary page header.
    pub(crate) fn dictionary_header(num_values: i32, size: i32) -> Vec<u8> {
        let mut w = CompactWriter::new();
        w.i32_field(1, 2)
            .i32_field(2, size)
            .i32_field(3, size)
            .struct_field_begin(7)
            .i32_field(1, num_values)
            .i32_field(2, 0)
            .struct_field_end();
        w.finish()
    }

    /// Encode a v1 data page header with optional statistics.
    pub(crate) fn data_header(
        num_values: i32,
        encoding: i32,
        size: i32,
        stats: Option<(&[u8], &[u8])>,
    ) -> Vec<u8> {
        let mut w = CompactWriter::new();
        w.i32_field(1, 0)
            .i32_field(2, size)
            .i32_field(3, size)
            .struct_field_begin(5)
            .i32_field(1, num_values)
            .i32_field(2, encoding)
            .i32_field(3, 3)
            .i32_field(4, 3);
        if let Some((min, max)) = stats {
            w.struct_field_begin(5)
                .binary_field(5, max)
                .binary_field(6, min)
                .i64_field(3, 0)
                .struct_field_end();
        }
        w.struct_field_end();
        w.finish()
    }
}
