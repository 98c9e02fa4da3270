//! Materializing the values of one data page.
//!
//! Only the non-null values are produced; levels are decoded solely to count
//! nulls and find where the values start. Every failure propagates, since the
//! caller asked for this specific page.

use std::io::{Read, Seek, SeekFrom};

use log::debug;
use serde::Serialize;
use snafu::prelude::*;

use crate::codec::decompress;
use crate::config::InspectOptions;
use crate::decode::{DecodedValue, decode_bitpacked_booleans, decode_plain, decode_plain_fixed_len};
use crate::error::{
    DictionaryIndexSnafu, FixedLenNeedsSchemaSnafu, InspectResult, InsufficientDataSnafu,
    IoSnafu, MissingDictionarySnafu, NotDataPageSnafu, PageExceedsChunkSnafu,
    UnsupportedEncodingSnafu,
};
use crate::format::{DisplayValue, format_for_display};
use crate::metadata::{ColumnChunk, Encoding, PageType, PhysicalType, SchemaElement};
use crate::page::Page;
use crate::rle::{bit_width_for, decode_hybrid};

/// Values of one data page.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageContent {
    /// Position of the page within its chunk.
    pub page_index: usize,
    /// Kind of page.
    pub page_type: PageType,
    /// Value encoding.
    pub encoding: Encoding,
    /// Values in the page, nulls included.
    pub num_values: i32,
    /// Nulls found in the definition levels.
    pub null_count: usize,
    /// Decoded non-null values.
    pub values: Vec<DecodedValue>,
    /// Rendered form of `values`, index for index.
    pub display: Vec<DisplayValue>,
    /// True when fewer values were returned than the page holds.
    pub truncated: bool,
}

/// Read, decompress and decode the values of `page`.
///
/// `dictionary` is the chunk's dictionary page, needed only for
/// dictionary-encoded data pages.
pub fn read_page_content<R: Read + Seek>(
    source: &mut R,
    chunk: &ColumnChunk,
    element: &SchemaElement,
    page: &Page,
    dictionary: Option<&Page>,
    options: &InspectOptions,
) -> InspectResult<PageContent> {
    ensure!(
        page.page_type.is_data(),
        NotDataPageSnafu {
            index: page.index,
            page_type: page.page_type,
        }
    );
    debug!(
        "reading page {} of column '{}' at offset {}",
        page.index,
        chunk.dotted_path(),
        page.offset
    );

    let limit = payload_limit(chunk, options);
    let payload = read_payload(source, page, limit)?;
    let num_values = usize::try_from(page.num_values).unwrap_or(0);
    let (values_buf, null_count) = match page.page_type {
        PageType::DataPageV2 => split_v2(&payload, chunk, page)?,
        _ => split_v1(&payload, chunk, page, num_values)?,
    };

    let non_null = num_values.saturating_sub(null_count);
    let wanted = options
        .max_content_values
        .map_or(non_null, |cap| cap.min(non_null));

    let encoding = page.encoding.unwrap_or(Encoding::Plain);
    let values = match encoding {
        Encoding::Plain => decode_values(&values_buf, chunk.physical_type, element, wanted)?,
        Encoding::Rle if chunk.physical_type == PhysicalType::Boolean => {
            let (bits, _) = read_prefixed_levels(&values_buf, 1, wanted)?;
            bits.into_iter().map(|b| DecodedValue::Bool(b != 0)).collect()
        }
        e if e.is_dictionary() => {
            let dict_page = dictionary.context(MissingDictionarySnafu)?;
            let dict = read_dictionary(source, chunk, element, dict_page, limit)?;
            lookup_indices(&values_buf, &dict, wanted)?
        }
        other => return UnsupportedEncodingSnafu { encoding: other }.fail(),
    };

    let display = values
        .iter()
        .map(|v| format_for_display(v, chunk.physical_type, element, options.cell_display_cap))
        .collect();

    Ok(PageContent {
        page_index: page.index,
        page_type: page.page_type,
        encoding,
        num_values: page.num_values,
        null_count,
        truncated: values.len() < non_null,
        values,
        display,
    })
}

/// Largest payload a page of `chunk` may declare.
fn payload_limit(chunk: &ColumnChunk, options: &InspectOptions) -> u64 {
    u64::try_from(chunk.total_compressed_size)
        .unwrap_or(0)
        .saturating_add(options.scan_slack_bytes)
}

fn read_payload<R: Read + Seek>(
    source: &mut R,
    page: &Page,
    limit: u64,
) -> InspectResult<Vec<u8>> {
    let declared = u64::try_from(page.compressed_size).unwrap_or(0);
    ensure!(
        declared <= limit,
        PageExceedsChunkSnafu {
            offset: page.offset,
            declared,
            limit,
        }
    );

    let offset = page.payload_offset();
    source.seek(SeekFrom::Start(offset)).context(IoSnafu {
        offset,
        operation: "seek",
    })?;
    let mut payload = Vec::new();
    (&mut *source)
        .take(declared)
        .read_to_end(&mut payload)
        .context(IoSnafu {
            offset,
            operation: "read",
        })?;
    ensure!(
        payload.len() as u64 == declared,
        InsufficientDataSnafu {
            what: "page payload",
            needed: declared as usize,
            available: payload.len(),
        }
    );
    Ok(payload)
}

/// v1: the whole payload is compressed; levels carry a 4-byte length prefix.
fn split_v1(
    payload: &[u8],
    chunk: &ColumnChunk,
    page: &Page,
    num_values: usize,
) -> InspectResult<(Vec<u8>, usize)> {
    let data = decompress(payload, chunk.codec, page.uncompressed_size.max(0) as usize)?;
    let mut pos = 0usize;

    if chunk.max_rep_level > 0 {
        check_level_encoding(page.repetition_level_encoding)?;
        let (_, used) = read_prefixed_levels(&data[pos..], chunk.max_rep_level, num_values)?;
        pos += used;
    }

    let mut nulls = 0;
    if chunk.max_def_level > 0 {
        check_level_encoding(page.definition_level_encoding)?;
        let (levels, used) = read_prefixed_levels(&data[pos..], chunk.max_def_level, num_values)?;
        pos += used;
        let max = chunk.max_def_level as u32;
        nulls = levels.iter().filter(|l| **l < max).count();
    }

    Ok((data[pos..].to_vec(), nulls))
}

/// v2: levels sit uncompressed in front; only the values may be compressed.
fn split_v2(payload: &[u8], chunk: &ColumnChunk, page: &Page) -> InspectResult<(Vec<u8>, usize)> {
    let rep_len = page.repetition_levels_byte_length.unwrap_or(0).max(0) as usize;
    let def_len = page.definition_levels_byte_length.unwrap_or(0).max(0) as usize;
    let levels_len = rep_len + def_len;
    ensure!(
        levels_len <= payload.len(),
        InsufficientDataSnafu {
            what: "v2 level data",
            needed: levels_len,
            available: payload.len(),
        }
    );

    let values = &payload[levels_len..];
    let values = if page.is_compressed.unwrap_or(true) {
        let expected = (page.uncompressed_size.max(0) as usize).saturating_sub(levels_len);
        decompress(values, chunk.codec, expected)?
    } else {
        values.to_vec()
    };

    let nulls = page.num_nulls.unwrap_or(0).max(0) as usize;
    Ok((values, nulls))
}

fn check_level_encoding(encoding: Option<Encoding>) -> InspectResult<()> {
    match encoding {
        None | Some(Encoding::Rle) => Ok(()),
        Some(other) => UnsupportedEncodingSnafu { encoding: other }.fail(),
    }
}

/// Decode `[u32 LE length][hybrid RLE data]`, returning the levels and the
/// bytes consumed.
fn read_prefixed_levels(
    buf: &[u8],
    max_level: i16,
    count: usize,
) -> InspectResult<(Vec<u32>, usize)> {
    let prefix: [u8; 4] = buf
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .context(InsufficientDataSnafu {
            what: "level length prefix",
            needed: 4usize,
            available: buf.len(),
        })?;
    let len = u32::from_le_bytes(prefix) as usize;
    let data = buf.get(4..4 + len).context(InsufficientDataSnafu {
        what: "level data",
        needed: 4 + len,
        available: buf.len(),
    })?;
    let levels = decode_hybrid(data, bit_width_for(max_level), count)?;
    Ok((levels, 4 + len))
}

fn decode_values(
    buf: &[u8],
    physical: PhysicalType,
    element: &SchemaElement,
    count: usize,
) -> InspectResult<Vec<DecodedValue>> {
    match physical {
        PhysicalType::Boolean => Ok(decode_bitpacked_booleans(buf, count)),
        PhysicalType::FixedLenByteArray => {
            let width = element.type_length.context(FixedLenNeedsSchemaSnafu)?;
            Ok(decode_plain_fixed_len(buf, width.max(0) as usize, count))
        }
        other => decode_plain(buf, other, count),
    }
}

fn read_dictionary<R: Read + Seek>(
    source: &mut R,
    chunk: &ColumnChunk,
    element: &SchemaElement,
    dict_page: &Page,
    limit: u64,
) -> InspectResult<Vec<DecodedValue>> {
    let payload = read_payload(source, dict_page, limit)?;
    let data = decompress(
        &payload,
        chunk.codec,
        dict_page.uncompressed_size.max(0) as usize,
    )?;
    let entries = dict_page.dictionary_entries.unwrap_or(0).max(0) as usize;
    decode_values(&data, chunk.physical_type, element, entries)
}

/// `[bit width byte][hybrid RLE indices]`, mapped through `dict`.
fn lookup_indices(
    buf: &[u8],
    dict: &[DecodedValue],
    count: usize,
) -> InspectResult<Vec<DecodedValue>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let (&bit_width, rest) = buf.split_first().context(InsufficientDataSnafu {
        what: "dictionary index bit width",
        needed: 1usize,
        available: 0usize,
    })?;
    decode_hybrid(rest, bit_width, count)?
        .into_iter()
        .map(|idx| {
            dict.get(idx as usize).cloned().context(DictionaryIndexSnafu {
                index: idx,
                size: dict.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InspectError;
    use crate::metadata::Codec;
    use crate::page::enumerate::testing::{dictionary_chunk, int32_leaf};
    use crate::page::enumerate::enumerate_pages;
    use std::io::Cursor;

    fn walk(bytes: &[u8], chunk: &ColumnChunk) -> Vec<Page> {
        enumerate_pages(
            &mut Cursor::new(bytes.to_vec()),
            chunk,
            &int32_leaf(),
            &InspectOptions::default(),
        )
        .pages
    }

    #[test]
    fn dictionary_pages_resolve_through_the_dictionary() {
        let (bytes, chunk) = dictionary_chunk(&[10, 20, 30], &[&[0, 1, 2], &[2, 2, 1, 0]]);
        let pages = walk(&bytes, &chunk);

        let content = read_page_content(
            &mut Cursor::new(bytes),
            &chunk,
            &int32_leaf(),
            &pages[2],
            Some(&pages[0]),
            &InspectOptions::default(),
        )
        .unwrap();

        assert_eq!(content.encoding, Encoding::RleDictionary);
        assert_eq!(
            content.values,
            vec![
                DecodedValue::Int32(30),
                DecodedValue::Int32(30),
                DecodedValue::Int32(20),
                DecodedValue::Int32(10)
            ]
        );
        let shown: Vec<String> = content.display.iter().map(|d| d.to_string()).collect();
        assert_eq!(shown, vec!["30", "30", "20", "10"]);
        assert!(!content.truncated);
    }

    #[test]
    fn dictionary_page_itself_has_no_content() {
        let (bytes, chunk) = dictionary_chunk(&[1], &[&[0]]);
        let pages = walk(&bytes, &chunk);
        let err = read_page_content(
            &mut Cursor::new(bytes),
            &chunk,
            &int32_leaf(),
            &pages[0],
            None,
            &InspectOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InspectError::NotDataPage {
                index: 0,
                page_type: PageType::DictionaryPage
            }
        ));
    }

    #[test]
    fn out_of_range_index_is_a_decode_error() {
        let (bytes, chunk) = dictionary_chunk(&[1, 2], &[&[0, 5]]);
        let pages = walk(&bytes, &chunk);
        let err = read_page_content(
            &mut Cursor::new(bytes),
            &chunk,
            &int32_leaf(),
            &pages[1],
            Some(&pages[0]),
            &InspectOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InspectError::DictionaryIndex { index: 5, size: 2 }));
    }

    #[test]
    fn oversized_page_declarations_are_errors() {
        let (bytes, chunk) = dictionary_chunk(&[1, 2], &[&[0, 1]]);
        let pages = walk(&bytes, &chunk);
        let read = |page: &Page| {
            read_page_content(
                &mut Cursor::new(bytes.clone()),
                &chunk,
                &int32_leaf(),
                page,
                Some(&pages[0]),
                &InspectOptions::default(),
            )
        };

        let mut huge = pages[1].clone();
        huge.compressed_size = 2_000_000_000;
        let err = read(&huge).unwrap_err();
        assert!(matches!(
            err,
            InspectError::PageExceedsChunk {
                declared: 2_000_000_000,
                ..
            }
        ));

        // Within the chunk bound but past the end of the file.
        let mut long = pages[1].clone();
        long.compressed_size = bytes.len() as i32;
        let err = read(&long).unwrap_err();
        assert!(matches!(
            err,
            InspectError::InsufficientData {
                what: "page payload",
                ..
            }
        ));
    }

    #[test]
    fn value_cap_marks_content_truncated() {
        let (bytes, chunk) = dictionary_chunk(&[7, 8], &[&[0, 1, 0, 1]]);
        let pages = walk(&bytes, &chunk);
        let opts = InspectOptions::default().with_max_content_values(2);
        let content = read_page_content(
            &mut Cursor::new(bytes),
            &chunk,
            &int32_leaf(),
            &pages[1],
            Some(&pages[0]),
            &opts,
        )
        .unwrap();
        assert_eq!(content.values.len(), 2);
        assert!(content.truncated);
    }

    #[test]
    fn v1_levels_are_skipped_and_nulls_counted() {
        // Optional INT32 column, 4 slots, definition levels 1,0,1,1.
        let mut data = Vec::new();
        let levels = [0b11u8, 0b0000_1101];
        data.extend_from_slice(&(levels.len() as u32).to_le_bytes());
        data.extend_from_slice(&levels);
        for v in [5i32, 6, 7] {
            data.extend_from_slice(&v.to_le_bytes());
        }

        let compressed = snap::raw::Encoder::new().compress_vec(&data).unwrap();
        let header = {
            let mut w = crate::thrift::writer::CompactWriter::new();
            w.i32_field(1, 0)
                .i32_field(2, data.len() as i32)
                .i32_field(3, compressed.len() as i32)
                .struct_field_begin(5)
                .i32_field(1, 4)
                .i32_field(2, 0)
                .i32_field(3, 3)
                .i32_field(4, 3)
                .struct_field_end();
            w.finish()
        };

        let mut bytes = header;
        bytes.extend_from_slice(&compressed);

        let chunk = ColumnChunk {
            path_in_schema: vec!["v".to_string()],
            physical_type: PhysicalType::Int32,
            codec: Codec::Snappy,
            num_values: 4,
            dictionary_page_offset: None,
            data_page_offset: 0,
            total_compressed_size: bytes.len() as i64,
            total_uncompressed_size: bytes.len() as i64,
            statistics: None,
            max_def_level: 1,
            max_rep_level: 0,
        };
        let pages = walk(&bytes, &chunk);
        assert_eq!(pages.len(), 1);

        let content = read_page_content(
            &mut Cursor::new(bytes),
            &chunk,
            &int32_leaf(),
            &pages[0],
            None,
            &InspectOptions::default(),
        )
        .unwrap();
        assert_eq!(content.null_count, 1);
        assert_eq!(
            content.values,
            vec![
                DecodedValue::Int32(5),
                DecodedValue::Int32(6),
                DecodedValue::Int32(7)
            ]
        );
    }
}
