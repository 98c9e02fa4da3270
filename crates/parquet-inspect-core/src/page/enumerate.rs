//! Sequential page walk over one column chunk.
//!
//! The walk starts at the chunk's first page and follows header sizes and
//! compressed payload sizes from page to page. It never fails: a header that
//! cannot be read ends the walk, since trailing bytes after the last page are
//! normal (page indexes, the footer).

use std::io::{Read, Seek};

use log::{debug, warn};
use serde::Serialize;

use crate::config::InspectOptions;
use crate::metadata::{ColumnChunk, RawStatistics, SchemaElement};
use crate::page::Page;
use crate::page::header::{PageHeader, read_page_header};
use crate::stats::summarize;

/// Why a walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    /// Data pages account for every declared value.
    Complete,
    /// No further header could be read.
    EndOfData,
    /// The page cap was hit.
    PageLimit,
    /// The next page would start past the chunk's byte bound.
    ByteLimit,
}

/// Result of walking one column chunk.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageWalk {
    /// Pages in file order.
    pub pages: Vec<Page>,
    /// Sum of `num_values` over data pages.
    pub values_read: i64,
    /// Why the walk ended.
    pub stop: StopReason,
    /// Error text when the walk ended on an unreadable header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Walk the pages of `chunk`.
///
/// Stops once data pages account for the declared value count, when a
/// header cannot be read, or when a safety bound from `options` is reached.
pub fn enumerate_pages<R: Read + Seek>(
    source: &mut R,
    chunk: &ColumnChunk,
    element: &SchemaElement,
    options: &InspectOptions,
) -> PageWalk {
    let start = chunk.start_offset();
    let byte_limit = start
        .saturating_add(chunk.total_compressed_size.max(0) as u64)
        .saturating_add(options.scan_slack_bytes);

    let mut pages = Vec::new();
    let mut values_read = 0i64;
    let mut offset = start;
    let mut last_error = None;

    let stop = loop {
        if values_read >= chunk.num_values {
            break StopReason::Complete;
        }
        if pages.len() >= options.max_pages_per_chunk {
            warn!(
                "column '{}': stopped after {} pages (page cap)",
                chunk.dotted_path(),
                pages.len()
            );
            break StopReason::PageLimit;
        }
        if offset > byte_limit {
            warn!(
                "column '{}': offset {offset} past byte bound {byte_limit}",
                chunk.dotted_path()
            );
            break StopReason::ByteLimit;
        }

        let (header, header_size) = match read_page_header(source, offset) {
            Ok(found) => found,
            Err(e) => {
                debug!(
                    "column '{}': page walk ended at offset {offset}: {e}",
                    chunk.dotted_path()
                );
                last_error = Some(e.to_string());
                break StopReason::EndOfData;
            }
        };

        let page = page_from_header(
            pages.len(),
            offset,
            header_size,
            header,
            chunk,
            element,
            options,
        );
        if page.page_type.is_data() {
            values_read += i64::from(page.num_values);
        }
        offset = page.end_offset();
        pages.push(page);
    };

    PageWalk {
        pages,
        values_read,
        stop,
        last_error,
    }
}

fn page_from_header(
    index: usize,
    offset: u64,
    header_size: u64,
    header: PageHeader,
    chunk: &ColumnChunk,
    element: &SchemaElement,
    options: &InspectOptions,
) -> Page {
    let mut page = Page {
        index,
        offset,
        page_type: header.page_type,
        header_size,
        compressed_size: header.compressed_page_size,
        uncompressed_size: header.uncompressed_page_size,
        num_values: 0,
        encoding: None,
        definition_level_encoding: None,
        repetition_level_encoding: None,
        statistics: None,
        has_crc: header.crc.is_some(),
        num_nulls: None,
        num_rows: None,
        definition_levels_byte_length: None,
        repetition_levels_byte_length: None,
        is_compressed: None,
        dictionary_entries: None,
        is_sorted: None,
    };

    let stats = |raw: &RawStatistics| {
        summarize(raw, chunk.physical_type, element, options.stats_display_cap)
    };

    if let Some(data) = &header.data_page_header {
        page.num_values = data.num_values;
        page.encoding = Some(data.encoding);
        page.definition_level_encoding = Some(data.definition_level_encoding);
        page.repetition_level_encoding = Some(data.repetition_level_encoding);
        page.statistics = data.statistics.as_ref().map(stats);
    } else if let Some(v2) = &header.data_page_header_v2 {
        page.num_values = v2.num_values;
        page.encoding = Some(v2.encoding);
        page.statistics = v2.statistics.as_ref().map(stats);
        page.num_nulls = Some(v2.num_nulls);
        page.num_rows = Some(v2.num_rows);
        page.definition_levels_byte_length = Some(v2.definition_levels_byte_length);
        page.repetition_levels_byte_length = Some(v2.repetition_levels_byte_length);
        page.is_compressed = Some(v2.is_compressed);
    } else if let Some(dict) = &header.dictionary_page_header {
        page.encoding = Some(dict.encoding);
        page.dictionary_entries = Some(dict.num_values);
        page.is_sorted = dict.is_sorted;
    }

    page
}

/// Hand-assembled chunks with an exact page layout.
#[cfg(test)]
pub(crate) mod testing {
    use crate::metadata::{Codec, ColumnChunk, PhysicalType, Repetition, SchemaElement};
    use crate::page::header::testing::{data_header, dictionary_header};

    /// Bytes before the first page, standing in for the file magic.
    pub(crate) const LEAD: usize = 4;

    /// A file holding one INT32 chunk: a dictionary of `dict` values, then
    /// one RLE_DICTIONARY data page per entry of `pages`, each listing
    /// dictionary indices. Returns the bytes and the chunk metadata.
    pub(crate) fn dictionary_chunk(dict: &[i32], pages: &[&[u8]]) -> (Vec<u8>, ColumnChunk) {
        let mut bytes = b"PAR1".to_vec();

        let dict_payload: Vec<u8> = dict.iter().flat_map(|v| v.to_le_bytes()).collect();
        bytes.extend(dictionary_header(dict.len() as i32, dict_payload.len() as i32));
        bytes.extend(&dict_payload);
        let data_page_offset = bytes.len() as i64;

        let mut num_values = 0i64;
        for indices in pages {
            // bit width 8, then one RLE run per index.
            let mut payload = vec![8u8];
            for idx in *indices {
                payload.push(1 << 1);
                payload.push(*idx);
            }
            bytes.extend(data_header(indices.len() as i32, 8, payload.len() as i32, None));
            bytes.extend(&payload);
            num_values += indices.len() as i64;
        }
        let size = bytes.len() as i64 - LEAD as i64;
        bytes.extend(b"PAR1");

        let chunk = ColumnChunk {
            path_in_schema: vec!["v".to_string()],
            physical_type: PhysicalType::Int32,
            codec: Codec::Uncompressed,
            num_values,
            dictionary_page_offset: Some(LEAD as i64),
            data_page_offset,
            total_compressed_size: size,
            total_uncompressed_size: size,
            statistics: None,
            max_def_level: 0,
            max_rep_level: 0,
        };
        (bytes, chunk)
    }

    pub(crate) fn int32_leaf() -> SchemaElement {
        SchemaElement {
            name: "v".to_string(),
            physical_type: Some(PhysicalType::Int32),
            type_length: None,
            repetition: Some(Repetition::Required),
            logical_type: None,
            converted_type: None,
            precision: None,
            scale: None,
            num_children: 0,
        }
    }
}
