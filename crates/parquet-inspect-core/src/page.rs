//! Pages inside a column chunk.
//!
//! - [`header`] decodes one page header at a byte offset.
//! - [`enumerate`] walks every page of a chunk.
//! - [`content`] materializes the values of one data page.

use serde::Serialize;

use crate::metadata::{Encoding, PageType};
use crate::stats::StatisticsSummary;

pub mod content;
pub mod enumerate;
pub mod header;

pub use content::{PageContent, read_page_content};
pub use enumerate::{PageWalk, StopReason, enumerate_pages};
pub use header::{PageHeader, read_page_header};

/// One page as found while walking a column chunk.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page {
    /// Position within the column chunk.
    pub index: usize,
    /// Byte offset of the page header in the file.
    pub offset: u64,
    /// Kind of page.
    pub page_type: PageType,
    /// Encoded size of the header.
    pub header_size: u64,
    /// Payload size on disk.
    pub compressed_size: i32,
    /// Payload size after decompression.
    pub uncompressed_size: i32,
    /// Values in the page, nulls included; zero for non-data pages.
    pub num_values: i32,
    /// Value encoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    /// Definition level encoding (v1 data pages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_level_encoding: Option<Encoding>,
    /// Repetition level encoding (v1 data pages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_level_encoding: Option<Encoding>,
    /// Rendered page statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<StatisticsSummary>,
    /// Whether the header carries a CRC.
    pub has_crc: bool,
    /// Null count (v2 data pages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_nulls: Option<i32>,
    /// Row count (v2 data pages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<i32>,
    /// Byte length of the definition levels (v2 data pages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_levels_byte_length: Option<i32>,
    /// Byte length of the repetition levels (v2 data pages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_levels_byte_length: Option<i32>,
    /// Whether the value section is compressed (v2 data pages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_compressed: Option<bool>,
    /// Number of dictionary entries (dictionary pages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_entries: Option<i32>,
    /// Whether dictionary entries are sorted (dictionary pages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_sorted: Option<bool>,
}

impl Page {
    /// Offset of the first byte after this page.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.header_size + self.compressed_size.max(0) as u64
    }

    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> u64 {
        self.offset + self.header_size
    }
}
