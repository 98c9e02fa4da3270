//! Error types for the inspection engine.
//!
//! All fallible operations in this crate return [`InspectResult`]. Variants
//! fall into five groups:
//!
//! - index errors ([`InspectError::RowGroupIndex`], [`InspectError::ColumnIndex`],
//!   [`InspectError::PageIndex`]), raised before any I/O;
//! - page-type errors ([`InspectError::NotDataPage`]);
//! - decode errors (malformed headers, codecs, encodings, short buffers);
//! - I/O errors carrying the offset and the operation that failed;
//! - open errors (footer parsing, schema/column mismatches).

use std::error::Error as StdError;

use snafu::{Backtrace, prelude::*};

use crate::metadata::{Codec, Encoding, PageType};
use crate::thrift::ThriftError;

/// Result alias used across the crate.
pub type InspectResult<T> = Result<T, InspectError>;

/// Errors produced while opening, walking or decoding a Parquet file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InspectError {
    /// Row group index is negative or past the last row group.
    #[snafu(display("row group index {index} out of range (file has {count} row groups)"))]
    RowGroupIndex {
        /// The requested index.
        index: i64,
        /// Number of row groups in the file.
        count: usize,
    },

    /// Column index is negative or past the last leaf column.
    #[snafu(display("column index {index} out of range (schema has {count} leaf columns)"))]
    ColumnIndex {
        /// The requested index.
        index: i64,
        /// Number of leaf columns.
        count: usize,
    },

    /// Page index is negative or past the last page of the chunk.
    #[snafu(display("page index {index} out of range (column chunk has {count} pages)"))]
    PageIndex {
        /// The requested index.
        index: i64,
        /// Number of pages found in the chunk.
        count: usize,
    },

    /// Content was requested for a page that carries no row values.
    #[snafu(display("page {index} is a {page_type}, not a data page"))]
    NotDataPage {
        /// The requested page index.
        index: usize,
        /// Kind of the page.
        page_type: PageType,
    },

    /// A page header could not be decoded.
    #[snafu(display("malformed page header at offset {offset}: {source}"))]
    MalformedHeader {
        /// Offset where the header starts.
        offset: u64,
        /// The compact-protocol failure.
        source: ThriftError,
    },

    /// A physical type id or name this crate does not know.
    #[snafu(display("unrecognized physical type {physical}"))]
    UnknownPhysicalType {
        /// The offending type, as text.
        physical: String,
    },

    /// Fixed-length byte arrays cannot be decoded without the schema width.
    #[snafu(display("FIXED_LEN_BYTE_ARRAY values need the type length from the schema"))]
    FixedLenNeedsSchema,

    /// Codec id outside the known table.
    #[snafu(display("unsupported compression codec {codec}"))]
    UnsupportedCodec {
        /// The codec.
        codec: Codec,
    },

    /// A recognized codec this build refuses to decode.
    #[snafu(display("compression codec {codec} is not supported"))]
    CodecNotSupported {
        /// The codec.
        codec: Codec,
    },

    /// A recognized codec without a decoder yet.
    #[snafu(display("compression codec {codec} is not implemented"))]
    CodecNotImplemented {
        /// The codec.
        codec: Codec,
    },

    /// The underlying codec library rejected the payload.
    #[snafu(display("{codec} decompression failed: {source}"))]
    Decompress {
        /// The codec in use.
        codec: Codec,
        /// Error reported by the codec implementation.
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Decompressed output does not match the size declared in the header.
    #[snafu(display("{codec} produced {actual} bytes, header declares {expected}"))]
    UncompressedSizeMismatch {
        /// The codec in use.
        codec: Codec,
        /// Declared uncompressed size.
        expected: usize,
        /// Bytes actually produced.
        actual: usize,
    },

    /// The declared uncompressed size is more than the codec can produce
    /// from the payload.
    #[snafu(display(
        "{codec} payload of {compressed} bytes cannot expand to the declared {declared} bytes"
    ))]
    ImplausibleExpansion {
        /// The codec in use.
        codec: Codec,
        /// Compressed payload size.
        compressed: usize,
        /// Declared uncompressed size.
        declared: usize,
    },

    /// A page header declares a payload larger than its column chunk.
    #[snafu(display(
        "page at offset {offset} declares {declared} payload bytes, column chunk allows {limit}"
    ))]
    PageExceedsChunk {
        /// Offset of the page header.
        offset: u64,
        /// Declared compressed size.
        declared: u64,
        /// Chunk size plus the scan slack.
        limit: u64,
    },

    /// The page uses a value encoding this crate cannot materialize.
    #[snafu(display("unsupported encoding {encoding}"))]
    UnsupportedEncoding {
        /// The encoding.
        encoding: Encoding,
    },

    /// A buffer ended before a required structure was complete.
    #[snafu(display("insufficient data: needed {needed} bytes for {what}, {available} available"))]
    InsufficientData {
        /// What was being read.
        what: &'static str,
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// A level or dictionary-index stream is malformed.
    #[snafu(display("invalid hybrid RLE stream: {detail}"))]
    InvalidRle {
        /// Description of the problem.
        detail: String,
    },

    /// A dictionary index points past the end of the dictionary.
    #[snafu(display("dictionary index {index} out of range (dictionary has {size} entries)"))]
    DictionaryIndex {
        /// The index read from the page.
        index: u32,
        /// Number of dictionary entries.
        size: usize,
    },

    /// A data page is dictionary encoded but the chunk has no dictionary page.
    #[snafu(display("data page is dictionary encoded but the column chunk has no dictionary page"))]
    MissingDictionary,

    /// Seeking or reading the byte source failed.
    #[snafu(display("I/O error during {operation} at offset {offset}: {source}"))]
    Io {
        /// Offset of the failing operation.
        offset: u64,
        /// Name of the operation (`seek`, `read`...).
        operation: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
        /// Backtrace captured at the failure.
        backtrace: Backtrace,
    },

    /// The file could not be opened.
    #[snafu(display("failed to open {path}: {source}"))]
    OpenFile {
        /// Path that was opened.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
        /// Backtrace captured at the failure.
        backtrace: Backtrace,
    },

    /// The footer is missing or unparseable.
    #[snafu(display("failed to read parquet footer: {source}"))]
    Footer {
        /// Error reported by the parquet crate.
        source: parquet::errors::ParquetError,
        /// Backtrace captured at the failure.
        backtrace: Backtrace,
    },

    /// A column chunk's path has no entry in the schema.
    #[snafu(display("column path '{path}' not found in schema"))]
    ColumnNotInSchema {
        /// The dotted path.
        path: String,
    },
}

impl InspectError {
    /// True for the index errors, which callers usually map to "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InspectError::RowGroupIndex { .. }
                | InspectError::ColumnIndex { .. }
                | InspectError::PageIndex { .. }
                | InspectError::ColumnNotInSchema { .. }
        )
    }
}
