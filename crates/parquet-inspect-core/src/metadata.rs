//! File, row-group, column-chunk and schema records.
//!
//! This module contains **pure** data types describing one Parquet file as
//! it was found on disk. Nothing here touches a byte source; the footer is
//! parsed once by [`footer`] and every record is immutable afterwards, so the
//! resulting [`FileMetadata`] can be shared between threads freely.
//!
//! The schema is kept in the file's own encoding: a flat, depth-first
//! pre-order list of [`SchemaElement`]s whose first entry is the synthetic
//! root. Tree structure is implied by `num_children` and reconstructed on
//! demand by [`crate::schema`].

use std::fmt;

use serde::Serialize;

pub mod footer;

/// On-disk scalar storage type of a leaf column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhysicalType {
    /// Single-bit boolean.
    Boolean,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Deprecated 96-bit value, used for legacy timestamps.
    Int96,
    /// IEEE-754 single precision float.
    Float,
    /// IEEE-754 double precision float.
    Double,
    /// Length-prefixed byte array.
    ByteArray,
    /// Byte array whose width is fixed by the schema.
    FixedLenByteArray,
}

impl PhysicalType {
    /// Width in bytes of one PLAIN-encoded value, if the type is fixed-width
    /// without schema context.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            PhysicalType::Boolean => Some(1),
            PhysicalType::Int32 | PhysicalType::Float => Some(4),
            PhysicalType::Int64 | PhysicalType::Double => Some(8),
            PhysicalType::Int96 => Some(12),
            PhysicalType::ByteArray | PhysicalType::FixedLenByteArray => None,
        }
    }

    /// True for the two byte-array flavours.
    pub fn is_byte_array(self) -> bool {
        matches!(
            self,
            PhysicalType::ByteArray | PhysicalType::FixedLenByteArray
        )
    }
}

impl TryFrom<i32> for PhysicalType {
    type Error = crate::error::InspectError;

    /// Map a Thrift `Type` id to a [`PhysicalType`].
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => PhysicalType::Boolean,
            1 => PhysicalType::Int32,
            2 => PhysicalType::Int64,
            3 => PhysicalType::Int96,
            4 => PhysicalType::Float,
            5 => PhysicalType::Double,
            6 => PhysicalType::ByteArray,
            7 => PhysicalType::FixedLenByteArray,
            other => {
                return Err(crate::error::InspectError::UnknownPhysicalType {
                    physical: other.to_string(),
                });
            }
        })
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhysicalType::Boolean => "BOOLEAN",
            PhysicalType::Int32 => "INT32",
            PhysicalType::Int64 => "INT64",
            PhysicalType::Int96 => "INT96",
            PhysicalType::Float => "FLOAT",
            PhysicalType::Double => "DOUBLE",
            PhysicalType::ByteArray => "BYTE_ARRAY",
            PhysicalType::FixedLenByteArray => "FIXED_LEN_BYTE_ARRAY",
        };
        f.write_str(name)
    }
}

/// Resolution of a time or timestamp logical type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    /// Milliseconds.
    Millis,
    /// Microseconds.
    Micros,
    /// Nanoseconds.
    Nanos,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeUnit::Millis => "MILLIS",
            TimeUnit::Micros => "MICROS",
            TimeUnit::Nanos => "NANOS",
        })
    }
}

/// Logical type annotation of a schema element.
///
/// A closed union: every annotation the format defines has exactly one
/// variant, so the formatter's dispatch is an exhaustive `match`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum LogicalType {
    /// UTF-8 string.
    String,
    /// Map group.
    Map,
    /// List group.
    List,
    /// Enum stored as a UTF-8 string.
    Enum,
    /// Fixed-point decimal.
    Decimal {
        /// Total number of digits.
        precision: i32,
        /// Digits after the decimal point.
        scale: i32,
    },
    /// Days since the Unix epoch.
    Date,
    /// Time of day.
    Time {
        /// Storage resolution.
        unit: TimeUnit,
        /// Whether the value is adjusted to UTC.
        is_utc: bool,
    },
    /// Instant or local date-time.
    Timestamp {
        /// Storage resolution.
        unit: TimeUnit,
        /// Whether the value is adjusted to UTC.
        is_utc: bool,
    },
    /// Integer with an explicit width and signedness.
    Integer {
        /// Width in bits (8, 16, 32 or 64).
        bit_width: i8,
        /// Whether the integer is signed.
        signed: bool,
    },
    /// 16-byte UUID.
    Uuid,
    /// JSON document stored as UTF-8.
    Json,
    /// BSON document.
    Bson,
    /// Half precision float stored in 2 bytes.
    Float16,
    /// Always-null column.
    Unknown,
    /// Semi-structured variant value.
    Variant,
    /// Geospatial geometry (WKB).
    Geometry,
    /// Geospatial geography (WKB).
    Geography,
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::String => f.write_str("STRING"),
            LogicalType::Map => f.write_str("MAP"),
            LogicalType::List => f.write_str("LIST"),
            LogicalType::Enum => f.write_str("ENUM"),
            LogicalType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({precision},{scale})")
            }
            LogicalType::Date => f.write_str("DATE"),
            LogicalType::Time { unit, is_utc } => write!(f, "TIME({unit},{is_utc})"),
            LogicalType::Timestamp { unit, is_utc } => write!(f, "TIMESTAMP({unit},{is_utc})"),
            LogicalType::Integer { bit_width, signed } => write!(f, "INTEGER({bit_width},{signed})"),
            LogicalType::Uuid => f.write_str("UUID"),
            LogicalType::Json => f.write_str("JSON"),
            LogicalType::Bson => f.write_str("BSON"),
            LogicalType::Float16 => f.write_str("FLOAT16"),
            LogicalType::Unknown => f.write_str("UNKNOWN"),
            LogicalType::Variant => f.write_str("VARIANT"),
            LogicalType::Geometry => f.write_str("GEOMETRY"),
            LogicalType::Geography => f.write_str("GEOGRAPHY"),
        }
    }
}

/// Legacy converted-type annotation, kept for files that predate
/// [`LogicalType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ConvertedType {
    Utf8,
    Map,
    MapKeyValue,
    List,
    Enum,
    Decimal,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Json,
    Bson,
    Interval,
}

impl fmt::Display for ConvertedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConvertedType::Utf8 => "UTF8",
            ConvertedType::Map => "MAP",
            ConvertedType::MapKeyValue => "MAP_KEY_VALUE",
            ConvertedType::List => "LIST",
            ConvertedType::Enum => "ENUM",
            ConvertedType::Decimal => "DECIMAL",
            ConvertedType::Date => "DATE",
            ConvertedType::TimeMillis => "TIME_MILLIS",
            ConvertedType::TimeMicros => "TIME_MICROS",
            ConvertedType::TimestampMillis => "TIMESTAMP_MILLIS",
            ConvertedType::TimestampMicros => "TIMESTAMP_MICROS",
            ConvertedType::Uint8 => "UINT_8",
            ConvertedType::Uint16 => "UINT_16",
            ConvertedType::Uint32 => "UINT_32",
            ConvertedType::Uint64 => "UINT_64",
            ConvertedType::Int8 => "INT_8",
            ConvertedType::Int16 => "INT_16",
            ConvertedType::Int32 => "INT_32",
            ConvertedType::Int64 => "INT_64",
            ConvertedType::Json => "JSON",
            ConvertedType::Bson => "BSON",
            ConvertedType::Interval => "INTERVAL",
        };
        f.write_str(name)
    }
}

/// Field repetition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Repetition {
    /// Exactly one value.
    Required,
    /// Zero or one value.
    Optional,
    /// Zero or more values.
    Repeated,
}

/// Compression codec of a column chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Codec {
    /// No compression.
    Uncompressed,
    /// Snappy raw block format.
    Snappy,
    /// Gzip stream.
    Gzip,
    /// LZO (recognized, not decodable).
    Lzo,
    /// Brotli (recognized, not decodable).
    Brotli,
    /// LZ4 frame format (Hadoop framing also accepted).
    Lz4,
    /// Zstandard.
    Zstd,
    /// LZ4 raw block format.
    Lz4Raw,
    /// Any codec id this crate does not know.
    Unknown(i32),
}

impl Codec {
    /// Map a Thrift `CompressionCodec` id.
    pub fn from_thrift(id: i32) -> Self {
        match id {
            0 => Codec::Uncompressed,
            1 => Codec::Snappy,
            2 => Codec::Gzip,
            3 => Codec::Lzo,
            4 => Codec::Brotli,
            5 => Codec::Lz4,
            6 => Codec::Zstd,
            7 => Codec::Lz4Raw,
            other => Codec::Unknown(other),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Uncompressed => f.write_str("UNCOMPRESSED"),
            Codec::Snappy => f.write_str("SNAPPY"),
            Codec::Gzip => f.write_str("GZIP"),
            Codec::Lzo => f.write_str("LZO"),
            Codec::Brotli => f.write_str("BROTLI"),
            Codec::Lz4 => f.write_str("LZ4"),
            Codec::Zstd => f.write_str("ZSTD"),
            Codec::Lz4Raw => f.write_str("LZ4_RAW"),
            Codec::Unknown(id) => write!(f, "UNKNOWN({id})"),
        }
    }
}

/// Kind of page found inside a column chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageType {
    /// Version 1 data page.
    DataPage,
    /// Index page.
    IndexPage,
    /// Dictionary page.
    DictionaryPage,
    /// Version 2 data page.
    DataPageV2,
}

impl PageType {
    /// Map a Thrift `PageType` id.
    pub fn from_thrift(id: i32) -> Option<Self> {
        match id {
            0 => Some(PageType::DataPage),
            1 => Some(PageType::IndexPage),
            2 => Some(PageType::DictionaryPage),
            3 => Some(PageType::DataPageV2),
            _ => None,
        }
    }

    /// True for pages whose values count toward the chunk's value total.
    pub fn is_data(self) -> bool {
        matches!(self, PageType::DataPage | PageType::DataPageV2)
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageType::DataPage => "DATA_PAGE",
            PageType::IndexPage => "INDEX_PAGE",
            PageType::DictionaryPage => "DICTIONARY_PAGE",
            PageType::DataPageV2 => "DATA_PAGE_V2",
        })
    }
}

/// Value or level encoding of a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Encoding {
    Plain,
    PlainDictionary,
    Rle,
    BitPacked,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
    DeltaByteArray,
    RleDictionary,
    ByteStreamSplit,
    /// Any encoding id this crate does not know.
    Unknown(i32),
}

impl Encoding {
    /// Map a Thrift `Encoding` id.
    pub fn from_thrift(id: i32) -> Self {
        match id {
            0 => Encoding::Plain,
            2 => Encoding::PlainDictionary,
            3 => Encoding::Rle,
            4 => Encoding::BitPacked,
            5 => Encoding::DeltaBinaryPacked,
            6 => Encoding::DeltaLengthByteArray,
            7 => Encoding::DeltaByteArray,
            8 => Encoding::RleDictionary,
            9 => Encoding::ByteStreamSplit,
            other => Encoding::Unknown(other),
        }
    }

    /// True for the two dictionary-index encodings.
    pub fn is_dictionary(self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Plain => f.write_str("PLAIN"),
            Encoding::PlainDictionary => f.write_str("PLAIN_DICTIONARY"),
            Encoding::Rle => f.write_str("RLE"),
            Encoding::BitPacked => f.write_str("BIT_PACKED"),
            Encoding::DeltaBinaryPacked => f.write_str("DELTA_BINARY_PACKED"),
            Encoding::DeltaLengthByteArray => f.write_str("DELTA_LENGTH_BYTE_ARRAY"),
            Encoding::DeltaByteArray => f.write_str("DELTA_BYTE_ARRAY"),
            Encoding::RleDictionary => f.write_str("RLE_DICTIONARY"),
            Encoding::ByteStreamSplit => f.write_str("BYTE_STREAM_SPLIT"),
            Encoding::Unknown(id) => write!(f, "UNKNOWN({id})"),
        }
    }
}

/// One entry of the flat pre-order schema list.
///
/// A leaf carries a physical type and no children; a group carries children
/// and no physical type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SchemaElement {
    /// Field name as written in the file.
    pub name: String,
    /// Physical type; present only on leaves.
    pub physical_type: Option<PhysicalType>,
    /// Width of a fixed-length byte array.
    pub type_length: Option<i32>,
    /// Repetition; absent on the root.
    pub repetition: Option<Repetition>,
    /// Logical type annotation.
    pub logical_type: Option<LogicalType>,
    /// Legacy converted type annotation.
    pub converted_type: Option<ConvertedType>,
    /// Decimal precision from the legacy fields.
    pub precision: Option<i32>,
    /// Decimal scale from the legacy fields.
    pub scale: Option<i32>,
    /// Number of direct children (0 for leaves).
    pub num_children: usize,
}

impl SchemaElement {
    /// True when the element stores values.
    pub fn is_leaf(&self) -> bool {
        self.physical_type.is_some()
    }
}

/// Min/max/null-count statistics exactly as stored in the file.
///
/// Both the current (`min_value`/`max_value`) and the deprecated
/// (`min`/`max`) fields are kept; [`RawStatistics::effective_min`] and
/// [`RawStatistics::effective_max`] apply the precedence rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawStatistics {
    /// Deprecated minimum.
    pub min: Option<Vec<u8>>,
    /// Deprecated maximum.
    pub max: Option<Vec<u8>>,
    /// Current minimum.
    pub min_value: Option<Vec<u8>>,
    /// Current maximum.
    pub max_value: Option<Vec<u8>>,
    /// Number of nulls.
    pub null_count: Option<i64>,
    /// Number of distinct values.
    pub distinct_count: Option<i64>,
}

impl RawStatistics {
    /// Minimum bytes after preferring the current field; empty when absent.
    pub fn effective_min(&self) -> &[u8] {
        prefer_current(self.min_value.as_deref(), self.min.as_deref())
    }

    /// Maximum bytes after preferring the current field; empty when absent.
    pub fn effective_max(&self) -> &[u8] {
        prefer_current(self.max_value.as_deref(), self.max.as_deref())
    }
}

fn prefer_current<'a>(current: Option<&'a [u8]>, deprecated: Option<&'a [u8]>) -> &'a [u8] {
    match (current, deprecated) {
        (Some(c), _) if !c.is_empty() => c,
        (_, Some(d)) => d,
        _ => &[],
    }
}

/// Metadata of one column chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnChunk {
    /// Names from the root (exclusive) to the leaf.
    pub path_in_schema: Vec<String>,
    /// Physical type of the leaf.
    pub physical_type: PhysicalType,
    /// Compression codec used for every page of the chunk.
    pub codec: Codec,
    /// Declared number of values (including nulls).
    pub num_values: i64,
    /// Offset of the dictionary page, if any.
    pub dictionary_page_offset: Option<i64>,
    /// Offset of the first data page.
    pub data_page_offset: i64,
    /// Total compressed size of the chunk, headers included.
    pub total_compressed_size: i64,
    /// Total uncompressed size of the chunk, headers included.
    pub total_uncompressed_size: i64,
    /// Column-level statistics.
    pub statistics: Option<RawStatistics>,
    /// Maximum definition level of the leaf.
    pub max_def_level: i16,
    /// Maximum repetition level of the leaf.
    pub max_rep_level: i16,
}

impl ColumnChunk {
    /// Offset of the first page: the dictionary page when one is present,
    /// otherwise the first data page.
    ///
    /// Some writers emit `0` (or a bogus value past the data page) when
    /// there is no dictionary; those are treated as absent.
    pub fn start_offset(&self) -> u64 {
        let start = match self.dictionary_page_offset {
            Some(dict) if dict > 0 && dict < self.data_page_offset => dict,
            _ => self.data_page_offset,
        };
        u64::try_from(start).unwrap_or(0)
    }

    /// The schema path joined with `.`.
    pub fn dotted_path(&self) -> String {
        self.path_in_schema.join(".")
    }
}

/// Metadata of one row group.
#[derive(Clone, Debug, PartialEq)]
pub struct RowGroup {
    /// Position in the file.
    pub ordinal: usize,
    /// Number of rows.
    pub num_rows: i64,
    /// Declared uncompressed byte size.
    pub total_byte_size: i64,
    /// Compressed byte size, summed over the column chunks.
    pub total_compressed_size: i64,
    /// Column chunks in leaf order.
    pub columns: Vec<ColumnChunk>,
}

/// One key/value metadata pair from the footer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyValueEntry {
    /// Key.
    pub key: String,
    /// Optional value.
    pub value: Option<String>,
}

/// Everything the footer describes about a file.
#[derive(Clone, Debug, PartialEq)]
pub struct FileMetadata {
    /// Format version.
    pub version: i32,
    /// Declared total row count.
    pub num_rows: i64,
    /// Writer identification string.
    pub created_by: Option<String>,
    /// Application key/value metadata.
    pub key_value_metadata: Vec<KeyValueEntry>,
    /// Flat pre-order schema; index 0 is the root.
    pub schema: Vec<SchemaElement>,
    /// Row groups in file order.
    pub row_groups: Vec<RowGroup>,
}

impl FileMetadata {
    /// Number of leaf columns described by the schema.
    pub fn num_leaf_columns(&self) -> usize {
        crate::schema::leaves(&self.schema).count()
    }
}
