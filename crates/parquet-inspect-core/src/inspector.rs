//! Read-only query interface over one Parquet file.
//!
//! An [`Inspector`] owns the parsed footer and a [`ByteSource`]. Every query
//! opens its own cursor on the source, so one inspector can serve many
//! threads at once without locking.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use log::debug;
use serde::Serialize;
use snafu::prelude::*;

use crate::config::InspectOptions;
use crate::error::{
    ColumnIndexSnafu, ColumnNotInSchemaSnafu, InspectResult, OpenFileSnafu, PageIndexSnafu,
    RowGroupIndexSnafu,
};
use crate::metadata::footer;
use crate::metadata::{
    Codec, ColumnChunk, ConvertedType, FileMetadata, KeyValueEntry, LogicalType, PageType,
    PhysicalType, Repetition, RowGroup, SchemaElement,
};
use crate::page::{Page, PageContent, PageWalk, enumerate_pages, read_page_content};
use crate::schema::{resolve_dotted, resolve_path};
use crate::stats::{StatisticsSummary, summarize};

/// Where the file bytes live.
#[derive(Clone, Debug)]
pub enum ByteSource {
    /// A file on the local filesystem, reopened for every operation.
    Local(PathBuf),
    /// An in-memory copy of the whole file.
    Memory(Bytes),
}

impl ByteSource {
    /// Open an independent cursor positioned at the start of the file.
    pub fn open(&self) -> InspectResult<SourceReader> {
        match self {
            ByteSource::Local(path) => {
                let file = File::open(path).context(OpenFileSnafu {
                    path: path.display().to_string(),
                })?;
                Ok(SourceReader::File(BufReader::new(file)))
            }
            ByteSource::Memory(bytes) => Ok(SourceReader::Memory(Cursor::new(bytes.clone()))),
        }
    }
}

/// A cursor handed out by [`ByteSource::open`].
#[derive(Debug)]
pub enum SourceReader {
    /// Buffered file handle.
    File(BufReader<File>),
    /// Cursor over shared bytes.
    Memory(Cursor<Bytes>),
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SourceReader::File(r) => r.read(buf),
            SourceReader::Memory(r) => r.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            SourceReader::File(r) => r.seek(pos),
            SourceReader::Memory(r) => r.seek(pos),
        }
    }
}

/// File-level summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileSummary {
    /// Format version.
    pub version: i32,
    /// Writer identification string.
    pub created_by: Option<String>,
    /// Declared total row count.
    pub num_rows: i64,
    /// Number of row groups.
    pub num_row_groups: usize,
    /// Number of leaf columns.
    pub num_columns: usize,
    /// Compressed size summed over row groups.
    pub total_compressed_size: i64,
    /// Uncompressed size summed over row groups.
    pub total_uncompressed_size: i64,
    /// Application key/value metadata.
    pub key_value_metadata: Vec<KeyValueEntry>,
}

/// One row group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RowGroupInfo {
    /// Position in the file.
    pub index: usize,
    /// Number of rows.
    pub num_rows: i64,
    /// Declared uncompressed byte size.
    pub total_byte_size: i64,
    /// Compressed byte size.
    pub total_compressed_size: i64,
    /// Number of column chunks.
    pub num_columns: usize,
}

/// One column chunk with its schema metadata and rendered statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnInfo {
    /// Row group index.
    pub row_group: usize,
    /// Column index within the row group.
    pub column: usize,
    /// Dotted path in the schema.
    pub path: String,
    /// Physical type.
    pub physical_type: PhysicalType,
    /// Logical type of the leaf, if any.
    pub logical_type: Option<LogicalType>,
    /// Legacy converted type of the leaf, if any.
    pub converted_type: Option<ConvertedType>,
    /// Repetition of the leaf.
    pub repetition: Option<Repetition>,
    /// Compression codec.
    pub codec: Codec,
    /// Declared value count, nulls included.
    pub num_values: i64,
    /// Offset of the dictionary page, if any.
    pub dictionary_page_offset: Option<i64>,
    /// Offset of the first data page.
    pub data_page_offset: i64,
    /// Compressed size of the chunk.
    pub total_compressed_size: i64,
    /// Uncompressed size of the chunk.
    pub total_uncompressed_size: i64,
    /// Rendered column statistics.
    pub statistics: Option<StatisticsSummary>,
    /// Maximum definition level.
    pub max_def_level: i16,
    /// Maximum repetition level.
    pub max_rep_level: i16,
}

/// Query handle over one open file.
#[derive(Clone, Debug)]
pub struct Inspector {
    source: ByteSource,
    metadata: Arc<FileMetadata>,
    options: Arc<InspectOptions>,
}

impl Inspector {
    /// Open the file at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> InspectResult<Self> {
        Self::open_with_options(path, InspectOptions::default())
    }

    /// Open the file at `path`.
    pub fn open_with_options(
        path: impl AsRef<Path>,
        options: InspectOptions,
    ) -> InspectResult<Self> {
        let path = path.as_ref();
        let metadata = footer::load_from_path(path)?;
        debug!(
            "opened {}: {} row groups, {} rows",
            path.display(),
            metadata.row_groups.len(),
            metadata.num_rows
        );
        Ok(Self::with_metadata(
            ByteSource::Local(path.to_path_buf()),
            metadata,
            options,
        ))
    }

    /// Inspect an in-memory file with default options.
    pub fn from_bytes(data: Bytes) -> InspectResult<Self> {
        Self::from_bytes_with_options(data, InspectOptions::default())
    }

    /// Inspect an in-memory file.
    pub fn from_bytes_with_options(data: Bytes, options: InspectOptions) -> InspectResult<Self> {
        let metadata = footer::load_from_bytes(data.clone())?;
        Ok(Self::with_metadata(
            ByteSource::Memory(data),
            metadata,
            options,
        ))
    }

    pub(crate) fn with_metadata(
        source: ByteSource,
        metadata: FileMetadata,
        options: InspectOptions,
    ) -> Self {
        Self {
            source,
            metadata: Arc::new(metadata),
            options: Arc::new(options),
        }
    }

    /// The parsed footer.
    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// Options in effect.
    pub fn options(&self) -> &InspectOptions {
        &self.options
    }

    /// File-level summary.
    pub fn summary(&self) -> FileSummary {
        let meta = &self.metadata;
        FileSummary {
            version: meta.version,
            created_by: meta.created_by.clone(),
            num_rows: meta.num_rows,
            num_row_groups: meta.row_groups.len(),
            num_columns: meta.num_leaf_columns(),
            total_compressed_size: meta.row_groups.iter().map(|rg| rg.total_compressed_size).sum(),
            total_uncompressed_size: meta.row_groups.iter().map(|rg| rg.total_byte_size).sum(),
            key_value_metadata: meta.key_value_metadata.clone(),
        }
    }

    /// Every row group in file order.
    pub fn list_row_groups(&self) -> Vec<RowGroupInfo> {
        self.metadata.row_groups.iter().map(row_group_info).collect()
    }

    /// One row group.
    pub fn row_group(&self, rg: i64) -> InspectResult<RowGroupInfo> {
        self.row_group_meta(rg).map(row_group_info)
    }

    /// Every column chunk of row group `rg`.
    pub fn list_columns(&self, rg: i64) -> InspectResult<Vec<ColumnInfo>> {
        let group = self.row_group_meta(rg)?;
        group
            .columns
            .iter()
            .enumerate()
            .map(|(col, chunk)| self.column_info(group.ordinal, col, chunk))
            .collect()
    }

    /// Column chunk `col` of row group `rg`.
    pub fn column(&self, rg: i64, col: i64) -> InspectResult<ColumnInfo> {
        let (group, col, chunk) = self.chunk_meta(rg, col)?;
        self.column_info(group.ordinal, col, chunk)
    }

    /// Walk the pages of column chunk `col` of row group `rg`.
    pub fn list_pages(&self, rg: i64, col: i64) -> InspectResult<PageWalk> {
        let (_, _, chunk) = self.chunk_meta(rg, col)?;
        let element = self.element_for(chunk)?;
        let mut reader = self.source.open()?;
        Ok(enumerate_pages(&mut reader, chunk, element, &self.options))
    }

    /// Page `page` of column chunk `col` of row group `rg`.
    pub fn page(&self, rg: i64, col: i64, page: i64) -> InspectResult<Page> {
        let walk = self.list_pages(rg, col)?;
        let idx = checked_index(page, walk.pages.len()).context(PageIndexSnafu {
            index: page,
            count: walk.pages.len(),
        })?;
        Ok(walk.pages[idx].clone())
    }

    /// Decoded values of page `page` of column chunk `col` of row group `rg`.
    pub fn page_content(&self, rg: i64, col: i64, page: i64) -> InspectResult<PageContent> {
        let (_, _, chunk) = self.chunk_meta(rg, col)?;
        let element = self.element_for(chunk)?;
        let mut reader = self.source.open()?;
        let walk = enumerate_pages(&mut reader, chunk, element, &self.options);

        let idx = checked_index(page, walk.pages.len()).context(PageIndexSnafu {
            index: page,
            count: walk.pages.len(),
        })?;
        let dictionary = walk
            .pages
            .iter()
            .find(|p| p.page_type == PageType::DictionaryPage);

        read_page_content(
            &mut reader,
            chunk,
            element,
            &walk.pages[idx],
            dictionary,
            &self.options,
        )
    }

    /// Resolve a dotted column path against the schema.
    pub fn resolve_column(&self, path: &str) -> InspectResult<SchemaElement> {
        resolve_dotted(&self.metadata.schema, path)
            .cloned()
            .context(ColumnNotInSchemaSnafu { path })
    }

    fn row_group_meta(&self, rg: i64) -> InspectResult<&RowGroup> {
        let groups = &self.metadata.row_groups;
        let idx = checked_index(rg, groups.len()).context(RowGroupIndexSnafu {
            index: rg,
            count: groups.len(),
        })?;
        Ok(&groups[idx])
    }

    /// Column index is checked against the leaf count before the row group
    /// index is looked at.
    fn chunk_meta(&self, rg: i64, col: i64) -> InspectResult<(&RowGroup, usize, &ColumnChunk)> {
        let leaf_count = self.metadata.num_leaf_columns();
        let col_idx = checked_index(col, leaf_count).context(ColumnIndexSnafu {
            index: col,
            count: leaf_count,
        })?;
        let group = self.row_group_meta(rg)?;
        let chunk = group.columns.get(col_idx).context(ColumnIndexSnafu {
            index: col,
            count: group.columns.len(),
        })?;
        Ok((group, col_idx, chunk))
    }

    fn element_for(&self, chunk: &ColumnChunk) -> InspectResult<&SchemaElement> {
        resolve_path(&self.metadata.schema, &chunk.path_in_schema).context(
            ColumnNotInSchemaSnafu {
                path: chunk.dotted_path(),
            },
        )
    }

    fn column_info(&self, rg: usize, col: usize, chunk: &ColumnChunk) -> InspectResult<ColumnInfo> {
        let element = self.element_for(chunk)?;
        let statistics = chunk.statistics.as_ref().map(|raw| {
            summarize(
                raw,
                chunk.physical_type,
                element,
                self.options.stats_display_cap,
            )
        });
        Ok(ColumnInfo {
            row_group: rg,
            column: col,
            path: chunk.dotted_path(),
            physical_type: chunk.physical_type,
            logical_type: element.logical_type.clone(),
            converted_type: element.converted_type,
            repetition: element.repetition,
            codec: chunk.codec,
            num_values: chunk.num_values,
            dictionary_page_offset: chunk.dictionary_page_offset,
            data_page_offset: chunk.data_page_offset,
            total_compressed_size: chunk.total_compressed_size,
            total_uncompressed_size: chunk.total_uncompressed_size,
            statistics,
            max_def_level: chunk.max_def_level,
            max_rep_level: chunk.max_rep_level,
        })
    }
}

fn row_group_info(rg: &RowGroup) -> RowGroupInfo {
    RowGroupInfo {
        index: rg.ordinal,
        num_rows: rg.num_rows,
        total_byte_size: rg.total_byte_size,
        total_compressed_size: rg.total_compressed_size,
        num_columns: rg.columns.len(),
    }
}

fn checked_index(index: i64, count: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|i| *i < count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecodedValue;
    use crate::error::InspectError;
    use crate::page::enumerate::testing::{dictionary_chunk, int32_leaf};

    /// An inspector over a hand-built single-column file.
    fn inspector() -> Inspector {
        let (bytes, chunk) = dictionary_chunk(&[10, 20, 30], &[&[0, 1, 2], &[2, 2, 1, 0]]);
        let mut root = int32_leaf();
        root.name = "schema".to_string();
        root.physical_type = None;
        root.repetition = None;
        root.num_children = 1;

        let metadata = FileMetadata {
            version: 1,
            num_rows: 7,
            created_by: Some("hand".to_string()),
            key_value_metadata: Vec::new(),
            schema: vec![root, int32_leaf()],
            row_groups: vec![RowGroup {
                ordinal: 0,
                num_rows: 7,
                total_byte_size: chunk.total_uncompressed_size,
                total_compressed_size: chunk.total_compressed_size,
                columns: vec![chunk],
            }],
        };
        Inspector::with_metadata(
            ByteSource::Memory(Bytes::from(bytes)),
            metadata,
            InspectOptions::default(),
        )
    }

    #[test]
    fn checked_index_rejects_negative_and_past_end() {
        assert_eq!(checked_index(-1, 3), None);
        assert_eq!(checked_index(3, 3), None);
        assert_eq!(checked_index(2, 3), Some(2));
    }

    #[test]
    fn page_content_resolves_the_chunk_dictionary() {
        let insp = inspector();
        let content = insp.page_content(0, 0, 2).unwrap();
        assert_eq!(
            content.values,
            vec![
                DecodedValue::Int32(30),
                DecodedValue::Int32(30),
                DecodedValue::Int32(20),
                DecodedValue::Int32(10),
            ]
        );
    }

    #[test]
    fn column_index_is_checked_before_row_group_index() {
        let insp = inspector();
        let err = insp.column(99, 5).unwrap_err();
        assert!(matches!(err, InspectError::ColumnIndex { index: 5, count: 1 }));
        let err = insp.column(99, 0).unwrap_err();
        assert!(matches!(err, InspectError::RowGroupIndex { index: 99, .. }));
    }

    #[test]
    fn page_index_bounds() {
        let insp = inspector();
        for bad in [-1, 3] {
            let err = insp.page(0, 0, bad).unwrap_err();
            assert!(matches!(err, InspectError::PageIndex { count: 3, .. }));
        }
        let err = insp.page_content(0, 0, 0).unwrap_err();
        assert!(matches!(err, InspectError::NotDataPage { index: 0, .. }));
    }

    #[test]
    fn inspector_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Inspector>();
    }

    #[test]
    fn resolve_column_reports_missing_paths() {
        let insp = inspector();
        assert_eq!(insp.resolve_column("V").unwrap().name, "v");
        let err = insp.resolve_column("nope").unwrap_err();
        assert!(err.is_not_found());
    }
}
