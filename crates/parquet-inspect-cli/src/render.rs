//! Table rendering for query results.

use parquet_inspect_core::inspector::{ColumnInfo, FileSummary, RowGroupInfo};
use parquet_inspect_core::metadata::SchemaElement;
use parquet_inspect_core::stats::{ABSENT, StatisticsSummary};
use parquet_inspect_core::{Page, PageContent, PageWalk};
use tabled::{builder::Builder, settings::Style};

fn render_table(columns: &[&str], rows: &[Vec<String>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Two-column `field | value` table for a single record.
fn render_fields(fields: Vec<(&str, String)>) -> String {
    let rows: Vec<Vec<String>> = fields
        .into_iter()
        .map(|(k, v)| vec![k.to_string(), v])
        .collect();
    render_table(&["field", "value"], &rows)
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
}

fn stats_cells(stats: Option<&StatisticsSummary>) -> [String; 3] {
    match stats {
        Some(s) => [s.min.clone(), s.max.clone(), opt(s.null_count)],
        None => [ABSENT.to_string(), ABSENT.to_string(), ABSENT.to_string()],
    }
}

pub fn summary(s: &FileSummary) -> String {
    let mut fields = vec![
        ("version", s.version.to_string()),
        ("created_by", opt(s.created_by.as_deref())),
        ("num_rows", s.num_rows.to_string()),
        ("num_row_groups", s.num_row_groups.to_string()),
        ("num_columns", s.num_columns.to_string()),
        ("total_compressed_size", s.total_compressed_size.to_string()),
        (
            "total_uncompressed_size",
            s.total_uncompressed_size.to_string(),
        ),
    ];
    for kv in &s.key_value_metadata {
        fields.push((kv.key.as_str(), opt(kv.value.as_deref())));
    }
    render_fields(fields)
}

pub fn row_groups(groups: &[RowGroupInfo]) -> String {
    let rows: Vec<Vec<String>> = groups
        .iter()
        .map(|g| {
            vec![
                g.index.to_string(),
                g.num_rows.to_string(),
                g.num_columns.to_string(),
                g.total_byte_size.to_string(),
                g.total_compressed_size.to_string(),
            ]
        })
        .collect();
    render_table(
        &["#", "rows", "columns", "uncompressed", "compressed"],
        &rows,
    )
}

pub fn columns(cols: &[ColumnInfo]) -> String {
    let rows: Vec<Vec<String>> = cols
        .iter()
        .map(|c| {
            let [min, max, nulls] = stats_cells(c.statistics.as_ref());
            vec![
                c.column.to_string(),
                c.path.clone(),
                c.physical_type.to_string(),
                opt(c.logical_type.as_ref()),
                c.codec.to_string(),
                c.num_values.to_string(),
                c.total_compressed_size.to_string(),
                min,
                max,
                nulls,
            ]
        })
        .collect();
    render_table(
        &[
            "#", "path", "physical", "logical", "codec", "values", "compressed", "min", "max",
            "nulls",
        ],
        &rows,
    )
}

pub fn column(c: &ColumnInfo) -> String {
    let [min, max, nulls] = stats_cells(c.statistics.as_ref());
    render_fields(vec![
        ("row_group", c.row_group.to_string()),
        ("column", c.column.to_string()),
        ("path", c.path.clone()),
        ("physical_type", c.physical_type.to_string()),
        ("logical_type", opt(c.logical_type.as_ref())),
        ("converted_type", opt(c.converted_type)),
        ("repetition", opt(c.repetition.map(|r| format!("{r:?}")))),
        ("codec", c.codec.to_string()),
        ("num_values", c.num_values.to_string()),
        ("dictionary_page_offset", opt(c.dictionary_page_offset)),
        ("data_page_offset", c.data_page_offset.to_string()),
        ("total_compressed_size", c.total_compressed_size.to_string()),
        (
            "total_uncompressed_size",
            c.total_uncompressed_size.to_string(),
        ),
        ("max_def_level", c.max_def_level.to_string()),
        ("max_rep_level", c.max_rep_level.to_string()),
        ("min", min),
        ("max", max),
        ("null_count", nulls),
    ])
}

pub fn pages(walk: &PageWalk) -> String {
    let rows: Vec<Vec<String>> = walk
        .pages
        .iter()
        .map(|p| {
            let [min, max, nulls] = stats_cells(p.statistics.as_ref());
            vec![
                p.index.to_string(),
                p.page_type.to_string(),
                p.offset.to_string(),
                p.header_size.to_string(),
                p.compressed_size.to_string(),
                p.uncompressed_size.to_string(),
                p.num_values.to_string(),
                opt(p.encoding),
                min,
                max,
                nulls,
            ]
        })
        .collect();
    let table = render_table(
        &[
            "#",
            "type",
            "offset",
            "header",
            "compressed",
            "uncompressed",
            "values",
            "encoding",
            "min",
            "max",
            "nulls",
        ],
        &rows,
    );
    format!(
        "{table}\nvalues read: {} ({:?})",
        walk.values_read, walk.stop
    )
}

pub fn page(p: &Page) -> String {
    let [min, max, nulls] = stats_cells(p.statistics.as_ref());
    let mut fields = vec![
        ("index", p.index.to_string()),
        ("type", p.page_type.to_string()),
        ("offset", p.offset.to_string()),
        ("header_size", p.header_size.to_string()),
        ("compressed_size", p.compressed_size.to_string()),
        ("uncompressed_size", p.uncompressed_size.to_string()),
        ("num_values", p.num_values.to_string()),
        ("encoding", opt(p.encoding)),
        ("has_crc", p.has_crc.to_string()),
        ("min", min),
        ("max", max),
        ("null_count", nulls),
    ];
    if let Some(entries) = p.dictionary_entries {
        fields.push(("dictionary_entries", entries.to_string()));
        fields.push(("is_sorted", opt(p.is_sorted)));
    }
    if p.num_rows.is_some() {
        fields.push(("num_nulls", opt(p.num_nulls)));
        fields.push(("num_rows", opt(p.num_rows)));
        fields.push(("is_compressed", opt(p.is_compressed)));
    }
    render_fields(fields)
}

pub fn content(c: &PageContent) -> String {
    let rows: Vec<Vec<String>> = c
        .display
        .iter()
        .enumerate()
        .map(|(i, v)| vec![i.to_string(), v.to_string()])
        .collect();
    let mut out = format!(
        "page {} ({}, {}): {} values, {} nulls\n",
        c.page_index, c.page_type, c.encoding, c.num_values, c.null_count
    );
    out.push_str(&render_table(&["#", "value"], &rows));
    if c.truncated {
        out.push_str("\n(truncated)");
    }
    out
}

pub fn schema_element(e: &SchemaElement) -> String {
    render_fields(vec![
        ("name", e.name.clone()),
        ("physical_type", opt(e.physical_type)),
        ("logical_type", opt(e.logical_type.as_ref())),
        ("converted_type", opt(e.converted_type)),
        ("repetition", opt(e.repetition.map(|r| format!("{r:?}")))),
        ("type_length", opt(e.type_length)),
        ("precision", opt(e.precision)),
        ("scale", opt(e.scale)),
        ("num_children", e.num_children.to_string()),
    ])
}
