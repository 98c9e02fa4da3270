//! Page-level introspection engine for Apache Parquet files.
//!
//! This crate exposes the physical structure of a Parquet file (row groups,
//! column chunks, pages) together with decoded and rendered cell values:
//!
//! - Flat pre-order schema resolution for dotted column paths (`schema`).
//! - A compact-Thrift page header reader that works at arbitrary byte
//!   offsets without a sequential scan (`thrift`, `page::header`).
//! - A page walker that follows header and payload sizes through one column
//!   chunk (`page::enumerate`).
//! - Payload decompression for every codec the format defines (`codec`).
//! - Plain and hybrid RLE decoding of values and levels (`decode`, `rle`).
//! - Logical/converted type rendering: decimals, dates, timestamps, UUIDs,
//!   BSON, intervals, float16 (`format`, `stats`).
//!
//! [`Inspector`] ties these together behind a read-only query interface.
//! Presentation layers (the `pqinspect` CLI, an HTTP front end) depend on
//! this crate and only render the records it returns.
#![deny(missing_docs)]
pub mod codec;
pub mod config;
pub mod decode;
pub mod error;
pub mod format;
pub mod inspector;
pub mod metadata;
pub mod page;
pub mod rle;
pub mod schema;
pub mod stats;
pub mod thrift;

pub use config::InspectOptions;
pub use error::{InspectError, InspectResult};
pub use inspector::{ByteSource, ColumnInfo, FileSummary, Inspector, RowGroupInfo};
pub use page::{Page, PageContent, PageWalk, StopReason};
