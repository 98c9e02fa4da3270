//! Tunables for page walking and value rendering.

use serde::{Deserialize, Serialize};

/// Options shared by every query of an [`crate::Inspector`].
///
/// Missing fields take their defaults when deserialized, so a config file
/// only needs the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InspectOptions {
    /// Upper bound on pages walked in one column chunk.
    pub max_pages_per_chunk: usize,

    /// Bytes past the chunk's declared compressed size the walker may read
    /// before giving up.
    pub scan_slack_bytes: u64,

    /// Character cap for rendered statistics.
    pub stats_display_cap: usize,

    /// Character cap for rendered cell values.
    pub cell_display_cap: usize,

    /// Optional cap on values materialized per content request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_content_values: Option<usize>,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            max_pages_per_chunk: 100_000,
            scan_slack_bytes: 64 * 1024,
            stats_display_cap: 50,
            cell_display_cap: 200,
            max_content_values: None,
        }
    }
}

impl InspectOptions {
    /// Set the page cap.
    pub fn with_max_pages_per_chunk(mut self, pages: usize) -> Self {
        self.max_pages_per_chunk = pages;
        self
    }

    /// Set the slack margin in bytes.
    pub fn with_scan_slack_bytes(mut self, bytes: u64) -> Self {
        self.scan_slack_bytes = bytes;
        self
    }

    /// Set the statistics display cap.
    pub fn with_stats_display_cap(mut self, cap: usize) -> Self {
        self.stats_display_cap = cap;
        self
    }

    /// Set the cell display cap.
    pub fn with_cell_display_cap(mut self, cap: usize) -> Self {
        self.cell_display_cap = cap;
        self
    }

    /// Limit the number of values returned by a content request.
    pub fn with_max_content_values(mut self, limit: usize) -> Self {
        self.max_content_values = Some(limit);
        self
    }
}
