//! Min/max/null-count summaries for pages and column chunks.

use log::warn;
use serde::Serialize;

use crate::decode::{DecodedValue, decode_plain};
use crate::format::{format_for_display, has_meaningful_ordering, truncate_display};
use crate::metadata::{PhysicalType, RawStatistics, SchemaElement};

/// Shown when a statistic is missing or empty.
pub const ABSENT: &str = "-";

/// Shown for min/max of types without a meaningful ordering.
pub const NOT_APPLICABLE: &str = "N/A";

/// Rendered statistics of one page or column chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatisticsSummary {
    /// Rendered minimum.
    pub min: String,
    /// Rendered maximum.
    pub max: String,
    /// Null count, as stored.
    pub null_count: Option<i64>,
    /// Distinct count, as stored.
    pub distinct_count: Option<i64>,
}

/// Render `raw` for a column of type `physical` described by `element`.
///
/// Current min/max fields win over the deprecated ones. Each string is
/// capped at `cap` characters.
pub fn summarize(
    raw: &RawStatistics,
    physical: PhysicalType,
    element: &SchemaElement,
    cap: usize,
) -> StatisticsSummary {
    let (min, max) = if has_meaningful_ordering(element) {
        (
            render_bound(raw.effective_min(), physical, element, cap),
            render_bound(raw.effective_max(), physical, element, cap),
        )
    } else {
        (NOT_APPLICABLE.to_string(), NOT_APPLICABLE.to_string())
    };

    StatisticsSummary {
        min,
        max,
        null_count: raw.null_count,
        distinct_count: raw.distinct_count,
    }
}

/// Render one min or max byte string.
///
/// Statistics store byte arrays without the PLAIN length prefix, so those
/// bytes are the value itself.
pub fn render_bound(
    bytes: &[u8],
    physical: PhysicalType,
    element: &SchemaElement,
    cap: usize,
) -> String {
    if bytes.is_empty() {
        return ABSENT.to_string();
    }

    let value = if physical.is_byte_array() {
        DecodedValue::Bytes(bytes.to_vec())
    } else {
        match decode_plain(bytes, physical, 1) {
            Ok(values) => match values.into_iter().next() {
                Some(v) => v,
                None => return ABSENT.to_string(),
            },
            Err(e) => {
                warn!("statistic for column '{}' failed to decode: {e}", element.name);
                return truncate_display(e.to_string(), cap);
            }
        }
    };

    format_for_display(&value, physical, element, cap).to_string()
}
