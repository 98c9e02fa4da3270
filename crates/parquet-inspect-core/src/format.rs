//! Logical and converted type rendering.
//!
//! [`format_value`] turns a decoded scalar into the value a person expects to
//! see, using the owning schema element's annotations. Rules apply in this
//! order:
//!
//! 1. INT96 always renders as a nanosecond timestamp.
//! 2. Byte arrays with no annotation at all render as base64.
//! 3. A legacy converted type, when present, decides the rendering.
//! 4. Otherwise the logical type decides.
//!
//! Anything no rule covers passes through unchanged.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;

use crate::decode::DecodedValue;
use crate::metadata::{ConvertedType, LogicalType, PhysicalType, SchemaElement, TimeUnit};

pub mod bson;

/// Marker appended to truncated display strings.
pub const ELLIPSIS: &str = "...";

/// Julian day number of 1970-01-01.
const JULIAN_EPOCH_DAY: i64 = 2_440_588;
const NANOS_PER_DAY: i64 = 86_400 * 1_000_000_000;

/// A rendered value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DisplayValue {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer (reinterpreted from a signed physical value).
    UInt(u64),
    /// Single precision float, kept narrow so it renders canonically.
    Float32(f32),
    /// Double precision float.
    Float(f64),
    /// Text produced by a conversion rule, or lossy UTF-8.
    Text(String),
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Bool(v) => write!(f, "{v}"),
            DisplayValue::Int(v) => write!(f, "{v}"),
            DisplayValue::UInt(v) => write!(f, "{v}"),
            DisplayValue::Float32(v) => write!(f, "{v}"),
            DisplayValue::Float(v) => write!(f, "{v}"),
            DisplayValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&DecodedValue> for DisplayValue {
    fn from(value: &DecodedValue) -> Self {
        match value {
            DecodedValue::Bool(v) => DisplayValue::Bool(*v),
            DecodedValue::Int32(v) => DisplayValue::Int(i64::from(*v)),
            DecodedValue::Int64(v) => DisplayValue::Int(*v),
            DecodedValue::Float(v) => DisplayValue::Float32(*v),
            DecodedValue::Double(v) => DisplayValue::Float(*v),
            DecodedValue::Bytes(b) => DisplayValue::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

/// Render `value`, then cut text longer than `cap` characters.
pub fn format_for_display(
    value: &DecodedValue,
    physical: PhysicalType,
    element: &SchemaElement,
    cap: usize,
) -> DisplayValue {
    match format_value(value, physical, element) {
        DisplayValue::Text(s) => DisplayValue::Text(truncate_display(s, cap)),
        other => other,
    }
}

/// Cut `s` to `cap` characters followed by [`ELLIPSIS`].
pub fn truncate_display(s: String, cap: usize) -> String {
    match s.char_indices().nth(cap) {
        Some((byte_idx, _)) => {
            let mut cut = s;
            cut.truncate(byte_idx);
            cut.push_str(ELLIPSIS);
            cut
        }
        None => s,
    }
}

/// False for types whose min/max statistics carry no meaning.
pub fn has_meaningful_ordering(element: &SchemaElement) -> bool {
    let spatial = matches!(
        element.logical_type,
        Some(LogicalType::Geometry | LogicalType::Geography)
    );
    let interval = element.converted_type == Some(ConvertedType::Interval);
    !(spatial || interval)
}

/// Render a decoded scalar according to the element's annotations.
pub fn format_value(
    value: &DecodedValue,
    physical: PhysicalType,
    element: &SchemaElement,
) -> DisplayValue {
    if physical == PhysicalType::Int96 {
        return match value.as_bytes().and_then(int96_to_string) {
            Some(s) => DisplayValue::Text(s),
            None => passthrough(value),
        };
    }

    if physical.is_byte_array() && element.logical_type.is_none() && element.converted_type.is_none()
    {
        if let Some(bytes) = value.as_bytes() {
            return DisplayValue::Text(STANDARD.encode(bytes));
        }
    }

    if let Some(converted) = element.converted_type {
        return format_converted(value, converted, element);
    }

    match &element.logical_type {
        Some(logical) => format_logical(value, logical, element),
        None => passthrough(value),
    }
}

fn format_converted(
    value: &DecodedValue,
    converted: ConvertedType,
    element: &SchemaElement,
) -> DisplayValue {
    // Legacy time types are UTC-adjusted unless a logical type says otherwise.
    let is_utc = match element.logical_type {
        Some(LogicalType::Time { is_utc, .. } | LogicalType::Timestamp { is_utc, .. }) => is_utc,
        _ => true,
    };

    let rendered = match converted {
        ConvertedType::Utf8 | ConvertedType::Enum | ConvertedType::Json => text(value),
        ConvertedType::Decimal => decimal(value, element),
        ConvertedType::Date => value.as_i64().and_then(date_to_string),
        ConvertedType::TimeMillis => {
            value.as_i64().and_then(|v| time_to_string(v, TimeUnit::Millis, is_utc))
        }
        ConvertedType::TimeMicros => {
            value.as_i64().and_then(|v| time_to_string(v, TimeUnit::Micros, is_utc))
        }
        ConvertedType::TimestampMillis => value
            .as_i64()
            .and_then(|v| timestamp_to_string(v, TimeUnit::Millis, is_utc)),
        ConvertedType::TimestampMicros => value
            .as_i64()
            .and_then(|v| timestamp_to_string(v, TimeUnit::Micros, is_utc)),
        ConvertedType::Uint8
        | ConvertedType::Uint16
        | ConvertedType::Uint32
        | ConvertedType::Uint64 => return unsigned(value),
        ConvertedType::Int8
        | ConvertedType::Int16
        | ConvertedType::Int32
        | ConvertedType::Int64 => return passthrough(value),
        ConvertedType::Interval => value.as_bytes().and_then(interval_to_string),
        ConvertedType::Bson => value.as_bytes().map(bson_or_base64),
        ConvertedType::Map | ConvertedType::MapKeyValue | ConvertedType::List => None,
    };

    rendered.map_or_else(|| passthrough(value), DisplayValue::Text)
}

fn format_logical(
    value: &DecodedValue,
    logical: &LogicalType,
    element: &SchemaElement,
) -> DisplayValue {
    let rendered = match logical {
        LogicalType::String | LogicalType::Enum | LogicalType::Json => text(value),
        LogicalType::Decimal { .. } => decimal(value, element),
        LogicalType::Date => value.as_i64().and_then(date_to_string),
        LogicalType::Time { unit, is_utc } => {
            value.as_i64().and_then(|v| time_to_string(v, *unit, *is_utc))
        }
        LogicalType::Timestamp { unit, is_utc } => value
            .as_i64()
            .and_then(|v| timestamp_to_string(v, *unit, *is_utc)),
        LogicalType::Integer { signed: false, .. } => return unsigned(value),
        LogicalType::Integer { signed: true, .. } => return passthrough(value),
        LogicalType::Uuid => value.as_bytes().and_then(uuid_to_string),
        LogicalType::Bson => value.as_bytes().map(bson_or_base64),
        LogicalType::Float16 => {
            return match value.as_bytes() {
                Some([lo, hi]) => {
                    DisplayValue::Float32(f16_bits_to_f32(u16::from_le_bytes([*lo, *hi])))
                }
                _ => passthrough(value),
            };
        }
        LogicalType::Geometry | LogicalType::Geography | LogicalType::Variant => {
            value.as_bytes().map(|b| STANDARD.encode(b))
        }
        LogicalType::Map | LogicalType::List | LogicalType::Unknown => None,
    };

    rendered.map_or_else(|| passthrough(value), DisplayValue::Text)
}

fn passthrough(value: &DecodedValue) -> DisplayValue {
    DisplayValue::from(value)
}

fn text(value: &DecodedValue) -> Option<String> {
    value
        .as_bytes()
        .map(|b| String::from_utf8_lossy(b).into_owned())
}

fn unsigned(value: &DecodedValue) -> DisplayValue {
    match value {
        DecodedValue::Int32(v) => DisplayValue::UInt(u64::from(*v as u32)),
        DecodedValue::Int64(v) => DisplayValue::UInt(*v as u64),
        other => passthrough(other),
    }
}

fn bson_or_base64(bytes: &[u8]) -> String {
    bson::to_json_string(bytes).unwrap_or_else(|| STANDARD.encode(bytes))
}

// ---- decimals ----

fn decimal(value: &DecodedValue, element: &SchemaElement) -> Option<String> {
    // Precision bounds the digit count but does not change the rendering.
    let scale = match element.logical_type {
        Some(LogicalType::Decimal { scale, .. }) => scale,
        _ => element.scale.unwrap_or(0),
    };

    let unscaled = match value {
        DecodedValue::Int32(v) => i128::from(*v),
        DecodedValue::Int64(v) => i128::from(*v),
        DecodedValue::Bytes(b) => be_twos_complement(b)?,
        _ => return None,
    };
    Some(format_decimal(unscaled, scale))
}

/// Sign-extend a big-endian two's-complement integer of up to 16 bytes.
fn be_twos_complement(bytes: &[u8]) -> Option<i128> {
    if bytes.is_empty() || bytes.len() > 16 {
        return None;
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Some(i128::from_be_bytes(buf))
}

/// Exact rendering of `unscaled * 10^-scale`.
pub fn format_decimal(unscaled: i128, scale: i32) -> String {
    let negative = unscaled < 0;
    let mut digits = unscaled.unsigned_abs().to_string();

    if scale <= 0 {
        if unscaled != 0 {
            digits.extend(std::iter::repeat_n('0', scale.unsigned_abs() as usize));
        }
    } else {
        let scale = scale as usize;
        if digits.len() <= scale {
            let pad = scale + 1 - digits.len();
            digits.insert_str(0, &"0".repeat(pad));
        }
        digits.insert(digits.len() - scale, '.');
    }

    if negative {
        digits.insert(0, '-');
    }
    digits
}

// ---- dates and times ----

fn date_to_string(days: i64) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    let date = epoch.checked_add_signed(chrono::Duration::try_days(days)?)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn split_unit(value: i64, unit: TimeUnit) -> (i64, u32) {
    let per_sec = match unit {
        TimeUnit::Millis => 1_000,
        TimeUnit::Micros => 1_000_000,
        TimeUnit::Nanos => 1_000_000_000,
    };
    let secs = value.div_euclid(per_sec);
    let frac = value.rem_euclid(per_sec);
    let nanos = frac * (1_000_000_000 / per_sec);
    (secs, nanos as u32)
}

fn fraction_format(unit: TimeUnit) -> &'static str {
    match unit {
        TimeUnit::Millis => "%H:%M:%S%.3f",
        TimeUnit::Micros => "%H:%M:%S%.6f",
        TimeUnit::Nanos => "%H:%M:%S%.9f",
    }
}

fn time_to_string(value: i64, unit: TimeUnit, is_utc: bool) -> Option<String> {
    let (secs, nanos) = split_unit(value, unit);
    let secs = u32::try_from(secs).ok()?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)?;
    let mut out = time.format(fraction_format(unit)).to_string();
    if is_utc {
        out.push('Z');
    }
    Some(out)
}

fn ts_from_i64(value: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    let dt = match unit {
        TimeUnit::Millis => Utc.timestamp_millis_opt(value),
        TimeUnit::Micros => Utc.timestamp_micros(value),
        TimeUnit::Nanos => {
            let (secs, nanos) = split_unit(value, unit);
            Utc.timestamp_opt(secs, nanos)
        }
    };
    dt.single()
}

fn timestamp_to_string(value: i64, unit: TimeUnit, is_utc: bool) -> Option<String> {
    let dt = ts_from_i64(value, unit)?;
    if is_utc {
        let precision = match unit {
            TimeUnit::Millis => SecondsFormat::Millis,
            TimeUnit::Micros => SecondsFormat::Micros,
            TimeUnit::Nanos => SecondsFormat::Nanos,
        };
        Some(dt.to_rfc3339_opts(precision, true))
    } else {
        let pattern = match unit {
            TimeUnit::Millis => "%Y-%m-%dT%H:%M:%S%.3f",
            TimeUnit::Micros => "%Y-%m-%dT%H:%M:%S%.6f",
            TimeUnit::Nanos => "%Y-%m-%dT%H:%M:%S%.9f",
        };
        Some(dt.naive_utc().format(pattern).to_string())
    }
}

/// INT96: 8 bytes nanoseconds of day, then 4 bytes Julian day, both LE.
fn int96_to_string(bytes: &[u8]) -> Option<String> {
    let raw: [u8; 12] = bytes.try_into().ok()?;
    let nanos_of_day = i64::from_le_bytes(raw[..8].try_into().ok()?);
    let julian_day = i64::from(u32::from_le_bytes(raw[8..].try_into().ok()?));
    let nanos = (julian_day - JULIAN_EPOCH_DAY)
        .checked_mul(NANOS_PER_DAY)?
        .checked_add(nanos_of_day)?;
    timestamp_to_string(nanos, TimeUnit::Nanos, true)
}

// ---- fixed-size byte layouts ----

fn uuid_to_string(bytes: &[u8]) -> Option<String> {
    uuid::Uuid::from_slice(bytes)
        .ok()
        .map(|u| u.hyphenated().to_string())
}

fn interval_to_string(bytes: &[u8]) -> Option<String> {
    let raw: [u8; 12] = bytes.try_into().ok()?;
    let months = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let days = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
    let millis = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]);
    Some(format!("{months} months {days} days {millis} ms"))
}

/// IEEE-754 half to single precision, subnormals included.
fn f16_bits_to_f32(bits: u16) -> f32 {
    let b = u32::from(bits);
    let sign = (b & 0x8000) << 16;
    let exp = (b >> 10) & 0x1f;
    let frac = b & 0x03ff;

    match (exp, frac) {
        (0, 0) => f32::from_bits(sign),
        (0, _) => {
            let magnitude = frac as f32 * 2f32.powi(-24);
            if sign != 0 { -magnitude } else { magnitude }
        }
        (0x1f, 0) => f32::from_bits(sign | 0x7f80_0000),
        (0x1f, _) => f32::NAN,
        _ => f32::from_bits(sign | ((exp + 112) << 23) | (frac << 13)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Repetition;

    fn leaf(physical: PhysicalType) -> SchemaElement {
        SchemaElement {
            name: "c".to_string(),
            physical_type: Some(physical),
            type_length: None,
            repetition: Some(Repetition::Optional),
            logical_type: None,
            converted_type: None,
            precision: None,
            scale: None,
            num_children: 0,
        }
    }

    fn with_logical(physical: PhysicalType, logical: LogicalType) -> SchemaElement {
        SchemaElement {
            logical_type: Some(logical),
            ..leaf(physical)
        }
    }

    fn render(value: DecodedValue, element: &SchemaElement) -> String {
        let physical = element.physical_type.unwrap();
        format_value(&value, physical, element).to_string()
    }

    #[test]
    fn int64_decimal_is_scaled_exactly() {
        let el = SchemaElement {
            converted_type: Some(ConvertedType::Decimal),
            precision: Some(10),
            scale: Some(2),
            ..leaf(PhysicalType::Int64)
        };
        assert_eq!(render(DecodedValue::Int64(12345), &el), "123.45");
        assert_eq!(render(DecodedValue::Int64(-5), &el), "-0.05");
    }

    #[test]
    fn decimal_formatting_edges() {
        assert_eq!(format_decimal(-5, 3), "-0.005");
        assert_eq!(format_decimal(0, 2), "0.00");
        assert_eq!(format_decimal(7, 0), "7");
        assert_eq!(format_decimal(7, -2), "700");
    }

    #[test]
    fn byte_array_decimal_is_big_endian_twos_complement() {
        let el = with_logical(
            PhysicalType::FixedLenByteArray,
            LogicalType::Decimal {
                precision: 9,
                scale: 3,
            },
        );
        // -1234 as 4 bytes big-endian.
        let bytes = (-1234i32).to_be_bytes().to_vec();
        assert_eq!(render(DecodedValue::Bytes(bytes), &el), "-1.234");
    }

    #[test]
    fn int96_renders_as_nanosecond_timestamp() {
        let mut raw = (3_600_000_000_123i64).to_le_bytes().to_vec();
        raw.extend_from_slice(&(JULIAN_EPOCH_DAY as u32 + 1).to_le_bytes());
        let el = leaf(PhysicalType::Int96);
        assert_eq!(
            render(DecodedValue::Bytes(raw), &el),
            "1970-01-02T01:00:00.000000123Z"
        );
    }

    #[test]
    fn unannotated_bytes_are_base64() {
        let el = leaf(PhysicalType::ByteArray);
        assert_eq!(render(DecodedValue::Bytes(b"hi".to_vec()), &el), "aGk=");
    }

    #[test]
    fn strings_and_dates() {
        let el = with_logical(PhysicalType::ByteArray, LogicalType::String);
        assert_eq!(render(DecodedValue::Bytes(b"hello".to_vec()), &el), "hello");

        let el = with_logical(PhysicalType::Int32, LogicalType::Date);
        assert_eq!(render(DecodedValue::Int32(19_000), &el), "2022-01-08");
        assert_eq!(render(DecodedValue::Int32(-1), &el), "1969-12-31");
    }

    #[test]
    fn times_follow_unit_and_utc_flag() {
        let el = with_logical(
            PhysicalType::Int32,
            LogicalType::Time {
                unit: TimeUnit::Millis,
                is_utc: true,
            },
        );
        assert_eq!(render(DecodedValue::Int32(3_723_004), &el), "01:02:03.004Z");

        let el = with_logical(
            PhysicalType::Int64,
            LogicalType::Time {
                unit: TimeUnit::Nanos,
                is_utc: false,
            },
        );
        assert_eq!(
            render(DecodedValue::Int64(1_000_000_001), &el),
            "00:00:01.000000001"
        );
    }

    #[test]
    fn timestamps_follow_unit_and_utc_flag() {
        let el = with_logical(
            PhysicalType::Int64,
            LogicalType::Timestamp {
                unit: TimeUnit::Millis,
                is_utc: true,
            },
        );
        assert_eq!(
            render(DecodedValue::Int64(1_700_000_000_123), &el),
            "2023-11-14T22:13:20.123Z"
        );

        let el = with_logical(
            PhysicalType::Int64,
            LogicalType::Timestamp {
                unit: TimeUnit::Micros,
                is_utc: false,
            },
        );
        assert_eq!(
            render(DecodedValue::Int64(1_500_000), &el),
            "1970-01-01T00:00:01.500000"
        );
    }

    #[test]
    fn converted_timestamp_respects_local_logical_flag() {
        let el = SchemaElement {
            converted_type: Some(ConvertedType::TimestampMillis),
            ..with_logical(
                PhysicalType::Int64,
                LogicalType::Timestamp {
                    unit: TimeUnit::Millis,
                    is_utc: false,
                },
            )
        };
        assert_eq!(render(DecodedValue::Int64(0), &el), "1970-01-01T00:00:00.000");
    }

    #[test]
    fn uuid_interval_and_float16() {
        let el = with_logical(PhysicalType::FixedLenByteArray, LogicalType::Uuid);
        let bytes: Vec<u8> = (0u8..16).collect();
        assert_eq!(
            render(DecodedValue::Bytes(bytes), &el),
            "00010203-0405-0607-0809-0a0b0c0d0e0f"
        );

        let el = SchemaElement {
            converted_type: Some(ConvertedType::Interval),
            ..leaf(PhysicalType::FixedLenByteArray)
        };
        let mut raw = 1u32.to_le_bytes().to_vec();
        raw.extend_from_slice(&2u32.to_le_bytes());
        raw.extend_from_slice(&3u32.to_le_bytes());
        assert_eq!(render(DecodedValue::Bytes(raw), &el), "1 months 2 days 3 ms");

        let el = with_logical(PhysicalType::FixedLenByteArray, LogicalType::Float16);
        // 0x3e00 == 1.5
        assert_eq!(render(DecodedValue::Bytes(vec![0x00, 0x3e]), &el), "1.5");
        assert_eq!(f16_bits_to_f32(0x0001), 2f32.powi(-24));
        assert!(f16_bits_to_f32(0x7c00).is_infinite());
    }

    #[test]
    fn floats_keep_their_own_precision() {
        let el = leaf(PhysicalType::Float);
        let shown = format_value(&DecodedValue::Float(0.1), PhysicalType::Float, &el);
        assert_eq!(shown.to_string(), "0.1");
        assert_eq!(serde_json::to_string(&shown).unwrap(), "0.1");

        let el = leaf(PhysicalType::Double);
        assert_eq!(render(DecodedValue::Double(0.1), &el), "0.1");
    }

    #[test]
    fn unsigned_integers_are_reinterpreted() {
        let el = SchemaElement {
            converted_type: Some(ConvertedType::Uint32),
            ..leaf(PhysicalType::Int32)
        };
        assert_eq!(render(DecodedValue::Int32(-1), &el), "4294967295");

        let el = with_logical(
            PhysicalType::Int64,
            LogicalType::Integer {
                bit_width: 64,
                signed: false,
            },
        );
        assert_eq!(render(DecodedValue::Int64(-1), &el), "18446744073709551615");
    }

    #[test]
    fn bson_renders_as_json() {
        let el = with_logical(PhysicalType::ByteArray, LogicalType::Bson);
        let doc = bson::testing::sample_document();
        assert_eq!(
            render(DecodedValue::Bytes(doc), &el),
            r#"{"a":1,"ok":true,"s":"hi"}"#
        );
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_display("abcdef".to_string(), 3), "abc...");
        assert_eq!(truncate_display("abc".to_string(), 3), "abc");
        assert_eq!(truncate_display("ééééé".to_string(), 2), "éé...");

        let el = with_logical(PhysicalType::ByteArray, LogicalType::String);
        let long = DecodedValue::Bytes(vec![b'x'; 300]);
        let shown = format_for_display(&long, PhysicalType::ByteArray, &el, 200);
        assert_eq!(shown.to_string().chars().count(), 203);
    }

    #[test]
    fn spatial_and_interval_have_no_ordering() {
        assert!(!has_meaningful_ordering(&with_logical(
            PhysicalType::ByteArray,
            LogicalType::Geometry
        )));
        let el = SchemaElement {
            converted_type: Some(ConvertedType::Interval),
            ..leaf(PhysicalType::FixedLenByteArray)
        };
        assert!(!has_meaningful_ordering(&el));
        assert!(has_meaningful_ordering(&leaf(PhysicalType::Int32)));
    }
}
