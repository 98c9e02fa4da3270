//! PLAIN decoding of primitive values.
//!
//! Values are little-endian and byte-packed. Decoding is best-effort: the
//! moment the buffer cannot hold the next value, decoding stops and the
//! values read so far are returned. Partially available page data is common
//! (truncated statistics, short pages) and a partial answer is more useful to
//! an inspector than none.

use serde::{Serialize, Serializer};

use crate::error::{FixedLenNeedsSchemaSnafu, InspectResult};
use crate::metadata::PhysicalType;

/// One decoded scalar.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedValue {
    /// BOOLEAN.
    Bool(bool),
    /// INT32.
    Int32(i32),
    /// INT64.
    Int64(i64),
    /// FLOAT.
    Float(f32),
    /// DOUBLE.
    Double(f64),
    /// BYTE_ARRAY, FIXED_LEN_BYTE_ARRAY and INT96 payloads.
    Bytes(Vec<u8>),
}

impl DecodedValue {
    /// Raw bytes, when the value is a byte sequence.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DecodedValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The value widened to `i64`, when it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DecodedValue::Int32(v) => Some(i64::from(*v)),
            DecodedValue::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

// Byte sequences are exposed as text.
impl Serialize for DecodedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DecodedValue::Bool(v) => serializer.serialize_bool(*v),
            DecodedValue::Int32(v) => serializer.serialize_i32(*v),
            DecodedValue::Int64(v) => serializer.serialize_i64(*v),
            DecodedValue::Float(v) => serializer.serialize_f32(*v),
            DecodedValue::Double(v) => serializer.serialize_f64(*v),
            DecodedValue::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
        }
    }
}

/// Decode up to `count` PLAIN values of `physical` from `buf`.
///
/// Booleans use one byte each (low bit). FIXED_LEN_BYTE_ARRAY needs the
/// schema width and fails with [`crate::InspectError::FixedLenNeedsSchema`];
/// use [`decode_plain_fixed_len`] instead.
pub fn decode_plain(
    buf: &[u8],
    physical: PhysicalType,
    count: usize,
) -> InspectResult<Vec<DecodedValue>> {
    let mut out = Vec::with_capacity(count.min(buf.len()));
    let mut pos = 0usize;

    match physical {
        PhysicalType::FixedLenByteArray => return FixedLenNeedsSchemaSnafu.fail(),
        PhysicalType::ByteArray => {
            while out.len() < count {
                let Some(prefix) = buf.get(pos..pos + 4) else {
                    break;
                };
                let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
                let start = pos + 4;
                let Some(bytes) = start.checked_add(len).and_then(|end| buf.get(start..end)) else {
                    break;
                };
                out.push(DecodedValue::Bytes(bytes.to_vec()));
                pos = start + len;
            }
        }
        fixed => {
            // fixed_width is Some for every remaining type.
            let width = fixed.fixed_width().unwrap_or(1);
            for chunk in buf.chunks_exact(width).take(count) {
                out.push(decode_fixed(fixed, chunk));
            }
        }
    }

    Ok(out)
}

fn decode_fixed(physical: PhysicalType, chunk: &[u8]) -> DecodedValue {
    let mut b4 = [0u8; 4];
    let mut b8 = [0u8; 8];
    match physical {
        PhysicalType::Boolean => DecodedValue::Bool(chunk[0] & 1 == 1),
        PhysicalType::Int32 => {
            b4.copy_from_slice(chunk);
            DecodedValue::Int32(i32::from_le_bytes(b4))
        }
        PhysicalType::Float => {
            b4.copy_from_slice(chunk);
            DecodedValue::Float(f32::from_le_bytes(b4))
        }
        PhysicalType::Int64 => {
            b8.copy_from_slice(chunk);
            DecodedValue::Int64(i64::from_le_bytes(b8))
        }
        PhysicalType::Double => {
            b8.copy_from_slice(chunk);
            DecodedValue::Double(f64::from_le_bytes(b8))
        }
        PhysicalType::Int96 | PhysicalType::ByteArray | PhysicalType::FixedLenByteArray => {
            DecodedValue::Bytes(chunk.to_vec())
        }
    }
}

/// Decode up to `count` fixed-length byte arrays of `width` bytes each.
pub fn decode_plain_fixed_len(buf: &[u8], width: usize, count: usize) -> Vec<DecodedValue> {
    if width == 0 {
        return vec![DecodedValue::Bytes(Vec::new()); count];
    }
    buf.chunks_exact(width)
        .take(count)
        .map(|chunk| DecodedValue::Bytes(chunk.to_vec()))
        .collect()
}

/// Decode up to `count` booleans packed one bit each, least significant bit
/// first, as PLAIN data pages store them.
pub fn decode_bitpacked_booleans(buf: &[u8], count: usize) -> Vec<DecodedValue> {
    buf.iter()
        .flat_map(|byte| (0..8).map(move |bit| DecodedValue::Bool((byte >> bit) & 1 == 1)))
        .take(count)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InspectError;

    #[test]
    fn decodes_fixed_width_types() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(-7i32).to_le_bytes());
        buf.extend_from_slice(&42i32.to_le_bytes());
        let values = decode_plain(&buf, PhysicalType::Int32, 2).unwrap();
        assert_eq!(values, vec![DecodedValue::Int32(-7), DecodedValue::Int32(42)]);

        let values = decode_plain(&1.5f64.to_le_bytes(), PhysicalType::Double, 1).unwrap();
        assert_eq!(values, vec![DecodedValue::Double(1.5)]);

        let values = decode_plain(&[0, 1, 3], PhysicalType::Boolean, 3).unwrap();
        assert_eq!(
            values,
            vec![
                DecodedValue::Bool(false),
                DecodedValue::Bool(true),
                DecodedValue::Bool(true)
            ]
        );
    }

    #[test]
    fn byte_arrays_are_length_prefixed() {
        let mut buf = Vec::new();
        for s in ["ab", "", "xyz"] {
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        let values = decode_plain(&buf, PhysicalType::ByteArray, 3).unwrap();
        assert_eq!(values[0], DecodedValue::Bytes(b"ab".to_vec()));
        assert_eq!(values[1], DecodedValue::Bytes(Vec::new()));
        assert_eq!(values[2], DecodedValue::Bytes(b"xyz".to_vec()));
    }

    #[test]
    fn short_buffers_return_what_was_decoded() {
        let mut buf = 5i64.to_le_bytes().to_vec();
        buf.extend_from_slice(&[1, 2, 3]);
        let values = decode_plain(&buf, PhysicalType::Int64, 10).unwrap();
        assert_eq!(values, vec![DecodedValue::Int64(5)]);

        // Prefix claims more bytes than remain.
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"ok");
        buf.extend_from_slice(&100u32.to_le_bytes());
        buf.extend_from_slice(b"short");
        let values = decode_plain(&buf, PhysicalType::ByteArray, 5).unwrap();
        assert_eq!(values, vec![DecodedValue::Bytes(b"ok".to_vec())]);
    }

    #[test]
    fn fixed_len_byte_array_needs_schema() {
        let err = decode_plain(&[0; 16], PhysicalType::FixedLenByteArray, 1).unwrap_err();
        assert!(matches!(err, InspectError::FixedLenNeedsSchema));

        let values = decode_plain_fixed_len(&[1, 2, 3, 4, 5], 2, 5);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn int96_is_twelve_raw_bytes() {
        let buf: Vec<u8> = (0..24).collect();
        let values = decode_plain(&buf, PhysicalType::Int96, 2).unwrap();
        assert_eq!(values[1], DecodedValue::Bytes((12..24).collect()));
    }

    #[test]
    fn bitpacked_booleans_are_lsb_first() {
        let values = decode_bitpacked_booleans(&[0b0000_0101, 0b1], 9);
        let bits: Vec<bool> = values
            .iter()
            .map(|v| matches!(v, DecodedValue::Bool(true)))
            .collect();
        assert_eq!(
            bits,
            vec![true, false, true, false, false, false, false, false, true]
        );
    }

    #[test]
    fn byte_values_serialize_as_text() {
        let json = serde_json::to_string(&DecodedValue::Bytes(b"hi".to_vec())).unwrap();
        assert_eq!(json, "\"hi\"");
    }
}
