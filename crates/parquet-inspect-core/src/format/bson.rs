//! Minimal BSON reader that renders documents as JSON.
//!
//! Only the element types that show up in practice are understood; anything
//! else aborts the conversion and the caller falls back to base64.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Number, Value};

/// Render a BSON document as compact JSON, or `None` if it is not one this
/// reader understands.
pub fn to_json_string(doc: &[u8]) -> Option<String> {
    let (value, used) = read_document(doc, false, 0)?;
    if used != doc.len() {
        return None;
    }
    serde_json::to_string(&value).ok()
}

const MAX_NESTING: usize = 64;

fn read_document(buf: &[u8], as_array: bool, depth: usize) -> Option<(Value, usize)> {
    if depth > MAX_NESTING {
        return None;
    }
    let total = read_i32(buf, 0)?;
    let total = usize::try_from(total).ok()?;
    if total < 5 || total > buf.len() || buf[total - 1] != 0 {
        return None;
    }

    let body = &buf[4..total - 1];
    let mut pos = 0usize;
    let mut map = Map::new();
    let mut items = Vec::new();

    while pos < body.len() {
        let kind = body[pos];
        pos += 1;
        let name_end = pos + body[pos..].iter().position(|b| *b == 0)?;
        let name = String::from_utf8_lossy(&body[pos..name_end]).into_owned();
        pos = name_end + 1;

        let (value, used) = read_element(kind, &body[pos..], depth)?;
        pos += used;

        if as_array {
            items.push(value);
        } else {
            map.insert(name, value);
        }
    }

    let value = if as_array {
        Value::Array(items)
    } else {
        Value::Object(map)
    };
    Some((value, total))
}

fn read_element(kind: u8, buf: &[u8], depth: usize) -> Option<(Value, usize)> {
    match kind {
        // double
        0x01 => {
            let bytes: [u8; 8] = buf.get(..8)?.try_into().ok()?;
            let v = f64::from_le_bytes(bytes);
            Some((Number::from_f64(v).map_or(Value::Null, Value::Number), 8))
        }
        // string
        0x02 => {
            let len = usize::try_from(read_i32(buf, 0)?).ok()?;
            if len == 0 {
                return None;
            }
            let raw = buf.get(4..4 + len - 1)?;
            Some((
                Value::String(String::from_utf8_lossy(raw).into_owned()),
                4 + len,
            ))
        }
        0x03 => read_document(buf, false, depth + 1),
        0x04 => read_document(buf, true, depth + 1),
        // binary: len, subtype, bytes
        0x05 => {
            let len = usize::try_from(read_i32(buf, 0)?).ok()?;
            let raw = buf.get(5..5 + len)?;
            Some((Value::String(STANDARD.encode(raw)), 5 + len))
        }
        // ObjectId
        0x07 => {
            let raw = buf.get(..12)?;
            let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
            Some((Value::String(hex), 12))
        }
        0x08 => Some((Value::Bool(*buf.first()? != 0), 1)),
        // UTC datetime, milliseconds since the epoch
        0x09 => {
            let bytes: [u8; 8] = buf.get(..8)?.try_into().ok()?;
            Some((Value::from(i64::from_le_bytes(bytes)), 8))
        }
        0x0A => Some((Value::Null, 0)),
        0x10 => Some((Value::from(read_i32(buf, 0)?), 4)),
        0x12 => {
            let bytes: [u8; 8] = buf.get(..8)?.try_into().ok()?;
            Some((Value::from(i64::from_le_bytes(bytes)), 8))
        }
        _ => None,
    }
}

fn read_i32(buf: &[u8], at: usize) -> Option<i32> {
    let bytes: [u8; 4] = buf.get(at..at + 4)?.try_into().ok()?;
    Some(i32::from_le_bytes(bytes))
}
