//! RLE / bit-packing hybrid decoding.
//!
//! Used for definition and repetition levels and for dictionary indices.
//! The stream is a sequence of runs, each introduced by a ULEB128 header:
//! an even header is an RLE run of `header >> 1` copies of one value stored
//! in `ceil(bit_width / 8)` little-endian bytes; an odd header is
//! `(header >> 1) * 8` values bit-packed least significant bit first.

use crate::error::{InspectResult, InvalidRleSnafu};

/// Bit width needed to store levels up to `max_level`.
pub fn bit_width_for(max_level: i16) -> u8 {
    if max_level <= 0 {
        0
    } else {
        (16 - (max_level as u16).leading_zeros()) as u8
    }
}

/// Decode up to `count` values of `bit_width` bits.
///
/// Decoding stops early, without error, when the input runs out.
pub fn decode_hybrid(buf: &[u8], bit_width: u8, count: usize) -> InspectResult<Vec<u32>> {
    if bit_width > 32 {
        return InvalidRleSnafu {
            detail: format!("bit width {bit_width} exceeds 32"),
        }
        .fail();
    }

    let mut out = Vec::with_capacity(count.min(buf.len() * 8 + 8));
    let mut pos = 0usize;
    let value_bytes = usize::from(bit_width).div_ceil(8);

    while out.len() < count {
        let Some((header, used)) = read_uleb128(&buf[pos..]) else {
            break;
        };
        pos += used;

        if header & 1 == 0 {
            let run = (header >> 1) as usize;
            let Some(raw) = buf.get(pos..pos + value_bytes) else {
                break;
            };
            pos += value_bytes;
            let mut le = [0u8; 4];
            le[..value_bytes].copy_from_slice(raw);
            let value = u32::from_le_bytes(le);
            let take = run.min(count - out.len());
            out.extend(std::iter::repeat_n(value, take));
        } else {
            let groups = (header >> 1) as usize;
            let wanted = groups.saturating_mul(8);
            let byte_len = groups.saturating_mul(usize::from(bit_width));
            let end = pos.saturating_add(byte_len).min(buf.len());
            let packed = &buf[pos..end];
            unpack(packed, bit_width, wanted.min(count - out.len()), &mut out);
            pos = end;
            if packed.len() < byte_len {
                // Truncated bit-packed run: nothing more can follow.
                break;
            }
        }
    }

    Ok(out)
}

fn unpack(packed: &[u8], bit_width: u8, wanted: usize, out: &mut Vec<u32>) {
    let width = usize::from(bit_width);
    if width == 0 {
        out.extend(std::iter::repeat_n(0, wanted));
        return;
    }
    let available = packed.len() * 8 / width;
    let mask: u64 = if width == 32 { u32::MAX.into() } else { (1u64 << width) - 1 };
    for i in 0..wanted.min(available) {
        let bit = i * width;
        let mut word = 0u64;
        for (k, byte) in packed[bit / 8..].iter().take(5).enumerate() {
            word |= u64::from(*byte) << (8 * k);
        }
        out.push(((word >> (bit % 8)) & mask) as u32);
    }
}

fn read_uleb128(buf: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, byte) in buf.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_widths() {
        assert_eq!(bit_width_for(0), 0);
        assert_eq!(bit_width_for(1), 1);
        assert_eq!(bit_width_for(2), 2);
        assert_eq!(bit_width_for(3), 2);
        assert_eq!(bit_width_for(4), 3);
    }

    #[test]
    fn rle_run() {
        // 5 copies of 3 at width 2.
        let values = decode_hybrid(&[5 << 1, 3], 2, 5).unwrap();
        assert_eq!(values, vec![3; 5]);
    }

    #[test]
    fn bit_packed_run() {
        // One group of 8 values 0..8 at width 3.
        // Packed LSB first: 0b10_001_000, 0b1_100_011_0, 0b111_110_1
        let values = decode_hybrid(&[0b11, 0b1000_1000, 0b1100_0110, 0b1111_1010], 3, 8).unwrap();
        assert_eq!(values, (0..8).collect::<Vec<u32>>());
    }

    #[test]
    fn mixed_runs_stop_at_count() {
        // RLE of 2 ones at width 1, then a packed group 0b0110_1001.
        let values = decode_hybrid(&[2 << 1, 1, 0b11, 0b0110_1001], 1, 6).unwrap();
        assert_eq!(values, vec![1, 1, 1, 0, 0, 1]);
    }

    #[test]
    fn truncated_input_is_best_effort() {
        let values = decode_hybrid(&[10 << 1], 8, 10).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn rejects_wide_bit_widths() {
        assert!(decode_hybrid(&[], 33, 1).is_err());
    }
}
