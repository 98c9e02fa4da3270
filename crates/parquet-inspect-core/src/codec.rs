//! Page payload decompression.
//!
//! One function, [`decompress`], dispatches on the column chunk's codec.
//! Errors from the codec libraries are surfaced as the error source; nothing
//! is retried.

use std::error::Error as StdError;
use std::io::Read;

use flate2::read::MultiGzDecoder;
use snafu::prelude::*;

use crate::error::{
    CodecNotImplementedSnafu, CodecNotSupportedSnafu, DecompressSnafu, ImplausibleExpansionSnafu,
    InspectResult, UncompressedSizeMismatchSnafu, UnsupportedCodecSnafu,
};
use crate::metadata::Codec;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Upper bounds on output bytes per input byte for codecs that decode into a
/// buffer sized from the header. Streaming codecs are bounded by `take`
/// instead.
const SNAPPY_MAX_RATIO: usize = 32;
const LZ4_MAX_RATIO: usize = 255;
const EXPANSION_SLACK: usize = 64;

/// Decompress one page payload.
///
/// `uncompressed_size` is the size declared in the page header. Every codec
/// except `UNCOMPRESSED` must produce exactly that many bytes. Nothing is
/// allocated from the declared size until it has been checked against what
/// the payload can plausibly expand to.
pub fn decompress(data: &[u8], codec: Codec, uncompressed_size: usize) -> InspectResult<Vec<u8>> {
    let out = match codec {
        Codec::Uncompressed => return Ok(data.to_vec()),
        Codec::Lzo => return CodecNotSupportedSnafu { codec }.fail(),
        Codec::Brotli => return CodecNotImplementedSnafu { codec }.fail(),
        Codec::Unknown(_) => return UnsupportedCodecSnafu { codec }.fail(),
        _ if data.is_empty() && uncompressed_size == 0 => Vec::new(),
        Codec::Gzip => read_bounded(MultiGzDecoder::new(data), uncompressed_size)
            .map_err(|e| Box::new(e) as BoxError)
            .context(DecompressSnafu { codec })?,
        Codec::Snappy => {
            check_expansion(codec, data.len(), uncompressed_size, SNAPPY_MAX_RATIO)?;
            let declared = snap::raw::decompress_len(data)
                .map_err(|e| Box::new(e) as BoxError)
                .context(DecompressSnafu { codec })?;
            ensure!(
                declared == uncompressed_size,
                UncompressedSizeMismatchSnafu {
                    codec,
                    expected: uncompressed_size,
                    actual: declared,
                }
            );
            snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| Box::new(e) as BoxError)
                .context(DecompressSnafu { codec })?
        }
        Codec::Lz4 => {
            check_expansion(codec, data.len(), uncompressed_size, LZ4_MAX_RATIO)?;
            decompress_lz4(data, uncompressed_size).context(DecompressSnafu { codec })?
        }
        Codec::Lz4Raw => {
            check_expansion(codec, data.len(), uncompressed_size, LZ4_MAX_RATIO)?;
            let mut out = vec![0u8; uncompressed_size];
            let n = lz4_flex::block::decompress_into(data, &mut out)
                .map_err(|e| Box::new(e) as BoxError)
                .context(DecompressSnafu { codec })?;
            out.truncate(n);
            out
        }
        Codec::Zstd => zstd::stream::read::Decoder::new(data)
            .and_then(|decoder| read_bounded(decoder, uncompressed_size))
            .map_err(|e| Box::new(e) as BoxError)
            .context(DecompressSnafu { codec })?,
    };

    ensure!(
        out.len() == uncompressed_size,
        UncompressedSizeMismatchSnafu {
            codec,
            expected: uncompressed_size,
            actual: out.len(),
        }
    );
    Ok(out)
}

fn check_expansion(
    codec: Codec,
    compressed: usize,
    declared: usize,
    ratio: usize,
) -> InspectResult<()> {
    let bound = compressed
        .saturating_mul(ratio)
        .saturating_add(EXPANSION_SLACK);
    ensure!(
        declared <= bound,
        ImplausibleExpansionSnafu {
            codec,
            compressed,
            declared,
        }
    );
    Ok(())
}

/// Read at most one byte past `expected`, enough to detect an oversized
/// stream without buffering all of it.
fn read_bounded<R: Read>(reader: R, expected: usize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .take((expected as u64).saturating_add(1))
        .read_to_end(&mut out)?;
    Ok(out)
}

/// LZ4 frame format first; older writers emit Hadoop-framed blocks, which
/// are tried before the frame error is reported.
fn decompress_lz4(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, BoxError> {
    let mut out = vec![0u8; uncompressed_size];
    let frame = lz4_flex::frame::FrameDecoder::new(data).read_exact(&mut out);
    match frame {
        Ok(()) => Ok(out),
        Err(frame_err) => decompress_hadoop_lz4(data, uncompressed_size)
            .map_err(|_| Box::new(frame_err) as BoxError),
    }
}

/// Hadoop framing: repeated `[u32 BE decompressed len][u32 BE compressed len][block]`.
fn decompress_hadoop_lz4(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, BoxError> {
    let mut out = vec![0u8; uncompressed_size];
    let mut input = data;
    let mut written = 0usize;

    while !input.is_empty() {
        if input.len() < 8 {
            return Err("truncated Hadoop LZ4 block header".into());
        }
        let expected = u32::from_be_bytes([input[0], input[1], input[2], input[3]]) as usize;
        let compressed = u32::from_be_bytes([input[4], input[5], input[6], input[7]]) as usize;
        input = &input[8..];

        if compressed > input.len() || written + expected > uncompressed_size {
            return Err("Hadoop LZ4 block exceeds page bounds".into());
        }
        let n = lz4_flex::block::decompress_into(
            &input[..compressed],
            &mut out[written..written + expected],
        )?;
        if n != expected {
            return Err("Hadoop LZ4 block size mismatch".into());
        }
        written += n;
        input = &input[compressed..];
    }

    out.truncate(written);
    Ok(out)
}
