//! Streaming reader for the Thrift compact protocol.
//!
//! Page headers are self-delimiting compact-protocol structs that sit
//! directly in front of each page payload. They are decoded straight from the
//! byte source, one byte at a time, through a [`CountingReader`] so the exact
//! encoded size of the header is known afterwards and the source is left at
//! the first payload byte.

use std::io::{self, Read};

use snafu::prelude::*;

/// Maximum struct/list nesting accepted while skipping unknown fields.
const MAX_DEPTH: usize = 32;

/// Errors produced while decoding compact-protocol data.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ThriftError {
    /// The source ended or failed mid-structure.
    #[snafu(display("read failed after {consumed} bytes: {source}"))]
    Read {
        /// Bytes consumed before the failure.
        consumed: u64,
        /// Underlying I/O error (`UnexpectedEof` for truncated input).
        source: io::Error,
    },

    /// A varint ran past the width of its target integer.
    #[snafu(display("varint longer than {bits} bits"))]
    VarintOverflow {
        /// Width of the target integer.
        bits: u32,
    },

    /// A type nibble outside the compact-protocol table.
    #[snafu(display("invalid compact type id {type_id}"))]
    InvalidType {
        /// The offending nibble.
        type_id: u8,
    },

    /// A collection or binary length that cannot be valid.
    #[snafu(display("invalid length {length}"))]
    InvalidLength {
        /// The decoded length.
        length: i64,
    },

    /// Structures nested deeper than this reader accepts.
    #[snafu(display("structures nested deeper than {MAX_DEPTH} levels"))]
    TooDeep,

    /// A field required by the format was not present.
    #[snafu(display("{structure} is missing required field {field}"))]
    MissingField {
        /// Struct being decoded.
        structure: &'static str,
        /// Name of the absent field.
        field: &'static str,
    },

    /// A field carried a value outside its domain.
    #[snafu(display("{structure}.{field} has invalid value {value}"))]
    InvalidValue {
        /// Struct being decoded.
        structure: &'static str,
        /// Offending field.
        field: &'static str,
        /// The value found.
        value: i64,
    },
}

/// Result alias for compact-protocol decoding.
pub type ThriftResult<T> = Result<T, ThriftError>;

/// Read-through adapter that counts every byte successfully read.
#[derive(Debug)]
pub struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R> CountingReader<R> {
    /// Wrap `inner` with a zeroed counter.
    pub fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }

    /// Bytes read so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Unwrap the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Compact-protocol wire types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompactType {
    /// Boolean whose value is carried in the field header.
    BoolTrue,
    /// Boolean whose value is carried in the field header.
    BoolFalse,
    /// Single raw byte.
    Byte,
    /// Zigzag varint.
    I16,
    /// Zigzag varint.
    I32,
    /// Zigzag varint.
    I64,
    /// 8 bytes little-endian.
    Double,
    /// Varint length followed by bytes.
    Binary,
    /// List header then elements.
    List,
    /// Encoded like a list.
    Set,
    /// Map header then key/value pairs.
    Map,
    /// Nested struct terminated by a stop byte.
    Struct,
}

impl CompactType {
    fn from_nibble(type_id: u8) -> ThriftResult<Self> {
        Ok(match type_id {
            1 => CompactType::BoolTrue,
            2 => CompactType::BoolFalse,
            3 => CompactType::Byte,
            4 => CompactType::I16,
            5 => CompactType::I32,
            6 => CompactType::I64,
            7 => CompactType::Double,
            8 => CompactType::Binary,
            9 => CompactType::List,
            10 => CompactType::Set,
            11 => CompactType::Map,
            12 => CompactType::Struct,
            other => return InvalidTypeSnafu { type_id: other }.fail(),
        })
    }
}

/// Header of one struct field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldHeader {
    /// Field id.
    pub id: i16,
    /// Wire type of the field value.
    pub field_type: CompactType,
}

/// Pull decoder for compact-protocol structs.
///
/// Each nested struct keeps its own last-field-id; the ids of enclosing
/// structs are parked on a stack while a child is being read.
pub struct CompactReader<R> {
    input: CountingReader<R>,
    last_field_id: i16,
    field_ids: Vec<i16>,
    pending_bool: Option<bool>,
}

impl<R: Read> CompactReader<R> {
    /// Start decoding from `input`.
    pub fn new(input: R) -> Self {
        Self {
            input: CountingReader::new(input),
            last_field_id: 0,
            field_ids: Vec::new(),
            pending_bool: None,
        }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> u64 {
        self.input.count()
    }

    /// Unwrap the underlying source.
    pub fn into_inner(self) -> R {
        self.input.into_inner()
    }

    /// Enter a struct.
    pub fn struct_begin(&mut self) -> ThriftResult<()> {
        ensure!(self.field_ids.len() < MAX_DEPTH, TooDeepSnafu);
        self.field_ids.push(self.last_field_id);
        self.last_field_id = 0;
        Ok(())
    }

    /// Leave a struct after its stop byte was read.
    pub fn struct_end(&mut self) {
        self.last_field_id = self.field_ids.pop().unwrap_or(0);
    }

    /// Next field header, or `None` at the struct's stop byte.
    pub fn field_begin(&mut self) -> ThriftResult<Option<FieldHeader>> {
        let byte = self.read_byte()?;
        if byte == 0 {
            return Ok(None);
        }

        let field_type = CompactType::from_nibble(byte & 0x0f)?;
        let delta = i16::from(byte >> 4);
        let id = if delta == 0 {
            self.read_i16()?
        } else {
            self.last_field_id.wrapping_add(delta)
        };
        self.last_field_id = id;

        self.pending_bool = match field_type {
            CompactType::BoolTrue => Some(true),
            CompactType::BoolFalse => Some(false),
            _ => None,
        };

        Ok(Some(FieldHeader { id, field_type }))
    }

    /// A boolean: taken from the preceding field header when it carried one,
    /// otherwise read as a single byte (list elements).
    pub fn read_bool(&mut self) -> ThriftResult<bool> {
        match self.pending_bool.take() {
            Some(value) => Ok(value),
            None => Ok(self.read_byte()? == 1),
        }
    }

    /// A single raw byte.
    pub fn read_byte(&mut self) -> ThriftResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Zigzag-encoded 16-bit integer.
    pub fn read_i16(&mut self) -> ThriftResult<i16> {
        let raw = self.read_varint(16)?;
        Ok(zigzag(raw) as i16)
    }

    /// Zigzag-encoded 32-bit integer.
    pub fn read_i32(&mut self) -> ThriftResult<i32> {
        let raw = self.read_varint(32)?;
        Ok(zigzag(raw) as i32)
    }

    /// Zigzag-encoded 64-bit integer.
    pub fn read_i64(&mut self) -> ThriftResult<i64> {
        let raw = self.read_varint(64)?;
        Ok(zigzag(raw))
    }

    /// Little-endian IEEE-754 double.
    pub fn read_double(&mut self) -> ThriftResult<f64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Length-prefixed byte string.
    pub fn read_binary(&mut self) -> ThriftResult<Vec<u8>> {
        let len = self.read_varint(32)?;
        let mut out = Vec::new();
        // `take` grows the buffer as bytes arrive, so a corrupt length
        // cannot trigger a huge allocation up front.
        let result = (&mut self.input).take(len).read_to_end(&mut out);
        let consumed = self.input.count();
        let read = result.context(ReadSnafu { consumed })?;
        if (read as u64) < len {
            return Err(ThriftError::Read {
                consumed: self.input.count(),
                source: io::ErrorKind::UnexpectedEof.into(),
            });
        }
        Ok(out)
    }

    /// List (or set) header: element type and element count.
    pub fn read_list_header(&mut self) -> ThriftResult<(CompactType, usize)> {
        let byte = self.read_byte()?;
        let elem_type = CompactType::from_nibble(byte & 0x0f)?;
        let short = usize::from(byte >> 4);
        let size = if short == 0x0f {
            self.read_size()?
        } else {
            short
        };
        Ok((elem_type, size))
    }

    /// Skip one value of the given wire type, including nested structures.
    pub fn skip(&mut self, field_type: CompactType) -> ThriftResult<()> {
        self.skip_at_depth(field_type, 0)
    }

    fn skip_at_depth(&mut self, field_type: CompactType, depth: usize) -> ThriftResult<()> {
        ensure!(depth < MAX_DEPTH, TooDeepSnafu);
        match field_type {
            CompactType::BoolTrue | CompactType::BoolFalse => {
                self.read_bool()?;
            }
            CompactType::Byte => {
                self.read_byte()?;
            }
            CompactType::I16 | CompactType::I32 | CompactType::I64 => {
                self.read_varint(64)?;
            }
            CompactType::Double => {
                self.read_double()?;
            }
            CompactType::Binary => {
                self.read_binary()?;
            }
            CompactType::List | CompactType::Set => {
                let (elem_type, size) = self.read_list_header()?;
                for _ in 0..size {
                    self.skip_at_depth(elem_type, depth + 1)?;
                }
            }
            CompactType::Map => {
                let size = self.read_size()?;
                if size > 0 {
                    let types = self.read_byte()?;
                    let key_type = CompactType::from_nibble(types >> 4)?;
                    let value_type = CompactType::from_nibble(types & 0x0f)?;
                    for _ in 0..size {
                        self.skip_at_depth(key_type, depth + 1)?;
                        self.skip_at_depth(value_type, depth + 1)?;
                    }
                }
            }
            CompactType::Struct => {
                self.struct_begin()?;
                while let Some(field) = self.field_begin()? {
                    self.skip_at_depth(field.field_type, depth + 1)?;
                }
                self.struct_end();
            }
        }
        Ok(())
    }

    fn read_size(&mut self) -> ThriftResult<usize> {
        let raw = self.read_varint(32)?;
        usize::try_from(raw).map_err(|_| ThriftError::InvalidLength {
            length: raw as i64,
        })
    }

    fn read_varint(&mut self, bits: u32) -> ThriftResult<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_byte()?;
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            ensure!(shift < bits + 7 && shift < 64, VarintOverflowSnafu { bits });
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> ThriftResult<()> {
        let consumed = self.input.count();
        self.input
            .read_exact(buf)
            .context(ReadSnafu { consumed })
    }
}

fn zigzag(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}
