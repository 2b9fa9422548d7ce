//! Byte-level encoding and decoding utilities
//!
//! This module provides the primitive reader and writer every table codec is
//! built from: fixed-width little-endian integers, ULEB128 variable-length
//! integers and length-prefixed byte strings.

use thiserror::Error;

/// Maximum number of bytes a ULEB128-encoded `u64` may occupy
const ULEB128_MAX_BYTES: usize = 10;

/// Errors that can occur while decoding bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Unexpected end of the input
    #[error("Unexpected end of input at offset {0}")]
    UnexpectedEnd(usize),

    /// ULEB128 integer that does not fit in 64 bits
    #[error("Malformed ULEB128 integer at offset {0}")]
    MalformedUleb128(usize),

    /// ULEB128 integer with redundant trailing zero groups
    #[error("Non-canonical ULEB128 integer at offset {0}")]
    NonCanonicalUleb128(usize),

    /// Decoded value exceeds the range allowed at this position
    #[error("Value {value} at offset {offset} exceeds maximum {max}")]
    ValueOutOfRange {
        /// Decoded value
        value: u64,
        /// Largest accepted value
        max: u64,
        /// Offset where the value starts
        offset: usize,
    },

    /// Invalid UTF-8 string
    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    /// String that violates the identifier grammar
    #[error("Invalid identifier {name:?} at offset {offset}")]
    InvalidIdentifier {
        /// The rejected text
        name: String,
        /// Offset of the identifier's length prefix
        offset: usize,
    },

    /// Unknown opcode byte
    #[error("Invalid opcode {0:#04x} at offset {1}")]
    InvalidOpcode(u8, usize),

    /// Unknown signature token tag
    #[error("Invalid signature token {0:#04x} at offset {1}")]
    InvalidSignatureToken(u8, usize),

    /// Signature token nesting is too deep
    #[error("Signature nesting exceeds depth {max} at offset {offset}")]
    SignatureTooDeep {
        /// Maximum accepted depth
        max: usize,
        /// Offset of the token that crossed the limit
        offset: usize,
    },

    /// Unknown value for a one-byte tag or flag field
    #[error("Invalid {what} {value:#04x} at offset {offset}")]
    InvalidTag {
        /// Name of the field being decoded
        what: &'static str,
        /// The rejected byte
        value: u8,
        /// Offset of the byte
        offset: usize,
    },

    /// Encoding that the module's declared version does not allow
    #[error("{what} at offset {offset} requires bytecode version 6 (module is version {version})")]
    UnsupportedInVersion {
        /// Name of the construct
        what: &'static str,
        /// The module's declared version
        version: u32,
        /// Offset of the construct
        offset: usize,
    },
}

/// Bytecode writer for encoding module tables
///
/// Provides methods for emitting fixed-width and variable-length values
/// into a binary buffer.
#[derive(Debug)]
pub struct BytecodeWriter {
    /// Internal buffer containing the encoded bytes
    pub(crate) buffer: Vec<u8>,
}

impl BytecodeWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Get the current buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get the current offset (length of the buffer)
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    // ===== Fixed-width Emission =====

    /// Emit a raw byte
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Emit a 16-bit unsigned integer (little-endian)
    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit unsigned integer (little-endian)
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 64-bit unsigned integer (little-endian)
    pub fn emit_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 128-bit unsigned integer (little-endian)
    pub fn emit_u128(&mut self, value: u128) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit raw bytes without a length prefix
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    // ===== Variable-length Emission =====

    /// Emit an unsigned integer in canonical ULEB128 form
    pub fn emit_uleb128(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buffer.push(byte);
                return;
            }
            self.buffer.push(byte | 0x80);
        }
    }

    /// Emit a length as ULEB128
    pub fn emit_len(&mut self, len: usize) {
        self.emit_uleb128(len as u64);
    }

    /// Emit a ULEB128 length prefix followed by the bytes
    pub fn emit_byte_string(&mut self, bytes: &[u8]) {
        self.emit_len(bytes.len());
        self.emit_bytes(bytes);
    }
}

impl Default for BytecodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytecode reader for decoding module tables
///
/// Reads forward through a borrowed buffer. A reader created with
/// [`BytecodeReader::with_base`] reports error offsets relative to an
/// enclosing buffer, so errors inside a table body point at the absolute
/// position in the module.
#[derive(Debug, Clone)]
pub struct BytecodeReader<'a> {
    buffer: &'a [u8],
    position: usize,
    base: usize,
}

impl<'a> BytecodeReader<'a> {
    /// Create a new reader
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_base(buffer, 0)
    }

    /// Create a reader over a slice that starts at `base` in its enclosing buffer
    pub fn with_base(buffer: &'a [u8], base: usize) -> Self {
        Self {
            buffer,
            position: 0,
            base,
        }
    }

    /// Get the current position in the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the current position in the enclosing buffer
    pub fn offset(&self) -> usize {
        self.base + self.position
    }

    /// Get the remaining bytes in the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Check if there are more bytes to read
    pub fn has_more(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// Seek to a specific position
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    // ===== Fixed-width Reading =====

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let value = *self
            .buffer
            .get(self.position)
            .ok_or(DecodeError::UnexpectedEnd(self.offset()))?;
        self.position += 1;
        Ok(value)
    }

    /// Read a 16-bit unsigned integer (little-endian)
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a 32-bit unsigned integer (little-endian)
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a 64-bit unsigned integer (little-endian)
    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a 128-bit unsigned integer (little-endian)
    pub fn read_u128(&mut self) -> Result<u128, DecodeError> {
        Ok(u128::from_le_bytes(self.read_array()?))
    }

    /// Read a fixed-size byte array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let slice = self.read_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Borrow the next `count` bytes
    pub fn read_slice(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        if count > self.remaining() {
            return Err(DecodeError::UnexpectedEnd(self.offset()));
        }
        let slice = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    /// Read a fixed number of bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.read_slice(count)?.to_vec())
    }

    // ===== Variable-length Reading =====

    /// Read a ULEB128 integer, rejecting overflow and non-canonical forms
    pub fn read_uleb128(&mut self) -> Result<u64, DecodeError> {
        let start = self.offset();
        let mut value: u64 = 0;
        for i in 0..ULEB128_MAX_BYTES {
            let byte = self.read_u8()?;
            // The tenth group only has room for the top bit of a u64.
            if i == ULEB128_MAX_BYTES - 1 && byte > 0x01 {
                return Err(DecodeError::MalformedUleb128(start));
            }
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                if byte == 0 && i > 0 {
                    return Err(DecodeError::NonCanonicalUleb128(start));
                }
                return Ok(value);
            }
        }
        Err(DecodeError::MalformedUleb128(start))
    }

    /// Read a ULEB128 integer no larger than `max`
    pub fn read_uleb128_bounded(&mut self, max: u64) -> Result<u64, DecodeError> {
        let offset = self.offset();
        let value = self.read_uleb128()?;
        if value > max {
            return Err(DecodeError::ValueOutOfRange { value, max, offset });
        }
        Ok(value)
    }

    /// Read a ULEB128 table index (16 bits)
    pub fn read_index(&mut self) -> Result<u16, DecodeError> {
        Ok(self.read_uleb128_bounded(u64::from(u16::MAX))? as u16)
    }

    /// Read an element count whose elements take at least one byte each
    ///
    /// Bounding the count by the remaining input keeps allocations driven by
    /// untrusted counts proportional to the input size.
    pub fn read_count(&mut self) -> Result<usize, DecodeError> {
        let max = self.remaining().saturating_sub(1) as u64;
        let offset = self.offset();
        let value = self.read_uleb128()?;
        if value > max && value > 0 {
            return Err(DecodeError::ValueOutOfRange { value, max, offset });
        }
        Ok(value as usize)
    }

    /// Read a ULEB128 length prefix followed by that many bytes
    pub fn read_byte_string(&mut self) -> Result<Vec<u8>, DecodeError> {
        let offset = self.offset();
        let len = self.read_uleb128()?;
        if len > self.remaining() as u64 {
            return Err(DecodeError::UnexpectedEnd(offset));
        }
        self.read_bytes(len as usize)
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let offset = self.offset();
        let bytes = self.read_byte_string()?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8(offset))
    }

    /// Read a byte that must be `0` or `1`
    pub fn read_bool(&mut self, what: &'static str) -> Result<bool, DecodeError> {
        let offset = self.offset();
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidTag {
                what,
                value,
                offset,
            }),
        }
    }
}
