//! Little-endian reader over raw action bytes

use crate::error::{DecodeError, DecodeResult};

/// Sequential reader over a byte slice.
///
/// Offsets reported in errors are absolute: a reader created for a nested
/// block carries the position of that block in the outermost buffer.
#[derive(Debug, Clone)]
pub struct ActionReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ActionReader<'a> {
    /// Create a reader at absolute offset 0
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Create a reader whose first byte sits at absolute offset `base`
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute offset of the next byte
    #[inline]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes consumed from this reader
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether every byte has been consumed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read `n` raw bytes
    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEnd {
                offset: self.offset(),
                needed: n - self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    /// Split off the next `len` bytes as an independent reader
    pub fn sub_reader(&mut self, len: usize) -> DecodeResult<ActionReader<'a>> {
        let base = self.offset();
        let bytes = self.read_bytes(len)?;
        Ok(ActionReader::with_base(bytes, base))
    }

    /// Read a byte
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a little-endian `u16`
    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian `i16`
    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        let b = self.read_bytes(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian `u32`
    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian `i32`
    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a little-endian `f32`
    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read an `f64` stored as two little-endian words, high word first
    pub fn read_f64(&mut self) -> DecodeResult<f64> {
        let high = u64::from(self.read_u32()?);
        let low = u64::from(self.read_u32()?);
        Ok(f64::from_bits((high << 32) | low))
    }

    /// Read a NUL-terminated UTF-8 string
    pub fn read_str(&mut self) -> DecodeResult<String> {
        let start = self.offset();
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::UnterminatedString { offset: start })?;
        let text = std::str::from_utf8(&rest[..len])
            .map_err(|_| DecodeError::InvalidString { offset: start })?
            .to_owned();
        self.pos += len + 1;
        Ok(text)
    }
}
