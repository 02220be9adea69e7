//! Little-endian writer for action bytes

use crate::error::{EncodeError, EncodeResult};

/// Growable output buffer
#[derive(Debug, Default, Clone)]
pub struct ActionWriter {
    buf: Vec<u8>,
}

impl ActionWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the written bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and return its buffer
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Write an opcode with its `u16` body length prefix
    pub fn write_header(&mut self, opcode: u8, body_len: usize) -> EncodeResult<()> {
        let len = u16::try_from(body_len)
            .map_err(|_| EncodeError::u16_overflow("action body length", body_len))?;
        self.write_u8(opcode);
        self.write_u16(len);
        Ok(())
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a byte
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Write a little-endian `u16`
    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian `i16`
    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian `u32`
    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian `i32`
    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian `f32`
    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    /// Write an `f64` as two little-endian words, high word first
    pub fn write_f64(&mut self, v: f64) {
        let bits = v.to_bits();
        self.write_u32((bits >> 32) as u32);
        self.write_u32(bits as u32);
    }

    /// Write a NUL-terminated string
    pub fn write_str(&mut self, s: &str) -> EncodeResult<()> {
        if s.as_bytes().contains(&0) {
            return Err(EncodeError::InteriorNul(s.to_owned()));
        }
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        Ok(())
    }
}
