//! Positional reads over an in-memory stitch-file buffer.
//!
//! Pure buffer access with an owned position; every read is bounds-checked
//! and overruns surface as [`FormatError::UnexpectedEof`]. No I/O happens
//! here, the caller supplies the complete byte buffer up front.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

/// A cursor over a fixed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current absolute position in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move the position to an absolute offset. Seeking past the end is
    /// allowed; the next read will fail with `UnexpectedEof`.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        if self.remaining() < n {
            return Err(FormatError::UnexpectedEof {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, FormatError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, FormatError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Peek at the next two bytes without consuming them. Returns `None`
    /// when fewer than two bytes remain.
    pub fn peek2(&self) -> Option<(u8, u8)> {
        if self.remaining() < 2 {
            return None;
        }
        Some((self.data[self.pos], self.data[self.pos + 1]))
    }

    /// Read a fixed-slot text field of at most `max` bytes, stopping early
    /// at a NUL or space terminator. The position always advances by `max`
    /// (the slot is fixed-width regardless of the label length).
    pub fn read_str(&mut self, max: usize) -> Result<String, FormatError> {
        let slot = self.take(max)?;
        let end = slot
            .iter()
            .position(|&b| b == 0 || b == b' ')
            .unwrap_or(max);
        Ok(String::from_utf8_lossy(&slot[..end]).into_owned())
    }
}
