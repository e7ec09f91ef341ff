//! A no_std compatible slice reader for reading bytes with position tracking.
//!
//! This module provides [`SliceReader`] which wraps a byte slice and provides
//! methods for reading the fixed-width little-endian fields that make up a
//! RIFF chunk stream, similar to `std::io::Cursor` but without requiring the
//! standard library.

use alloc::format;
use byteorder_lite::{ByteOrder, LittleEndian};
use core::fmt;

use crate::DemuxError;

/// A reader that wraps a byte slice and tracks the current position.
///
/// Every read advances the cursor and fails with
/// [`DemuxError::TruncatedData`] if fewer bytes remain than requested. The
/// underlying buffer is borrowed and never copied or mutated; no read ever
/// touches memory outside the slice.
#[derive(Clone)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    /// Create a new SliceReader wrapping the given byte slice.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the slice.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the total length of the underlying slice.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying slice is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of bytes remaining from the current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn truncated(&self, need: usize) -> DemuxError {
        DemuxError::TruncatedData(format!(
            "need {} byte(s) at offset {}, {} remaining",
            need,
            self.pos,
            self.remaining()
        ))
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, DemuxError> {
        if self.pos >= self.data.len() {
            return Err(self.truncated(1));
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Read a u16 in little-endian byte order.
    #[inline]
    pub fn read_u16_le(&mut self) -> Result<u16, DemuxError> {
        if self.pos + 2 > self.data.len() {
            return Err(self.truncated(2));
        }
        let val = LittleEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(val)
    }

    /// Read a u24 in little-endian byte order (as u32).
    #[inline]
    pub fn read_u24_le(&mut self) -> Result<u32, DemuxError> {
        if self.pos + 3 > self.data.len() {
            return Err(self.truncated(3));
        }
        let val = LittleEndian::read_u24(&self.data[self.pos..]);
        self.pos += 3;
        Ok(val)
    }

    /// Read a u32 in little-endian byte order.
    #[inline]
    pub fn read_u32_le(&mut self) -> Result<u32, DemuxError> {
        if self.pos + 4 > self.data.len() {
            return Err(self.truncated(4));
        }
        let val = LittleEndian::read_u32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(val)
    }

    /// Read a 4-byte FourCC tag.
    #[inline]
    pub fn read_fourcc(&mut self) -> Result<[u8; 4], DemuxError> {
        if self.pos + 4 > self.data.len() {
            return Err(self.truncated(4));
        }
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(tag)
    }

    /// Take a slice of n bytes from the current position and advance.
    /// Returns a slice reference without copying data.
    #[inline]
    pub fn take_slice(&mut self, n: usize) -> Result<&'a [u8], DemuxError> {
        if self.pos + n > self.data.len() {
            return Err(self.truncated(n));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Get a slice of n bytes from the current position without advancing.
    #[inline]
    pub fn peek_slice(&self, n: usize) -> Result<&'a [u8], DemuxError> {
        if self.pos + n > self.data.len() {
            return Err(self.truncated(n));
        }
        Ok(&self.data[self.pos..self.pos + n])
    }

    /// Advance the cursor by exactly `n` bytes without returning them.
    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<(), DemuxError> {
        if self.pos + n > self.data.len() {
            return Err(self.truncated(n));
        }
        self.pos += n;
        Ok(())
    }

    /// Advance the cursor by up to `n` bytes, clamping at the end of the
    /// slice. Used to step over chunk padding that may be absent at the very
    /// end of the buffer.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }
}

impl fmt::Debug for SliceReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceReader")
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .finish()
    }
}
