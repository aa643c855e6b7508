use std::str;

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

use crate::error::{Error, Result};

/// A cursored big-endian source. Reads beyond the logical end fail with
/// [`Error::BufferUnderRun`], per the Reader contract's failure mode.
#[derive(Debug, Clone)]
pub struct KafkaReader {
    buf: Bytes,
    pos: usize,
}

impl KafkaReader {
    pub fn new(buf: Bytes) -> Self {
        KafkaReader { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns true if at least `n` bytes remain before the stream's
    /// logical end.
    pub fn available(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    fn require(&self, n: usize) -> Result<()> {
        if self.available(n) {
            Ok(())
        } else {
            Err(Error::BufferUnderRun)
        }
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        self.require(n)?;
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..self.pos])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    pub fn read_raw(&mut self, n: usize) -> Result<Bytes> {
        self.require(n)?;
        let start = self.pos;
        self.pos += n;
        Ok(self.buf.slice(start..self.pos))
    }

    /// Nullable byte array: `int32 length` (`-1` denotes null).
    pub fn read_bytes(&mut self) -> Result<Option<Bytes>> {
        let len = self.read_i32()?;
        if len < 0 {
            Ok(None)
        } else {
            Ok(Some(self.read_raw(len as usize)?))
        }
    }

    /// Nullable UTF-8 string: `int16 length` (`-1` denotes null).
    pub fn read_string(&mut self) -> Result<Option<String>> {
        let len = self.read_i16()?;
        if len < 0 {
            Ok(None)
        } else {
            let raw = self.read_raw(len as usize)?;
            Ok(Some(str::from_utf8(&raw)?.to_owned()))
        }
    }

    /// A required (non-nullable) string; an explicit null is a protocol
    /// error surfaced as an empty string's absence, i.e. `BufferUnderRun`.
    pub fn read_required_string(&mut self) -> Result<String> {
        self.read_string()?.ok_or(Error::BufferUnderRun)
    }

    pub fn read_array<T, F>(&mut self, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let count = self.read_i32()?;
        if count < 0 {
            return Ok(Vec::new());
        }
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(f(self)?);
        }
        Ok(items)
    }

    /// The IEEE CRC-32 of the next `n` bytes, without consuming them. Used
    /// to validate the checksum that immediately precedes a message body.
    pub fn crc_hash(&self, n: usize) -> Result<u32> {
        self.require(n)?;
        Ok(crc32fast::hash(&self.buf[self.pos..self.pos + n]))
    }
}
