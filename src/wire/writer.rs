use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Result;

/// A growable big-endian sink. Mirrors the teacher's manual offset
/// bookkeeping in `protocol::message::MessageSetEncoder::encode_message`
/// (the `size_off`/`crc_off`/`data_off` locals there), generalized into
/// reusable scopes so any caller can nest a length or CRC marker around
/// arbitrary writes, including further marker scopes.
#[derive(Debug, Default)]
pub struct KafkaWriter {
    buf: BytesMut,
}

/// Marker left open by [`KafkaWriter::mark_length`]; kept as a named type so
/// call sites read like the RAII scope guards the design notes ask for, even
/// though the actual patch-up happens when the closure returns.
pub struct LengthScope(usize);

/// Marker left open by [`KafkaWriter::mark_crc`].
pub struct CrcScope(usize);

impl KafkaWriter {
    pub fn new() -> Self {
        KafkaWriter { buf: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        KafkaWriter { buf: BytesMut::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.put_i16(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Nullable byte array: `int32 length` (`-1` for null) then the raw bytes.
    pub fn write_bytes(&mut self, bytes: Option<&[u8]>) {
        match bytes {
            None => self.write_i32(-1),
            Some(b) => {
                self.write_i32(b.len() as i32);
                self.write_raw(b);
            }
        }
    }

    /// Nullable UTF-8 string: `int16 length` (`-1` for null) then the bytes.
    pub fn write_string(&mut self, s: Option<&str>) {
        match s {
            None => self.write_i16(-1),
            Some(s) => {
                self.write_i16(s.len() as i16);
                self.write_raw(s.as_bytes());
            }
        }
    }

    /// `int32` count followed by `f` invoked once per item, in order.
    pub fn write_array<T, F>(&mut self, items: &[T], mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        self.write_i32(items.len() as i32);

        for item in items {
            f(self, item)?;
        }

        Ok(())
    }

    /// A nullable array: writing `None` produces the wire form used by
    /// Metadata's "all topics" request (`int32 = -1`).
    pub fn write_nullable_array<T, F>(&mut self, items: Option<&[T]>, f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        match items {
            None => {
                self.write_i32(-1);
                Ok(())
            }
            Some(items) => self.write_array(items, f),
        }
    }

    fn begin_length(&mut self) -> LengthScope {
        let pos = self.buf.len();
        self.write_i32(0);
        LengthScope(pos)
    }

    fn end_length(&mut self, scope: LengthScope) {
        let LengthScope(pos) = scope;
        let size = (self.buf.len() - pos - 4) as i32;
        BigEndian::write_i32(&mut self.buf[pos..pos + 4], size);
    }

    /// Reserves 4 bytes at the current position; once `f` returns, the
    /// reserved bytes are patched with `current_position - marker_position -
    /// 4`, i.e. the byte length of everything `f` wrote.
    pub fn mark_length<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let scope = self.begin_length();
        let result = f(self);
        self.end_length(scope);
        result
    }

    fn begin_crc(&mut self) -> CrcScope {
        let pos = self.buf.len();
        self.write_i32(0);
        CrcScope(pos)
    }

    fn end_crc(&mut self, scope: CrcScope) {
        let CrcScope(pos) = scope;
        let data_start = pos + 4;
        let crc = crc32fast::hash(&self.buf[data_start..]);
        BigEndian::write_i32(&mut self.buf[pos..pos + 4], crc as i32);
    }

    /// Reserves 4 bytes at the current position; once `f` returns, computes
    /// the IEEE CRC-32 over the bytes `f` wrote (not including the reserved
    /// slot itself) and stores it there.
    pub fn mark_crc<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let scope = self.begin_crc();
        let result = f(self);
        self.end_crc(scope);
        result
    }
}
