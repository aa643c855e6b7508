//! Compression codec selection for message sets.
//!
//! Grounded on `attributes & 0x07` in `protocol::message` (the teacher's
//! `COMPRESSION_CODEC_MASK`) and the crate's `Compression` enum re-exported
//! from `lib.rs`. Snappy and LZ4 are out of scope (see DESIGN.md); only
//! `None` and `Gzip` are implemented.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;

use crate::error::{Error, Result};

pub const COMPRESSION_CODEC_MASK: i8 = 0x07;
pub const TIMESTAMP_TYPE_MASK: i8 = 0x08;

/// The compression codec selected by the low three bits of a message's
/// attributes byte. `Other` carries a recognized-but-unimplemented or
/// genuinely unknown codec (e.g. Kafka's own Snappy=2/LZ4=3); both encode
/// and decode refuse it with `UnsupportedCodec` rather than silently
/// treating it as uncompressed (spec.md §4.B).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Other(i8),
}

impl Compression {
    pub fn wire_value(self) -> i8 {
        match self {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Other(bits) => bits,
        }
    }
}

impl From<i8> for Compression {
    fn from(v: i8) -> Self {
        match v & COMPRESSION_CODEC_MASK {
            0 => Compression::None,
            1 => Compression::Gzip,
            other => Compression::Other(other),
        }
    }
}

pub fn gzip_encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

pub fn gzip_decode(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(expected_len);
    decoder.read_to_end(&mut out).map_err(Error::from)?;
    Ok(out)
}
