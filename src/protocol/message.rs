//! Message sets.
//!
//! One structure common to both the produce and fetch requests is the
//! message set format. A message in Kafka is a key-value pair with a small
//! amount of associated metadata. A message set is a length-prefixed
//! sequence of offset-tagged messages. Grounded directly in the teacher's
//! `protocol::message` (`Message`, `MessageSet`, `MessageSetEncoder`,
//! `parse_message_set`, `parse_message`), re-expressed on the cursor-style
//! `KafkaWriter`/`KafkaReader` instead of `bytes::BufMut`/`nom`.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use log::trace;

use crate::compression::{gzip_decode, gzip_encode, Compression, COMPRESSION_CODEC_MASK, TIMESTAMP_TYPE_MASK};
use crate::error::{Error, Result};
use crate::wire::{KafkaReader, KafkaWriter};

/// Minimum bytes needed to read a message set entry's `offset` + `message_size`
/// header; an entry shorter than this at the tail of a set is a tolerated
/// truncation, not an error (spec.md §3 "MessageSet" invariant).
const MESSAGE_HEADER_SIZE: usize = 12;

/// `MessageSet => [Offset MessageSize Message]`
#[derive(Clone, Debug, PartialEq)]
pub struct MessageSet {
    pub messages: Vec<Message>,
}

/// `Message => Crc MagicByte Attributes [Timestamp] Key Value`
///
/// `magic = 0` omits the timestamp; `magic = 1` requires one. A message
/// whose attributes select a non-`None` codec stands for a compressed
/// message set embedded in its own value field.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub offset: i64,
    pub magic: i8,
    pub timestamp: Option<MessageTimestamp>,
    pub compression: Compression,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageTimestamp {
    CreateTime(i64),
    LogAppendTime(i64),
}

impl MessageTimestamp {
    pub fn value(self) -> i64 {
        match self {
            MessageTimestamp::CreateTime(v) | MessageTimestamp::LogAppendTime(v) => v,
        }
    }
}

impl Default for MessageTimestamp {
    fn default() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;

        MessageTimestamp::CreateTime(millis)
    }
}

/// Encode one message inside a `mark_crc` scope: magic, attributes, the
/// optional timestamp, key, value.
fn encode_message_body(writer: &mut KafkaWriter, message: &Message) -> Result<()> {
    if let Compression::Other(bits) = message.compression {
        return Err(Error::UnsupportedCodec(bits));
    }

    writer.mark_crc(|w| {
        w.write_i8(message.magic);

        let timestamp_flag = match message.timestamp {
            Some(MessageTimestamp::LogAppendTime(_)) => TIMESTAMP_TYPE_MASK,
            _ => 0,
        };
        w.write_i8((message.compression.wire_value() & COMPRESSION_CODEC_MASK) | timestamp_flag);

        if message.magic >= 1 {
            let ts = message.timestamp.unwrap_or_default();
            w.write_i64(ts.value());
        }

        w.write_bytes(message.key.as_deref());
        w.write_bytes(message.value.as_deref());

        Ok(())
    })
}

fn encode_entry(writer: &mut KafkaWriter, offset: i64, message: &Message) -> Result<()> {
    writer.write_i64(offset);
    writer.mark_length(|w| encode_message_body(w, message))
}

/// Stats returned by [`encode_message_set`]: the number of bytes gzip saved
/// versus the uncompressed encoding (0 for `Compression::None`), matching
/// spec.md §4.B's "bytes-saved signal for telemetry".
#[derive(Debug)]
pub struct EncodeStats {
    pub bytes_saved: i64,
}

/// Encodes `messages` as a length-prefixed message set, optionally wrapped
/// in a single GZIP-compressed outer message. New messages always carry a
/// writer-chosen offset of 0 — brokers assign the final offsets.
pub fn encode_message_set(
    writer: &mut KafkaWriter,
    messages: &[Message],
    codec: Compression,
) -> Result<EncodeStats> {
    match codec {
        Compression::None => {
            writer.mark_length(|w| {
                for message in messages {
                    encode_entry(w, message.offset, message)?;
                }
                Ok(())
            })?;

            Ok(EncodeStats { bytes_saved: 0 })
        }
        Compression::Gzip => {
            let mut inner = KafkaWriter::new();
            inner.mark_length(|w| {
                for message in messages {
                    encode_entry(w, message.offset, message)?;
                }
                Ok(())
            })?;
            let uncompressed = inner.into_bytes();
            let compressed = gzip_encode(&uncompressed)?;

            writer.mark_length(|w| {
                w.write_i64(0);
                w.mark_length(|w| {
                    w.mark_crc(|w| {
                        w.write_i8(0);
                        w.write_i8(Compression::Gzip.wire_value());
                        w.write_i32(-1);
                        w.mark_length(|w| {
                            w.write_raw(&compressed);
                            Ok(())
                        })
                    })
                })
            })?;

            Ok(EncodeStats {
                bytes_saved: uncompressed.len() as i64 - compressed.len() as i64,
            })
        }
        Compression::Other(bits) => Err(Error::UnsupportedCodec(bits)),
    }
}

/// Decodes a message set starting at the reader's current position. Stops
/// tolerating a truncated trailing entry (fewer than 12 bytes of header
/// remain) without error; a declared `message_size` that overruns the
/// remaining bytes is a hard `BufferUnderRun`.
pub fn decode_message_set(reader: &mut KafkaReader) -> Result<MessageSet> {
    let expected_length = reader.read_i32()?;
    if expected_length < 0 {
        return Ok(MessageSet { messages: Vec::new() });
    }
    let expected_length = expected_length as usize;
    if !reader.available(expected_length) {
        return Err(Error::BufferUnderRun);
    }

    let end = reader.position() + expected_length;
    let mut messages = Vec::new();

    while reader.position() < end {
        if end - reader.position() < MESSAGE_HEADER_SIZE {
            break;
        }

        let offset = reader.read_i64()?;
        let message_size = reader.read_i32()?;
        if message_size < 0 {
            return Err(Error::BufferUnderRun);
        }
        let message_size = message_size as usize;
        if !reader.available(message_size) {
            return Err(Error::BufferUnderRun);
        }

        let body_len = message_size
            .checked_sub(4)
            .ok_or(Error::BufferUnderRun)?;

        let checksum = reader.read_i32()? as u32;
        let computed = reader.crc_hash(body_len)?;
        if computed != checksum {
            trace!("message checksum mismatched, expected={}, current={}", checksum, computed);
            return Err(Error::CrcMismatch);
        }

        let magic = reader.read_i8()?;
        let attributes = reader.read_i8()?;
        let codec = Compression::from(attributes);
        let timestamp = if magic >= 1 { Some(reader.read_i64()?) } else { None };
        let timestamp = timestamp.map(|ts| {
            if attributes & TIMESTAMP_TYPE_MASK == 0 {
                MessageTimestamp::CreateTime(ts)
            } else {
                MessageTimestamp::LogAppendTime(ts)
            }
        });
        let key = reader.read_bytes()?;

        match codec {
            Compression::None => {
                let value = reader.read_bytes()?;

                messages.push(Message {
                    offset,
                    magic,
                    timestamp,
                    compression: Compression::None,
                    key,
                    value,
                });
            }
            Compression::Gzip => {
                let message_length = reader.read_i32()?;
                if message_length < 0 {
                    return Err(Error::BufferUnderRun);
                }
                let compressed = reader.read_raw(message_length as usize)?;
                let decompressed = gzip_decode(&compressed, compressed.len() * 4)?;
                let mut inner_reader = KafkaReader::new(Bytes::from(decompressed));
                let inner_set = decode_message_set(&mut inner_reader)?;
                messages.extend(inner_set.messages);
            }
            Compression::Other(bits) => return Err(Error::UnsupportedCodec(bits)),
        }
    }

    Ok(MessageSet { messages })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(key: &str, value: &str) -> Message {
        Message {
            offset: 0,
            magic: 0,
            timestamp: None,
            compression: Compression::None,
            key: Some(Bytes::from(key.to_owned())),
            value: Some(Bytes::from(value.to_owned())),
        }
    }

    #[test]
    fn encode_three_message_set_matches_fixture() {
        let messages = vec![msg("1", "0"), msg("1", "1"), msg("1", "2")];

        let mut writer = KafkaWriter::new();
        encode_message_set(&mut writer, &messages, Compression::None).unwrap();

        let expected: &[u8] = &[
            0, 0, 0, 0x54, // outer length = 84 (3 entries * 28 bytes each)
            0, 0, 0, 0, 0, 0, 0, 0, // offset 0
            0, 0, 0, 16, // message_size
            45, 70, 24, 62, // crc
            0, 0, // magic, attributes
            0, 0, 0, 1, b'1', // key
            0, 0, 0, 1, b'0', // value
            0, 0, 0, 0, 0, 0, 0, 0, // offset 0
            0, 0, 0, 16,
            90, 65, 40, 168,
            0, 0,
            0, 0, 0, 1, b'1',
            0, 0, 0, 1, b'1',
            0, 0, 0, 0, 0, 0, 0, 0, // offset 0
            0, 0, 0, 16,
            195, 72, 121, 18,
            0, 0,
            0, 0, 0, 1, b'1',
            0, 0, 0, 1, b'2',
        ];

        assert_eq!(writer.as_slice(), expected);
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let messages = vec![msg("a", "b"), msg("", "c")];
        let mut writer = KafkaWriter::new();
        encode_message_set(&mut writer, &messages, Compression::None).unwrap();

        let mut reader = KafkaReader::new(writer.into_bytes());
        let decoded = decode_message_set(&mut reader).unwrap();

        assert_eq!(decoded.messages.len(), 2);
        assert_eq!(decoded.messages[0].key.as_deref(), Some(&b"a"[..]));
        assert_eq!(decoded.messages[1].value.as_deref(), Some(&b"c"[..]));
    }

    #[test]
    fn gzip_round_trip_expands_inner_offsets() {
        let messages = vec![msg("k1", "v1"), msg("k2", "v2"), msg("k3", "v3")];
        let mut writer = KafkaWriter::new();
        encode_message_set(&mut writer, &messages, Compression::Gzip).unwrap();

        let mut reader = KafkaReader::new(writer.into_bytes());
        let decoded = decode_message_set(&mut reader).unwrap();

        assert_eq!(decoded.messages.len(), 3);
        assert_eq!(decoded.messages[2].value.as_deref(), Some(&b"v3"[..]));
    }

    #[test]
    fn bit_flip_in_body_causes_crc_mismatch() {
        let messages = vec![msg("k", "v")];
        let mut writer = KafkaWriter::new();
        encode_message_set(&mut writer, &messages, Compression::None).unwrap();
        let mut bytes = writer.into_bytes().to_vec();

        // flip a bit inside the key, well past the CRC field.
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let mut reader = KafkaReader::new(Bytes::from(bytes));
        let err = decode_message_set(&mut reader).unwrap_err();
        assert!(matches!(err, Error::CrcMismatch));
    }

    #[test]
    fn declared_length_past_buffer_end_is_buffer_underrun() {
        let bytes = Bytes::from_static(&[0, 0, 0, 100, 1, 2, 3]);
        let mut reader = KafkaReader::new(bytes);
        let err = decode_message_set(&mut reader).unwrap_err();
        assert!(matches!(err, Error::BufferUnderRun));
    }

    #[test]
    fn trailing_truncated_entry_is_tolerated() {
        let messages = vec![msg("k", "v")];
        let mut writer = KafkaWriter::new();
        encode_message_set(&mut writer, &messages, Compression::None).unwrap();
        let mut bytes = writer.into_bytes().to_vec();

        // append a short, incomplete trailing entry header (< 12 bytes) and
        // grow the outer declared length to cover it.
        let extra = [0u8; 5];
        let new_len = (bytes.len() - 4 + extra.len()) as i32;
        bytes[0..4].copy_from_slice(&new_len.to_be_bytes());
        bytes.extend_from_slice(&extra);

        let mut reader = KafkaReader::new(Bytes::from(bytes));
        let decoded = decode_message_set(&mut reader).unwrap();
        assert_eq!(decoded.messages.len(), 1);
    }

    #[test]
    fn encoding_an_unsupported_codec_fails() {
        let message = Message { compression: Compression::Other(2), ..msg("k", "v") };
        let mut writer = KafkaWriter::new();
        let err = encode_message_set(&mut writer, &[message], Compression::None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodec(2)));

        let message = msg("k", "v");
        let mut writer = KafkaWriter::new();
        let err = encode_message_set(&mut writer, &[message], Compression::Other(3)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodec(3)));
    }

    #[test]
    fn decoding_an_unsupported_codec_fails() {
        // One entry with attributes = 2 (Snappy's codec bits), magic = 0, a
        // null key and null value; the crc is precomputed over that body.
        let bytes: &[u8] = &[
            0, 0, 0, 26, // outer length
            0, 0, 0, 0, 0, 0, 0, 0, // offset
            0, 0, 0, 14, // message_size
            137, 26, 64, 133, // crc
            0, 2, // magic, attributes (codec = 2)
            255, 255, 255, 255, // null key
            255, 255, 255, 255, // null value
        ];

        let mut reader = KafkaReader::new(Bytes::from_static(bytes));
        let err = decode_message_set(&mut reader).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodec(2)));
    }
}
