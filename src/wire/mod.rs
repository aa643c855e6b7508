//! Big-endian byte buffer primitives used by every codec layer above this one.
//!
//! `KafkaWriter` and `KafkaReader` are the component described as "byte
//! buffer primitives" — growable/cursored big-endian sinks and sources with
//! scoped length and CRC markers, modeled on the manual offset bookkeeping
//! the teacher performs inline in `protocol::message::encode_message`.

mod reader;
mod writer;

pub use self::reader::KafkaReader;
pub use self::writer::{CrcScope, KafkaWriter, LengthScope};
