//! `Produce` request/response (api key 0), versions 0-2.
//!
//! Not present in the retrieval pack (filtered out of the teacher's
//! checkout); reconstructed from spec.md §4.C's version table in the same
//! grouped-by-topic/partition shape as `protocol::fetch::FetchRequest`, and
//! cross-checked against the Fetch/Produce wire shapes in
//! `f1shl3gs-rskafka`'s `protocol::messages` modules from the retrieval
//! pack's `other_examples/`.

use crate::compression::Compression;
use crate::error::Result;
use crate::protocol::fetch::encode_partition_payload;
use crate::protocol::message::{decode_message_set, Message, MessageSet};
use crate::protocol::{ApiVersion, ErrorCode, Offset, PartitionId, RequestHeader, RequiredAcks, ThrottleTime};
use crate::wire::{KafkaReader, KafkaWriter};

#[derive(Clone, Debug, PartialEq)]
pub struct ProduceRequest {
    pub header: RequestHeader,
    pub required_acks: RequiredAcks,
    pub timeout: i32,
    pub compression: Compression,
    pub topics: Vec<ProduceTopicData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProduceTopicData {
    pub topic_name: String,
    pub partitions: Vec<ProducePartitionData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProducePartitionData {
    pub partition: PartitionId,
    pub messages: Vec<Message>,
}

impl ProduceRequest {
    /// Builds a request from a flat `(topic, partition, message)` list,
    /// grouping by topic then partition and preserving each pair's
    /// first-occurrence order (spec.md §4.C "Grouping rule") instead of
    /// requiring the caller to pre-build the nested `topics` tree.
    pub fn from_flat(
        header: RequestHeader,
        required_acks: RequiredAcks,
        timeout: i32,
        compression: Compression,
        records: Vec<(String, PartitionId, Message)>,
    ) -> Self {
        let topics = crate::protocol::group_by_topic_partition(records)
            .into_iter()
            .map(|(topic_name, partitions)| ProduceTopicData {
                topic_name,
                partitions: partitions
                    .into_iter()
                    .map(|(partition, messages)| ProducePartitionData { partition, messages })
                    .collect(),
            })
            .collect();

        ProduceRequest { header, required_acks, timeout, compression, topics }
    }

    /// Returns the telemetry triple `(message_count, uncompressed_bytes,
    /// wire_bytes)`, matching `RequestContext::on_produce_request_messages`.
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<(usize, usize, usize)> {
        self.header.encode(writer)?;

        writer.write_i16(self.required_acks as i16);
        writer.write_i32(self.timeout);

        let mut message_count = 0;
        let mut bytes_saved_total = 0i64;
        let start = writer.len();

        writer.write_array(&self.topics, |w, topic| {
            w.write_string(Some(&topic.topic_name));
            w.write_array(&topic.partitions, |w, partition| {
                message_count += partition.messages.len();
                w.write_i32(partition.partition);
                // `encode_partition_payload` already writes the message
                // set's own length prefix (`encode_message_set`'s
                // `mark_length`) — wrapping it in a second one here would
                // double up the length field that `decode_message_set`
                // expects exactly once.
                let saved = encode_partition_payload(w, &partition.messages, self.compression)?;
                bytes_saved_total += saved;
                Ok(())
            })
        })?;

        let wire_bytes = writer.len() - start;
        let uncompressed_bytes = wire_bytes + bytes_saved_total.max(0) as usize;

        Ok((message_count, uncompressed_bytes, wire_bytes))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProduceResponse {
    pub correlation_id: i32,
    pub topics: Vec<ProduceTopicResult>,
    pub throttle_time: Option<ThrottleTime>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProduceTopicResult {
    pub topic_name: String,
    pub partitions: Vec<ProducePartitionResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProducePartitionResult {
    pub partition: PartitionId,
    pub error_code: ErrorCode,
    pub offset: Offset,
    /// Present from v2 onward: the broker's log-append timestamp.
    pub log_append_time: Option<i64>,
}

impl ProduceResponse {
    pub fn decode(reader: &mut KafkaReader, api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;

        let topics = reader.read_array(|r| {
            let topic_name = r.read_required_string()?;
            let partitions = r.read_array(|r| {
                let partition = r.read_i32()?;
                let error_code = r.read_i16()?;
                let offset = r.read_i64()?;
                let log_append_time = if api_version >= 2 { Some(r.read_i64()?) } else { None };

                Ok(ProducePartitionResult { partition, error_code, offset, log_append_time })
            })?;

            Ok(ProduceTopicResult { topic_name, partitions })
        })?;

        let throttle_time = if api_version >= 1 { Some(reader.read_i32()?) } else { None };

        Ok(ProduceResponse { correlation_id: header.correlation_id, topics, throttle_time })
    }
}

/// Used internally by decode tests that need a standalone message set
/// without the surrounding partition framing.
#[cfg(test)]
fn decode_bare_message_set(bytes: bytes::Bytes) -> Result<MessageSet> {
    let mut reader = KafkaReader::new(bytes);
    decode_message_set(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ApiKey, FetchOffset};

    #[test]
    fn encode_reports_message_count_and_sizes() {
        let message = Message {
            offset: 0,
            magic: 0,
            timestamp: None,
            compression: Compression::None,
            key: None,
            value: Some(bytes::Bytes::from_static(b"payload")),
        };

        let request = ProduceRequest {
            header: RequestHeader {
                api_key: ApiKey::Produce,
                api_version: 1,
                correlation_id: 7,
                client_id: None,
            },
            required_acks: RequiredAcks::One,
            timeout: 1000,
            compression: Compression::None,
            topics: vec![ProduceTopicData {
                topic_name: "topic".into(),
                partitions: vec![ProducePartitionData { partition: 0, messages: vec![message] }],
            }],
        };

        let mut writer = KafkaWriter::new();
        let (count, _uncompressed, wire_bytes) = request.encode(&mut writer).unwrap();

        assert_eq!(count, 1);
        assert!(wire_bytes > 0);
        assert_eq!(FetchOffset::Latest.as_wire_time(), -1);
    }

    #[test]
    fn from_flat_groups_by_topic_then_partition_preserving_first_occurrence() {
        fn message(value: &str) -> Message {
            Message {
                offset: 0,
                magic: 0,
                timestamp: None,
                compression: Compression::None,
                key: None,
                value: Some(bytes::Bytes::from(value.to_owned())),
            }
        }

        let header = RequestHeader { api_key: ApiKey::Produce, api_version: 1, correlation_id: 1, client_id: None };
        let records = vec![
            ("b".to_string(), 0, message("b0-first")),
            ("a".to_string(), 1, message("a1")),
            ("a".to_string(), 0, message("a0")),
            ("b".to_string(), 0, message("b0-second")),
        ];

        let request = ProduceRequest::from_flat(header, RequiredAcks::One, 1000, Compression::None, records);

        assert_eq!(request.topics.len(), 2);
        assert_eq!(request.topics[0].topic_name, "b");
        assert_eq!(request.topics[1].topic_name, "a");

        // Partition 0 saw "b" first, then partition 1 — first-occurrence
        // order preserved within the topic.
        assert_eq!(request.topics[1].partitions[0].partition, 1);
        assert_eq!(request.topics[1].partitions[1].partition, 0);

        // Both messages addressed to ("b", 0) land in the same partition
        // bucket, in the order they were given.
        assert_eq!(request.topics[0].partitions.len(), 1);
        assert_eq!(request.topics[0].partitions[0].messages.len(), 2);
        assert_eq!(request.topics[0].partitions[0].messages[0].value.as_deref(), Some(&b"b0-first"[..]));
        assert_eq!(request.topics[0].partitions[0].messages[1].value.as_deref(), Some(&b"b0-second"[..]));
    }

    #[test]
    fn encode_writes_exactly_one_length_prefix_per_partition() {
        let message = Message {
            offset: 0,
            magic: 0,
            timestamp: None,
            compression: Compression::None,
            key: None,
            value: Some(bytes::Bytes::from_static(b"payload")),
        };

        let request = ProduceRequest {
            header: RequestHeader { api_key: ApiKey::Produce, api_version: 1, correlation_id: 7, client_id: None },
            required_acks: RequiredAcks::One,
            timeout: 1000,
            compression: Compression::None,
            topics: vec![ProduceTopicData {
                topic_name: "topic".into(),
                partitions: vec![ProducePartitionData { partition: 0, messages: vec![message] }],
            }],
        };

        let mut writer = KafkaWriter::new();
        request.encode(&mut writer).unwrap();

        // Replay the bytes the way a `ProduceResponse`-shaped reader would:
        // header, acks, timeout, topic array, partition id, then the message
        // set directly — no extra length field in between.
        let mut reader = KafkaReader::new(writer.into_bytes());
        reader.read_i16().unwrap(); // api_key
        reader.read_i16().unwrap(); // api_version
        reader.read_i32().unwrap(); // correlation_id
        reader.read_string().unwrap(); // client_id
        reader.read_i16().unwrap(); // required_acks
        reader.read_i32().unwrap(); // timeout
        let topics = reader.read_array(|r| {
            let topic_name = r.read_required_string()?;
            let partitions = r.read_array(|r| {
                let partition = r.read_i32()?;
                let message_set = decode_message_set(r)?;
                Ok((partition, message_set))
            })?;
            Ok((topic_name, partitions))
        })
        .unwrap();

        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].1.len(), 1);
        assert_eq!(topics[0].1[0].1.messages.len(), 1);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn decode_bare_set_roundtrips_through_produce_message_codec() {
        let message = Message {
            offset: 0,
            magic: 0,
            timestamp: None,
            compression: Compression::None,
            key: None,
            value: Some(bytes::Bytes::from_static(b"v")),
        };

        let mut writer = KafkaWriter::new();
        crate::protocol::message::encode_message_set(&mut writer, &[message], Compression::None).unwrap();

        let decoded = decode_bare_message_set(writer.into_bytes()).unwrap();
        assert_eq!(decoded.messages.len(), 1);
    }
}
