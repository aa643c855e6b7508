//! `Fetch` request/response (api key 1), versions 0-3.
//!
//! Grounded on the teacher's `protocol::fetch` (`FetchRequest`,
//! `FetchTopic`, `FetchPartition`, `TopicData`, `PartitionData`), carried
//! forward onto `KafkaWriter`/`KafkaReader`. The `max_bytes` field the
//! teacher only wrote per-partition gains the v3 per-request field
//! (spec.md §4.C: "v≥3 adds max_bytes:int32").

use crate::error::Result;
use crate::protocol::message::{decode_message_set, encode_message_set, MessageSet};
use crate::protocol::{ApiVersion, ErrorCode, Offset, PartitionId, RequestHeader, ThrottleTime};
use crate::wire::{KafkaReader, KafkaWriter};

#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    pub header: RequestHeader,
    pub max_wait_time: i32,
    pub min_bytes: i32,
    /// Present from v3 onward; ignored (not written) below v3.
    pub max_bytes: i32,
    pub topics: Vec<FetchTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchTopic {
    pub topic_name: String,
    pub partitions: Vec<FetchPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchPartition {
    pub partition: PartitionId,
    pub fetch_offset: Offset,
    pub max_bytes: i32,
}

const REPLICA_ID_NON_BROKER: i32 = -1;

impl FetchRequest {
    /// Builds a request from a flat `(topic, partition)` list, grouping by
    /// topic and preserving each topic's first-occurrence order (spec.md
    /// §4.C "Grouping rule") instead of requiring a pre-built `topics` tree.
    pub fn from_flat(
        header: RequestHeader,
        max_wait_time: i32,
        min_bytes: i32,
        max_bytes: i32,
        partitions: Vec<(String, FetchPartition)>,
    ) -> Self {
        let topics = crate::protocol::group_by_topic(partitions)
            .into_iter()
            .map(|(topic_name, partitions)| FetchTopic { topic_name, partitions })
            .collect();

        FetchRequest { header, max_wait_time, min_bytes, max_bytes, topics }
    }

    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;

        writer.write_i32(REPLICA_ID_NON_BROKER);
        writer.write_i32(self.max_wait_time);
        writer.write_i32(self.min_bytes);
        if self.header.api_version >= 3 {
            writer.write_i32(self.max_bytes);
        }

        writer.write_array(&self.topics, |w, topic| {
            w.write_string(Some(&topic.topic_name));
            w.write_array(&topic.partitions, |w, partition| {
                w.write_i32(partition.partition);
                w.write_i64(partition.fetch_offset);
                w.write_i32(partition.max_bytes);
                Ok(())
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchResponse {
    pub correlation_id: i32,
    pub throttle_time: Option<ThrottleTime>,
    pub topics: Vec<TopicData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicData {
    pub topic_name: String,
    pub partitions: Vec<PartitionData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PartitionData {
    pub partition: PartitionId,
    pub error_code: ErrorCode,
    pub highwater_mark_offset: Offset,
    pub message_set: MessageSet,
}

impl FetchResponse {
    pub fn decode(reader: &mut KafkaReader, api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        let throttle_time = if api_version > 0 { Some(reader.read_i32()?) } else { None };

        let topics = reader.read_array(|r| {
            let topic_name = r.read_required_string()?;
            let partitions = r.read_array(|r| {
                let partition = r.read_i32()?;
                let error_code = r.read_i16()?;
                let highwater_mark_offset = r.read_i64()?;
                let message_set = decode_message_set(r)?;

                Ok(PartitionData { partition, error_code, highwater_mark_offset, message_set })
            })?;

            Ok(TopicData { topic_name, partitions })
        })?;

        Ok(FetchResponse { correlation_id: header.correlation_id, throttle_time, topics })
    }
}

/// Encodes the leading `offset:int64 || message_size:int32` entry header
/// and body for a single outgoing message, reused by `ProduceRequest`.
pub(crate) fn encode_partition_payload(
    writer: &mut KafkaWriter,
    messages: &[crate::protocol::message::Message],
    codec: crate::compression::Compression,
) -> Result<i64> {
    let stats = encode_message_set(writer, messages, codec)?;
    Ok(stats.bytes_saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn from_flat_groups_by_topic_preserving_first_occurrence() {
        let header = RequestHeader { api_key: ApiKey::Fetch, api_version: 1, correlation_id: 1, client_id: None };
        let partitions = vec![
            ("b".to_string(), FetchPartition { partition: 0, fetch_offset: 10, max_bytes: 1024 }),
            ("a".to_string(), FetchPartition { partition: 1, fetch_offset: 0, max_bytes: 1024 }),
            ("a".to_string(), FetchPartition { partition: 0, fetch_offset: 5, max_bytes: 1024 }),
        ];

        let request = FetchRequest::from_flat(header, 100, 1, 4096, partitions);

        assert_eq!(request.topics.len(), 2);
        assert_eq!(request.topics[0].topic_name, "b");
        assert_eq!(request.topics[1].topic_name, "a");
        assert_eq!(request.topics[1].partitions.len(), 2);
        assert_eq!(request.topics[1].partitions[0].partition, 1);
        assert_eq!(request.topics[1].partitions[1].partition, 0);
    }
}
