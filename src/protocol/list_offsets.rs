//! `ListOffsets` request/response (api key 2, wire name "Offset"),
//! versions 0-1.
//!
//! Not present in the retrieval pack; reconstructed from spec.md §4.C ("v0
//! requests carry max_offsets; v1 does not. v0 response carries an array of
//! offsets per partition; v1 a single offset plus a timestamp"), in the
//! same grouped request shape as `protocol::fetch::FetchRequest`.

use crate::error::Result;
use crate::protocol::{ApiVersion, ErrorCode, FetchOffset, Offset, PartitionId, RequestHeader};
use crate::wire::{KafkaReader, KafkaWriter};

const NO_REPLICA: i32 = -1;

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsRequest {
    pub header: RequestHeader,
    pub topics: Vec<ListOffsetsTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsTopic {
    pub topic_name: String,
    pub partitions: Vec<ListOffsetsPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsPartition {
    pub partition: PartitionId,
    pub timestamp: FetchOffset,
    /// Only written at v0.
    pub max_offsets: i32,
}

impl ListOffsetsRequest {
    /// Builds a request from a flat `(topic, partition)` list, grouping by
    /// topic and preserving each topic's first-occurrence order (spec.md
    /// §4.C "Grouping rule").
    pub fn from_flat(header: RequestHeader, partitions: Vec<(String, ListOffsetsPartition)>) -> Self {
        let topics = crate::protocol::group_by_topic(partitions)
            .into_iter()
            .map(|(topic_name, partitions)| ListOffsetsTopic { topic_name, partitions })
            .collect();

        ListOffsetsRequest { header, topics }
    }

    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;

        writer.write_i32(NO_REPLICA);
        writer.write_array(&self.topics, |w, topic| {
            w.write_string(Some(&topic.topic_name));
            w.write_array(&topic.partitions, |w, partition| {
                w.write_i32(partition.partition);
                w.write_i64(partition.timestamp.as_wire_time());
                if self.header.api_version == 0 {
                    w.write_i32(partition.max_offsets);
                }
                Ok(())
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsResponse {
    pub correlation_id: i32,
    pub topics: Vec<TopicOffsets>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicOffsets {
    pub topic_name: String,
    pub partitions: Vec<PartitionOffsets>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PartitionOffsets {
    pub partition: PartitionId,
    pub error_code: ErrorCode,
    /// v0: every offset the broker found matching the query.
    pub offsets: Vec<Offset>,
    /// v1 only.
    pub timestamp: Option<i64>,
}

impl ListOffsetsResponse {
    pub fn decode(reader: &mut KafkaReader, api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;

        let topics = reader.read_array(|r| {
            let topic_name = r.read_required_string()?;
            let partitions = r.read_array(|r| {
                let partition = r.read_i32()?;
                let error_code = r.read_i16()?;

                if api_version == 0 {
                    let offsets = r.read_array(|r| r.read_i64())?;
                    Ok(PartitionOffsets { partition, error_code, offsets, timestamp: None })
                } else {
                    let timestamp = r.read_i64()?;
                    let offset = r.read_i64()?;
                    Ok(PartitionOffsets {
                        partition,
                        error_code,
                        offsets: vec![offset],
                        timestamp: Some(timestamp),
                    })
                }
            })?;

            Ok(TopicOffsets { topic_name, partitions })
        })?;

        Ok(ListOffsetsResponse { correlation_id: header.correlation_id, topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn from_flat_groups_by_topic_preserving_first_occurrence() {
        let header = RequestHeader { api_key: ApiKey::ListOffsets, api_version: 1, correlation_id: 1, client_id: None };
        let partitions = vec![
            ("b".to_string(), ListOffsetsPartition { partition: 0, timestamp: FetchOffset::Latest, max_offsets: 1 }),
            ("a".to_string(), ListOffsetsPartition { partition: 0, timestamp: FetchOffset::Earliest, max_offsets: 1 }),
        ];

        let request = ListOffsetsRequest::from_flat(header, partitions);

        assert_eq!(request.topics.len(), 2);
        assert_eq!(request.topics[0].topic_name, "b");
        assert_eq!(request.topics[1].topic_name, "a");
    }
}
