//! `OffsetCommit` request/response (api key 8), versions 0-2.
//!
//! Not present in the retrieval pack; reconstructed from spec.md §4.C
//! ("v>=1 includes generation id and member id; v>=2 includes retention
//! (ms, -1 for default)"), in the teacher's grouped topic/partition shape.

use crate::error::Result;
use crate::protocol::{ApiVersion, ErrorCode, GenerationId, Offset, PartitionId, RequestHeader};
use crate::wire::{KafkaReader, KafkaWriter};

const DEFAULT_RETENTION: i64 = -1;

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitRequest {
    pub header: RequestHeader,
    pub group_id: String,
    pub generation_id: GenerationId,
    pub member_id: String,
    pub retention_time: Option<i64>,
    pub topics: Vec<OffsetCommitTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitTopic {
    pub topic_name: String,
    pub partitions: Vec<OffsetCommitPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitPartition {
    pub partition: PartitionId,
    pub offset: Offset,
    pub metadata: Option<String>,
}

impl OffsetCommitRequest {
    /// Builds a request from a flat `(topic, partition)` list, grouping by
    /// topic and preserving each topic's first-occurrence order (spec.md
    /// §4.C "Grouping rule").
    pub fn from_flat(
        header: RequestHeader,
        group_id: String,
        generation_id: GenerationId,
        member_id: String,
        retention_time: Option<i64>,
        partitions: Vec<(String, OffsetCommitPartition)>,
    ) -> Self {
        let topics = crate::protocol::group_by_topic(partitions)
            .into_iter()
            .map(|(topic_name, partitions)| OffsetCommitTopic { topic_name, partitions })
            .collect();

        OffsetCommitRequest { header, group_id, generation_id, member_id, retention_time, topics }
    }

    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;

        writer.write_string(Some(&self.group_id));
        if self.header.api_version >= 1 {
            writer.write_i32(self.generation_id);
            writer.write_string(Some(&self.member_id));
        }
        if self.header.api_version >= 2 {
            writer.write_i64(self.retention_time.unwrap_or(DEFAULT_RETENTION));
        }

        writer.write_array(&self.topics, |w, topic| {
            w.write_string(Some(&topic.topic_name));
            w.write_array(&topic.partitions, |w, partition| {
                w.write_i32(partition.partition);
                w.write_i64(partition.offset);
                w.write_string(partition.metadata.as_deref());
                Ok(())
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitResponse {
    pub correlation_id: i32,
    pub topics: Vec<OffsetCommitTopicResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitTopicResult {
    pub topic_name: String,
    pub partitions: Vec<(PartitionId, ErrorCode)>,
}

impl OffsetCommitResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;

        let topics = reader.read_array(|r| {
            let topic_name = r.read_required_string()?;
            let partitions = r.read_array(|r| Ok((r.read_i32()?, r.read_i16()?)))?;

            Ok(OffsetCommitTopicResult { topic_name, partitions })
        })?;

        Ok(OffsetCommitResponse { correlation_id: header.correlation_id, topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn from_flat_groups_by_topic_preserving_first_occurrence() {
        let header = RequestHeader { api_key: ApiKey::OffsetCommit, api_version: 1, correlation_id: 1, client_id: None };
        let partitions = vec![
            ("b".to_string(), OffsetCommitPartition { partition: 0, offset: 1, metadata: None }),
            ("a".to_string(), OffsetCommitPartition { partition: 0, offset: 2, metadata: None }),
        ];

        let request =
            OffsetCommitRequest::from_flat(header, "group".into(), 1, "member".into(), None, partitions);

        assert_eq!(request.topics.len(), 2);
        assert_eq!(request.topics[0].topic_name, "b");
        assert_eq!(request.topics[1].topic_name, "a");
    }
}
