//! `OffsetFetch` request/response (api key 9). Standard wire shape, no
//! per-version field variation within the covered range (spec.md §4.C).

use crate::error::Result;
use crate::protocol::{ApiVersion, ErrorCode, Offset, PartitionId, RequestHeader};
use crate::wire::{KafkaReader, KafkaWriter};

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchRequest {
    pub header: RequestHeader,
    pub group_id: String,
    pub topics: Vec<OffsetFetchTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchTopic {
    pub topic_name: String,
    pub partitions: Vec<PartitionId>,
}

impl OffsetFetchRequest {
    /// Builds a request from a flat `(topic, partition)` list, grouping by
    /// topic and preserving each topic's first-occurrence order (spec.md
    /// §4.C "Grouping rule").
    pub fn from_flat(header: RequestHeader, group_id: String, partitions: Vec<(String, PartitionId)>) -> Self {
        let topics = crate::protocol::group_by_topic(partitions)
            .into_iter()
            .map(|(topic_name, partitions)| OffsetFetchTopic { topic_name, partitions })
            .collect();

        OffsetFetchRequest { header, group_id, topics }
    }

    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;

        writer.write_string(Some(&self.group_id));
        writer.write_array(&self.topics, |w, topic| {
            w.write_string(Some(&topic.topic_name));
            w.write_array(&topic.partitions, |w, partition| {
                w.write_i32(*partition);
                Ok(())
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchResponse {
    pub correlation_id: i32,
    pub topics: Vec<OffsetFetchTopicResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchTopicResult {
    pub topic_name: String,
    pub partitions: Vec<OffsetFetchPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchPartition {
    pub partition: PartitionId,
    pub offset: Offset,
    pub metadata: Option<String>,
    pub error_code: ErrorCode,
}

impl OffsetFetchResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;

        let topics = reader.read_array(|r| {
            let topic_name = r.read_required_string()?;
            let partitions = r.read_array(|r| {
                Ok(OffsetFetchPartition {
                    partition: r.read_i32()?,
                    offset: r.read_i64()?,
                    metadata: r.read_string()?,
                    error_code: r.read_i16()?,
                })
            })?;

            Ok(OffsetFetchTopicResult { topic_name, partitions })
        })?;

        Ok(OffsetFetchResponse { correlation_id: header.correlation_id, topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn from_flat_groups_by_topic_preserving_first_occurrence() {
        let header = RequestHeader { api_key: ApiKey::OffsetFetch, api_version: 1, correlation_id: 1, client_id: None };
        let partitions =
            vec![("b".to_string(), 0), ("a".to_string(), 1), ("a".to_string(), 0), ("b".to_string(), 1)];

        let request = OffsetFetchRequest::from_flat(header, "group".into(), partitions);

        assert_eq!(request.topics.len(), 2);
        assert_eq!(request.topics[0].topic_name, "b");
        assert_eq!(request.topics[0].partitions, vec![0, 1]);
        assert_eq!(request.topics[1].topic_name, "a");
        assert_eq!(request.topics[1].partitions, vec![1, 0]);
    }
}
