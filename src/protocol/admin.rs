//! `CreateTopics`/`DeleteTopics` requests/responses (api keys 19, 20).

use crate::error::Result;
use crate::protocol::{ApiVersion, ErrorCode, RequestHeader};
use crate::wire::{KafkaReader, KafkaWriter};

#[derive(Clone, Debug, PartialEq)]
pub struct CreateTopicsRequest {
    pub header: RequestHeader,
    pub topics: Vec<TopicCreation>,
    pub timeout: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicCreation {
    pub topic_name: String,
    pub num_partitions: i32,
    pub replication_factor: i16,
    pub replica_assignments: Vec<(i32, Vec<i32>)>,
    pub configs: Vec<(String, String)>,
}

impl CreateTopicsRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;

        writer.write_array(&self.topics, |w, topic| {
            w.write_string(Some(&topic.topic_name));
            w.write_i32(topic.num_partitions);
            w.write_i16(topic.replication_factor);
            w.write_array(&topic.replica_assignments, |w, (partition, replicas)| {
                w.write_i32(*partition);
                w.write_array(replicas, |w, replica| {
                    w.write_i32(*replica);
                    Ok(())
                })
            })?;
            w.write_array(&topic.configs, |w, (key, value)| {
                w.write_string(Some(key));
                w.write_string(Some(value));
                Ok(())
            })
        })?;

        writer.write_i32(self.timeout);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateTopicsResponse {
    pub correlation_id: i32,
    pub topics: Vec<TopicCreationResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicCreationResult {
    pub topic_name: String,
    pub error_code: ErrorCode,
}

impl CreateTopicsResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        let topics = reader.read_array(|r| {
            Ok(TopicCreationResult { topic_name: r.read_required_string()?, error_code: r.read_i16()? })
        })?;

        Ok(CreateTopicsResponse { correlation_id: header.correlation_id, topics })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteTopicsRequest {
    pub header: RequestHeader,
    pub topics: Vec<String>,
    pub timeout: i32,
}

impl DeleteTopicsRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;
        writer.write_array(&self.topics, |w, topic| {
            w.write_string(Some(topic));
            Ok(())
        })?;
        writer.write_i32(self.timeout);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteTopicsResponse {
    pub correlation_id: i32,
    pub topics: Vec<TopicDeletionResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicDeletionResult {
    pub topic_name: String,
    pub error_code: ErrorCode,
}

impl DeleteTopicsResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        let topics = reader.read_array(|r| {
            Ok(TopicDeletionResult { topic_name: r.read_required_string()?, error_code: r.read_i16()? })
        })?;

        Ok(DeleteTopicsResponse { correlation_id: header.correlation_id, topics })
    }
}
