//! `Metadata` request/response (api key 3), versions 0-2.
//!
//! Not present in the retrieval pack; reconstructed from spec.md §4.C
//! ("request writes the topic list (nullable array: write -1 for 'all
//! topics'); response carries brokers (+ rack at v>=1), optional cluster id
//! (v>=2), optional controller id (v>=1), and per-topic is_internal
//! (v>=1)"), grounded on the teacher's `write_nullable_array` idiom used
//! for Metadata's topic list in `protocol::mod` (`put_array` there; ported
//! to `KafkaWriter::write_nullable_array` here).

use crate::error::Result;
use crate::protocol::{ApiVersion, ErrorCode, PartitionId, RequestHeader};
use crate::wire::{KafkaReader, KafkaWriter};

#[derive(Clone, Debug, PartialEq)]
pub struct MetadataRequest {
    pub header: RequestHeader,
    /// `None` requests metadata for every topic.
    pub topics: Option<Vec<String>>,
}

impl MetadataRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;

        writer.write_nullable_array(self.topics.as_deref(), |w, topic| {
            w.write_string(Some(topic));
            Ok(())
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetadataResponse {
    pub correlation_id: i32,
    pub brokers: Vec<BrokerMetadata>,
    pub cluster_id: Option<String>,
    pub controller_id: Option<i32>,
    pub topics: Vec<TopicMetadata>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrokerMetadata {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub rack: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicMetadata {
    pub error_code: ErrorCode,
    pub topic_name: String,
    pub is_internal: bool,
    pub partitions: Vec<PartitionMetadata>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PartitionMetadata {
    pub error_code: ErrorCode,
    pub partition: PartitionId,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

impl MetadataResponse {
    pub fn decode(reader: &mut KafkaReader, api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;

        let brokers = reader.read_array(|r| {
            let node_id = r.read_i32()?;
            let host = r.read_required_string()?;
            let port = r.read_i32()?;
            let rack = if api_version >= 1 { r.read_string()? } else { None };

            Ok(BrokerMetadata { node_id, host, port, rack })
        })?;

        let cluster_id = if api_version >= 2 { reader.read_string()? } else { None };
        let controller_id = if api_version >= 1 { Some(reader.read_i32()?) } else { None };

        let topics = reader.read_array(|r| {
            let error_code = r.read_i16()?;
            let topic_name = r.read_required_string()?;
            let is_internal = if api_version >= 1 { r.read_i8()? != 0 } else { false };

            let partitions = r.read_array(|r| {
                Ok(PartitionMetadata {
                    error_code: r.read_i16()?,
                    partition: r.read_i32()?,
                    leader: r.read_i32()?,
                    replicas: r.read_array(|r| r.read_i32())?,
                    isr: r.read_array(|r| r.read_i32())?,
                })
            })?;

            Ok(TopicMetadata { error_code, topic_name, is_internal, partitions })
        })?;

        Ok(MetadataResponse {
            correlation_id: header.correlation_id,
            brokers,
            cluster_id,
            controller_id,
            topics,
        })
    }
}
