use std::collections::HashMap;

mod admin;
mod api_versions;
mod fetch;
mod group;
mod header;
mod list_offsets;
mod message;
mod metadata;
mod offset_commit;
mod offset_fetch;
mod produce;
pub mod request;
pub mod response;
mod sasl;

pub use self::admin::{
    CreateTopicsRequest, CreateTopicsResponse, DeleteTopicsRequest, DeleteTopicsResponse,
    TopicCreation, TopicCreationResult, TopicDeletionResult,
};
pub use self::api_versions::{ApiVersionsRequest, ApiVersionsResponse, SupportedApiVersion};
pub use self::fetch::{FetchPartition, FetchRequest, FetchTopic, PartitionData, TopicData};
pub use self::group::{
    DescribeGroupsRequest, DescribeGroupsResponse, GroupCoordinatorRequest,
    GroupCoordinatorResponse, GroupListing, GroupMemberSummary, GroupSummary, HeartbeatRequest,
    HeartbeatResponse, JoinGroupMember, JoinGroupProtocol, JoinGroupRequest, JoinGroupResponse,
    LeaveGroupRequest, LeaveGroupResponse, ListGroupsRequest, ListGroupsResponse,
    SyncGroupAssignment, SyncGroupRequest, SyncGroupResponse,
};
pub use self::header::{parse_response_header, RequestHeader, ResponseHeader};
pub use self::list_offsets::{
    ListOffsetsPartition, ListOffsetsRequest, ListOffsetsTopic, PartitionOffsets, TopicOffsets,
};
pub use self::message::{Message, MessageSet, MessageTimestamp};
pub use self::metadata::{
    BrokerMetadata, MetadataRequest, MetadataResponse, PartitionMetadata, TopicMetadata,
};
pub use self::offset_commit::{
    OffsetCommitPartition, OffsetCommitRequest, OffsetCommitResponse, OffsetCommitTopic,
    OffsetCommitTopicResult,
};
pub use self::offset_fetch::{
    OffsetFetchPartition, OffsetFetchRequest, OffsetFetchResponse, OffsetFetchTopic,
    OffsetFetchTopicResult,
};
pub use self::produce::{
    ProducePartitionData, ProducePartitionResult, ProduceRequest, ProduceResponse,
    ProduceTopicData, ProduceTopicResult,
};
pub use self::request::Request;
pub use self::response::Response;
pub use self::sasl::{SaslHandshakeRequest, SaslHandshakeResponse};

/// Integer tag selecting a schema variant of a given API key.
pub type ApiVersion = i16;
/// 32-bit correlation id chosen by the client, echoed by the broker.
pub type CorrelationId = i32;
/// Signed error code; 0 = no error.
pub type ErrorCode = i16;
/// Kafka log offset.
pub type Offset = i64;
/// Partition index within a topic.
pub type PartitionId = i32;
/// Consumer-group generation id.
pub type GenerationId = i32;
/// Server-reported throttle duration, in milliseconds.
pub type ThrottleTime = i32;

/// The numeric codes the ApiKey in a request header may take, matching the
/// Kafka protocol's own wire values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    OffsetCommit = 8,
    OffsetFetch = 9,
    GroupCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    DescribeGroups = 15,
    ListGroups = 16,
    SaslHandshake = 17,
    ApiVersions = 18,
    CreateTopics = 19,
    DeleteTopics = 20,
}

impl ApiKey {
    pub fn from_wire(v: i16) -> Option<ApiKey> {
        match v {
            0 => Some(ApiKey::Produce),
            1 => Some(ApiKey::Fetch),
            2 => Some(ApiKey::ListOffsets),
            3 => Some(ApiKey::Metadata),
            8 => Some(ApiKey::OffsetCommit),
            9 => Some(ApiKey::OffsetFetch),
            10 => Some(ApiKey::GroupCoordinator),
            11 => Some(ApiKey::JoinGroup),
            12 => Some(ApiKey::Heartbeat),
            13 => Some(ApiKey::LeaveGroup),
            14 => Some(ApiKey::SyncGroup),
            15 => Some(ApiKey::DescribeGroups),
            16 => Some(ApiKey::ListGroups),
            17 => Some(ApiKey::SaslHandshake),
            18 => Some(ApiKey::ApiVersions),
            19 => Some(ApiKey::CreateTopics),
            20 => Some(ApiKey::DeleteTopics),
            _ => None,
        }
    }

    pub fn wire_value(self) -> i16 {
        self as i16
    }
}

/// Possible choices on acknowledgement requirements when producing messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i16)]
pub enum RequiredAcks {
    /// Fire-and-forget: the broker does not acknowledge the message at all.
    None = 0,
    /// The broker acknowledges once the message is written to local disk.
    One = 1,
    /// The broker acknowledges once all in-sync replicas have the message.
    All = -1,
}

impl From<i16> for RequiredAcks {
    fn from(v: i16) -> Self {
        match v {
            0 => RequiredAcks::None,
            1 => RequiredAcks::One,
            _ => RequiredAcks::All,
        }
    }
}

/// Where to search from when listing offsets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FetchOffset {
    Latest,
    Earliest,
    ByTime(i64),
}

impl FetchOffset {
    pub fn as_wire_time(self) -> i64 {
        match self {
            FetchOffset::Latest => -1,
            FetchOffset::Earliest => -2,
            FetchOffset::ByTime(ts) => ts,
        }
    }
}

/// Groups a flat `(topic, item)` list into per-topic buckets, preserving
/// the order each topic name first appears in and the relative order of
/// items within it (spec.md §4.C "Grouping rule").
pub(crate) fn group_by_topic<T>(flat: Vec<(String, T)>) -> Vec<(String, Vec<T>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();

    for (topic, item) in flat {
        let idx = match index.get(&topic) {
            Some(&i) => i,
            None => {
                let i = groups.len();
                groups.push((topic.clone(), Vec::new()));
                index.insert(topic, i);
                i
            }
        };
        groups[idx].1.push(item);
    }

    groups
}

/// Groups a flat `(topic, partition, item)` list into nested topic then
/// partition buckets, preserving each (topic, partition) pair's
/// first-occurrence order (spec.md §4.C "Grouping rule"). Used where a
/// single partition can carry more than one item, e.g. several messages in
/// one `Produce` partition.
pub(crate) fn group_by_topic_partition<T>(
    flat: Vec<(String, PartitionId, T)>,
) -> Vec<(String, Vec<(PartitionId, Vec<T>)>)> {
    let mut topic_index: HashMap<String, usize> = HashMap::new();
    let mut topics: Vec<(String, Vec<(PartitionId, Vec<T>)>)> = Vec::new();

    for (topic, partition, item) in flat {
        let t_idx = match topic_index.get(&topic) {
            Some(&i) => i,
            None => {
                let i = topics.len();
                topics.push((topic.clone(), Vec::new()));
                topic_index.insert(topic, i);
                i
            }
        };

        let partitions = &mut topics[t_idx].1;
        match partitions.iter().position(|(p, _)| *p == partition) {
            Some(p_idx) => partitions[p_idx].1.push(item),
            None => partitions.push((partition, vec![item])),
        }
    }

    topics
}