//! The `Request` closed sum type and the crate's single encode entry
//! point. Per the design note "model as a closed sum type per direction;
//! the encoder switches on the tag; avoid open dispatch" — replacing the
//! teacher's per-struct `Encodable` trait impls (open dispatch: every new
//! request type is a new `impl Encodable for X`) with one `match` here.

use crate::context::RequestContext;
use crate::error::Result;
use crate::protocol::{
    admin::{CreateTopicsRequest, DeleteTopicsRequest},
    api_versions::ApiVersionsRequest,
    fetch::FetchRequest,
    group::{
        DescribeGroupsRequest, GroupCoordinatorRequest, HeartbeatRequest, JoinGroupRequest,
        LeaveGroupRequest, ListGroupsRequest, SyncGroupRequest,
    },
    list_offsets::ListOffsetsRequest,
    metadata::MetadataRequest,
    offset_commit::OffsetCommitRequest,
    offset_fetch::OffsetFetchRequest,
    produce::ProduceRequest,
    sasl::SaslHandshakeRequest,
    ApiKey, CorrelationId,
};
use crate::wire::KafkaWriter;

/// One variant per supported api key. Requests that need no fields beyond
/// their header still get a variant, matching the set enumerated in
/// spec.md §3 "ApiKey".
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Produce(ProduceRequest),
    Fetch(FetchRequest),
    ListOffsets(ListOffsetsRequest),
    Metadata(MetadataRequest),
    OffsetCommit(OffsetCommitRequest),
    OffsetFetch(OffsetFetchRequest),
    GroupCoordinator(GroupCoordinatorRequest),
    JoinGroup(JoinGroupRequest),
    Heartbeat(HeartbeatRequest),
    LeaveGroup(LeaveGroupRequest),
    SyncGroup(SyncGroupRequest),
    DescribeGroups(DescribeGroupsRequest),
    ListGroups(ListGroupsRequest),
    SaslHandshake(SaslHandshakeRequest),
    ApiVersions(ApiVersionsRequest),
    CreateTopics(CreateTopicsRequest),
    DeleteTopics(DeleteTopicsRequest),
}

impl Request {
    pub fn api_key(&self) -> ApiKey {
        match self {
            Request::Produce(_) => ApiKey::Produce,
            Request::Fetch(_) => ApiKey::Fetch,
            Request::ListOffsets(_) => ApiKey::ListOffsets,
            Request::Metadata(_) => ApiKey::Metadata,
            Request::OffsetCommit(_) => ApiKey::OffsetCommit,
            Request::OffsetFetch(_) => ApiKey::OffsetFetch,
            Request::GroupCoordinator(_) => ApiKey::GroupCoordinator,
            Request::JoinGroup(_) => ApiKey::JoinGroup,
            Request::Heartbeat(_) => ApiKey::Heartbeat,
            Request::LeaveGroup(_) => ApiKey::LeaveGroup,
            Request::SyncGroup(_) => ApiKey::SyncGroup,
            Request::DescribeGroups(_) => ApiKey::DescribeGroups,
            Request::ListGroups(_) => ApiKey::ListGroups,
            Request::SaslHandshake(_) => ApiKey::SaslHandshake,
            Request::ApiVersions(_) => ApiKey::ApiVersions,
            Request::CreateTopics(_) => ApiKey::CreateTopics,
            Request::DeleteTopics(_) => ApiKey::DeleteTopics,
        }
    }

    /// `false` only for Produce with `RequiredAcks::None` — the multiplexer
    /// must not register a completion slot for those (spec.md §4.E).
    pub fn expect_response(&self) -> bool {
        match self {
            Request::Produce(req) => !matches!(req.required_acks, crate::protocol::RequiredAcks::None),
            _ => true,
        }
    }

    /// Overwrites the embedded header's correlation id. The multiplexer
    /// calls this with its freshly minted id right before encoding, so the
    /// id a caller set while building the request (typically 0) never
    /// reaches the wire — only the id registered in the slot table does.
    pub fn set_correlation_id(&mut self, correlation_id: CorrelationId) {
        let header = match self {
            Request::Produce(req) => &mut req.header,
            Request::Fetch(req) => &mut req.header,
            Request::ListOffsets(req) => &mut req.header,
            Request::Metadata(req) => &mut req.header,
            Request::OffsetCommit(req) => &mut req.header,
            Request::OffsetFetch(req) => &mut req.header,
            Request::GroupCoordinator(req) => &mut req.header,
            Request::JoinGroup(req) => &mut req.header,
            Request::Heartbeat(req) => &mut req.header,
            Request::LeaveGroup(req) => &mut req.header,
            Request::SyncGroup(req) => &mut req.header,
            Request::DescribeGroups(req) => &mut req.header,
            Request::ListGroups(req) => &mut req.header,
            Request::SaslHandshake(req) => &mut req.header,
            Request::ApiVersions(req) => &mut req.header,
            Request::CreateTopics(req) => &mut req.header,
            Request::DeleteTopics(req) => &mut req.header,
        };
        header.correlation_id = correlation_id;
    }
}

/// Encodes `request` into a fresh buffer (no leading length prefix — the
/// multiplexer's `mark_length` scope owns framing). `context` supplies the
/// Produce telemetry sink.
pub fn encode(context: &RequestContext, request: &Request) -> Result<bytes::Bytes> {
    let mut writer = KafkaWriter::new();

    match request {
        Request::Produce(req) => {
            let (count, uncompressed, wire_bytes) = req.encode(&mut writer)?;
            context.on_produce_request_messages(count, uncompressed, wire_bytes);
        }
        Request::Fetch(req) => req.encode(&mut writer)?,
        Request::ListOffsets(req) => req.encode(&mut writer)?,
        Request::Metadata(req) => req.encode(&mut writer)?,
        Request::OffsetCommit(req) => req.encode(&mut writer)?,
        Request::OffsetFetch(req) => req.encode(&mut writer)?,
        Request::GroupCoordinator(req) => req.encode(&mut writer)?,
        Request::JoinGroup(req) => req.encode(&mut writer, context)?,
        Request::Heartbeat(req) => req.encode(&mut writer)?,
        Request::LeaveGroup(req) => req.encode(&mut writer)?,
        Request::SyncGroup(req) => req.encode(&mut writer, context)?,
        Request::DescribeGroups(req) => req.encode(&mut writer)?,
        Request::ListGroups(req) => req.encode(&mut writer)?,
        Request::SaslHandshake(req) => req.encode(&mut writer)?,
        Request::ApiVersions(req) => req.encode(&mut writer)?,
        Request::CreateTopics(req) => req.encode(&mut writer)?,
        Request::DeleteTopics(req) => req.encode(&mut writer)?,
    }

    Ok(writer.into_bytes())
}
