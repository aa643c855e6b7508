//! The `Response` closed sum type and the crate's single decode entry
//! point. Mirrors `protocol::request`'s sum-type/`match` dispatch.

use bytes::Bytes;

use crate::context::RequestContext;
use crate::error::Result;
use crate::protocol::{
    admin::{CreateTopicsResponse, DeleteTopicsResponse},
    api_versions::ApiVersionsResponse,
    fetch::FetchResponse,
    group::{
        DescribeGroupsResponse, GroupCoordinatorResponse, HeartbeatResponse, JoinGroupResponse,
        LeaveGroupResponse, ListGroupsResponse, SyncGroupResponse,
    },
    list_offsets::ListOffsetsResponse,
    metadata::MetadataResponse,
    offset_commit::OffsetCommitResponse,
    offset_fetch::OffsetFetchResponse,
    produce::ProduceResponse,
    sasl::SaslHandshakeResponse,
    ApiKey, ApiVersion,
};
use crate::wire::KafkaReader;

#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Produce(ProduceResponse),
    Fetch(FetchResponse),
    ListOffsets(ListOffsetsResponse),
    Metadata(MetadataResponse),
    OffsetCommit(OffsetCommitResponse),
    OffsetFetch(OffsetFetchResponse),
    GroupCoordinator(GroupCoordinatorResponse),
    JoinGroup(JoinGroupResponse),
    Heartbeat(HeartbeatResponse),
    LeaveGroup(LeaveGroupResponse),
    SyncGroup(SyncGroupResponse),
    DescribeGroups(DescribeGroupsResponse),
    ListGroups(ListGroupsResponse),
    SaslHandshake(SaslHandshakeResponse),
    ApiVersions(ApiVersionsResponse),
    CreateTopics(CreateTopicsResponse),
    DeleteTopics(DeleteTopicsResponse),
}

impl Response {
    pub fn correlation_id(&self) -> i32 {
        match self {
            Response::Produce(r) => r.correlation_id,
            Response::Fetch(r) => r.correlation_id,
            Response::ListOffsets(r) => r.correlation_id,
            Response::Metadata(r) => r.correlation_id,
            Response::OffsetCommit(r) => r.correlation_id,
            Response::OffsetFetch(r) => r.correlation_id,
            Response::GroupCoordinator(r) => r.correlation_id,
            Response::JoinGroup(r) => r.correlation_id,
            Response::Heartbeat(r) => r.correlation_id,
            Response::LeaveGroup(r) => r.correlation_id,
            Response::SyncGroup(r) => r.correlation_id,
            Response::DescribeGroups(r) => r.correlation_id,
            Response::ListGroups(r) => r.correlation_id,
            Response::SaslHandshake(r) => r.correlation_id,
            Response::ApiVersions(r) => r.correlation_id,
            Response::CreateTopics(r) => r.correlation_id,
            Response::DeleteTopics(r) => r.correlation_id,
        }
    }
}

/// Decodes `bytes` into a typed response for `api_key`, using
/// `context.api_version` to pick the wire shape. `has_size` strips a
/// leading 4-byte length prefix before the correlation id, matching the
/// two call sites spec.md §4.C distinguishes (a raw frame straight off the
/// wire vs. one whose length the transport already consumed). `api_key` is
/// always the one recorded on the matching request's slot at send time
/// (`Request::api_key`), never parsed from the response frame itself, which
/// carries only the correlation id (spec.md §4.C). Because `api_key` is
/// already a resolved [`ApiKey`] rather than a raw wire integer by the time
/// it reaches this function, there is no unknown-api-key case to handle
/// here; [`ApiKey::from_wire`] is a standalone conversion for callers that
/// do start from a raw wire value (e.g. matching an `ApiVersionsResponse`
/// entry against a known key), not part of this dispatch.
pub fn decode(context: &RequestContext, api_key: ApiKey, bytes: Bytes, has_size: bool) -> Result<Option<Response>> {
    let mut reader = KafkaReader::new(bytes);
    if has_size {
        reader.read_i32()?;
    }

    let version = context.api_version.unwrap_or(0);

    let response = match api_key {
        ApiKey::Produce => Response::Produce(ProduceResponse::decode(&mut reader, version)?),
        ApiKey::Fetch => Response::Fetch(FetchResponse::decode(&mut reader, version)?),
        ApiKey::ListOffsets => Response::ListOffsets(ListOffsetsResponse::decode(&mut reader, version)?),
        ApiKey::Metadata => Response::Metadata(MetadataResponse::decode(&mut reader, version)?),
        ApiKey::OffsetCommit => Response::OffsetCommit(OffsetCommitResponse::decode(&mut reader, version)?),
        ApiKey::OffsetFetch => Response::OffsetFetch(OffsetFetchResponse::decode(&mut reader, version)?),
        ApiKey::GroupCoordinator => {
            Response::GroupCoordinator(GroupCoordinatorResponse::decode(&mut reader, version)?)
        }
        ApiKey::JoinGroup => Response::JoinGroup(JoinGroupResponse::decode(&mut reader, version, context)?),
        ApiKey::Heartbeat => Response::Heartbeat(HeartbeatResponse::decode(&mut reader, version)?),
        ApiKey::LeaveGroup => Response::LeaveGroup(LeaveGroupResponse::decode(&mut reader, version)?),
        ApiKey::SyncGroup => Response::SyncGroup(SyncGroupResponse::decode(&mut reader, version, context)?),
        ApiKey::DescribeGroups => {
            Response::DescribeGroups(DescribeGroupsResponse::decode(&mut reader, version, context)?)
        }
        ApiKey::ListGroups => Response::ListGroups(ListGroupsResponse::decode(&mut reader, version)?),
        ApiKey::SaslHandshake => Response::SaslHandshake(SaslHandshakeResponse::decode(&mut reader, version)?),
        ApiKey::ApiVersions => Response::ApiVersions(ApiVersionsResponse::decode(&mut reader)?),
        ApiKey::CreateTopics => Response::CreateTopics(CreateTopicsResponse::decode(&mut reader, version)?),
        ApiKey::DeleteTopics => Response::DeleteTopics(DeleteTopicsResponse::decode(&mut reader, version)?),
    };

    Ok(Some(response))
}
