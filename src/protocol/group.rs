//! Consumer-group coordination APIs: GroupCoordinator, JoinGroup,
//! SyncGroup, Heartbeat, LeaveGroup, DescribeGroups, ListGroups (api keys
//! 10-16). The opaque `metadata`/`assignment` blobs are encoded/decoded
//! through the context's [`crate::membership::MembershipRegistry`] rather
//! than interpreted here, per spec.md §4.G — grounded on the teacher's
//! `consumer::coordinator::Inner::group_protocols`/`perform_assignment`,
//! which carry `protocol_name`/`protocol_metadata`/`member_metadata` as
//! opaque bytes serialized by a pluggable `Schema`.

use crate::context::RequestContext;
use crate::error::Result;
use crate::protocol::{ApiVersion, ErrorCode, GenerationId, RequestHeader};
use crate::wire::{KafkaReader, KafkaWriter};

#[derive(Clone, Debug, PartialEq)]
pub struct GroupCoordinatorRequest {
    pub header: RequestHeader,
    pub group_id: String,
}

impl GroupCoordinatorRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;
        writer.write_string(Some(&self.group_id));
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupCoordinatorResponse {
    pub correlation_id: i32,
    pub error_code: ErrorCode,
    pub coordinator_id: i32,
    pub host: String,
    pub port: i32,
}

impl GroupCoordinatorResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;

        Ok(GroupCoordinatorResponse {
            correlation_id: header.correlation_id,
            error_code: reader.read_i16()?,
            coordinator_id: reader.read_i32()?,
            host: reader.read_required_string()?,
            port: reader.read_i32()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinGroupRequest {
    pub header: RequestHeader,
    pub group_id: String,
    pub session_timeout: i32,
    pub rebalance_timeout: i32,
    pub member_id: String,
    pub protocol_type: String,
    pub protocols: Vec<JoinGroupProtocol>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinGroupProtocol {
    pub name: String,
    pub metadata: Vec<u8>,
}

impl JoinGroupRequest {
    pub fn encode(&self, writer: &mut KafkaWriter, context: &RequestContext) -> Result<()> {
        self.header.encode(writer)?;

        writer.write_string(Some(&self.group_id));
        writer.write_i32(self.session_timeout);
        if self.header.api_version >= 1 {
            writer.write_i32(self.rebalance_timeout);
        }
        writer.write_string(Some(&self.member_id));
        writer.write_string(Some(&self.protocol_type));

        let encoder = context.encoders().resolve(Some(&self.protocol_type));
        writer.write_array(&self.protocols, |w, protocol| {
            w.write_string(Some(&protocol.name));
            w.mark_length(|w| encoder.encode_metadata(w, &protocol.metadata))
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinGroupResponse {
    pub correlation_id: i32,
    pub error_code: ErrorCode,
    pub generation_id: GenerationId,
    pub group_protocol: String,
    pub leader_id: String,
    pub member_id: String,
    pub members: Vec<JoinGroupMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinGroupMember {
    pub member_id: String,
    pub metadata: Vec<u8>,
}

impl JoinGroupResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion, context: &RequestContext) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        let error_code = reader.read_i16()?;
        let generation_id = reader.read_i32()?;
        let group_protocol = reader.read_required_string()?;
        let leader_id = reader.read_required_string()?;
        let member_id = reader.read_required_string()?;

        let encoder = context.encoders().resolve(context.protocol_type.as_deref());
        let members = reader.read_array(|r| {
            let member_id = r.read_required_string()?;
            let metadata = encoder.decode_metadata(&group_protocol, r)?.to_vec();
            Ok(JoinGroupMember { member_id, metadata })
        })?;

        Ok(JoinGroupResponse {
            correlation_id: header.correlation_id,
            error_code,
            generation_id,
            group_protocol,
            leader_id,
            member_id,
            members,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyncGroupRequest {
    pub header: RequestHeader,
    pub group_id: String,
    pub generation_id: GenerationId,
    pub member_id: String,
    pub protocol_type: Option<String>,
    pub group_assignment: Vec<SyncGroupAssignment>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyncGroupAssignment {
    pub member_id: String,
    pub assignment: Vec<u8>,
}

impl SyncGroupRequest {
    pub fn encode(&self, writer: &mut KafkaWriter, context: &RequestContext) -> Result<()> {
        self.header.encode(writer)?;

        writer.write_string(Some(&self.group_id));
        writer.write_i32(self.generation_id);
        writer.write_string(Some(&self.member_id));

        let encoder = context.encoders().resolve(self.protocol_type.as_deref());
        writer.write_array(&self.group_assignment, |w, assignment| {
            w.write_string(Some(&assignment.member_id));
            w.mark_length(|w| encoder.encode_assignment(w, &assignment.assignment))
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyncGroupResponse {
    pub correlation_id: i32,
    pub error_code: ErrorCode,
    pub assignment: Vec<u8>,
}

impl SyncGroupResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion, context: &RequestContext) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        let error_code = reader.read_i16()?;

        let encoder = context.encoders().resolve(context.protocol_type.as_deref());
        let assignment = encoder.decode_assignment(reader)?.to_vec();

        Ok(SyncGroupResponse { correlation_id: header.correlation_id, error_code, assignment })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeartbeatRequest {
    pub header: RequestHeader,
    pub group_id: String,
    pub generation_id: GenerationId,
    pub member_id: String,
}

impl HeartbeatRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;
        writer.write_string(Some(&self.group_id));
        writer.write_i32(self.generation_id);
        writer.write_string(Some(&self.member_id));
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeartbeatResponse {
    pub correlation_id: i32,
    pub error_code: ErrorCode,
}

impl HeartbeatResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        Ok(HeartbeatResponse { correlation_id: header.correlation_id, error_code: reader.read_i16()? })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeaveGroupRequest {
    pub header: RequestHeader,
    pub group_id: String,
    pub member_id: String,
}

impl LeaveGroupRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;
        writer.write_string(Some(&self.group_id));
        writer.write_string(Some(&self.member_id));
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeaveGroupResponse {
    pub correlation_id: i32,
    pub error_code: ErrorCode,
}

impl LeaveGroupResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        Ok(LeaveGroupResponse { correlation_id: header.correlation_id, error_code: reader.read_i16()? })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListGroupsRequest {
    pub header: RequestHeader,
}

impl ListGroupsRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListGroupsResponse {
    pub correlation_id: i32,
    pub error_code: ErrorCode,
    pub groups: Vec<GroupListing>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupListing {
    pub group_id: String,
    pub protocol_type: String,
}

impl ListGroupsResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        let error_code = reader.read_i16()?;
        let groups = reader.read_array(|r| {
            Ok(GroupListing { group_id: r.read_required_string()?, protocol_type: r.read_required_string()? })
        })?;

        Ok(ListGroupsResponse { correlation_id: header.correlation_id, error_code, groups })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DescribeGroupsRequest {
    pub header: RequestHeader,
    pub groups: Vec<String>,
}

impl DescribeGroupsRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;
        writer.write_array(&self.groups, |w, group| {
            w.write_string(Some(group));
            Ok(())
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DescribeGroupsResponse {
    pub correlation_id: i32,
    pub groups: Vec<GroupSummary>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupSummary {
    pub error_code: ErrorCode,
    pub group_id: String,
    pub state: String,
    pub protocol_type: String,
    pub protocol: String,
    pub members: Vec<GroupMemberSummary>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupMemberSummary {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    pub member_metadata: Vec<u8>,
    pub member_assignment: Vec<u8>,
}

impl DescribeGroupsResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion, context: &RequestContext) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;

        let groups = reader.read_array(|r| {
            let error_code = r.read_i16()?;
            let group_id = r.read_required_string()?;
            let state = r.read_required_string()?;
            let protocol_type = r.read_required_string()?;
            let protocol = r.read_required_string()?;

            let encoder = context.encoders().resolve(Some(&protocol_type));
            let members = r.read_array(|r| {
                Ok(GroupMemberSummary {
                    member_id: r.read_required_string()?,
                    client_id: r.read_required_string()?,
                    client_host: r.read_required_string()?,
                    member_metadata: encoder.decode_metadata(&protocol, r)?.to_vec(),
                    member_assignment: encoder.decode_assignment(r)?.to_vec(),
                })
            })?;

            Ok(GroupSummary { error_code, group_id, state, protocol_type, protocol, members })
        })?;

        Ok(DescribeGroupsResponse { correlation_id: header.correlation_id, groups })
    }
}
