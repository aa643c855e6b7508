//! Request/response framing header.
//!
//! Not present in the retrieved teacher files (`protocol::header` is
//! referenced by the original `protocol/mod.rs` but was filtered out of the
//! retrieval pack); reconstructed here from the standard Kafka wire shape
//! (spec.md §3 "Frame", §6 "Request frame"/"Response frame") in the same
//! style as the teacher's other per-message request/response structs
//! (`protocol::fetch::FetchRequest`, `protocol::api_versions::ApiVersionsRequest`).

use crate::wire::{KafkaReader, KafkaWriter};
use crate::error::Result;
use crate::protocol::{ApiKey, ApiVersion, CorrelationId};

/// `api_key || api_version || correlation_id || client_id`, prepended to
/// every request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHeader {
    pub api_key: ApiKey,
    pub api_version: ApiVersion,
    pub correlation_id: CorrelationId,
    pub client_id: Option<String>,
}

impl RequestHeader {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        writer.write_i16(self.api_key.wire_value());
        writer.write_i16(self.api_version);
        writer.write_i32(self.correlation_id);
        writer.write_string(self.client_id.as_deref());
        Ok(())
    }
}

/// The correlation id every response frame begins with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseHeader {
    pub correlation_id: CorrelationId,
}

pub fn parse_response_header(reader: &mut KafkaReader) -> Result<ResponseHeader> {
    Ok(ResponseHeader { correlation_id: reader.read_i32()? })
}
