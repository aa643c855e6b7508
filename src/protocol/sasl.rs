//! `SaslHandshake` request/response (api key 17). Framing mechanics only;
//! the actual SASL exchange bytes are an external collaborator (spec.md §1
//! Non-goals).

use crate::error::Result;
use crate::protocol::{ApiVersion, ErrorCode, RequestHeader};
use crate::wire::{KafkaReader, KafkaWriter};

#[derive(Clone, Debug, PartialEq)]
pub struct SaslHandshakeRequest {
    pub header: RequestHeader,
    pub mechanism: String,
}

impl SaslHandshakeRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)?;
        writer.write_string(Some(&self.mechanism));
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaslHandshakeResponse {
    pub correlation_id: i32,
    pub error_code: ErrorCode,
    pub enabled_mechanisms: Vec<String>,
}

impl SaslHandshakeResponse {
    pub fn decode(reader: &mut KafkaReader, _api_version: ApiVersion) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        let error_code = reader.read_i16()?;
        let enabled_mechanisms = reader.read_array(|r| r.read_required_string())?;

        Ok(SaslHandshakeResponse { correlation_id: header.correlation_id, error_code, enabled_mechanisms })
    }
}
