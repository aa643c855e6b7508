//! `ApiVersions` request/response (api key 18).
//!
//! Directly grounded on the teacher's `protocol::api_versions` module,
//! including its literal byte-fixture test, re-expressed on
//! `KafkaWriter`/`KafkaReader` instead of `bytes::BufMut`/`nom`.

use crate::error::Result;
use crate::protocol::{ApiKey, ApiVersion, ErrorCode, RequestHeader};
use crate::wire::{KafkaReader, KafkaWriter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiVersionsRequest {
    pub header: RequestHeader,
}

impl ApiVersionsRequest {
    pub fn encode(&self, writer: &mut KafkaWriter) -> Result<()> {
        self.header.encode(writer)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiVersionsResponse {
    pub correlation_id: i32,
    pub error_code: ErrorCode,
    pub api_versions: Vec<SupportedApiVersion>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupportedApiVersion {
    pub api_key: i16,
    pub min_version: ApiVersion,
    pub max_version: ApiVersion,
}

impl ApiVersionsResponse {
    pub fn decode(reader: &mut KafkaReader) -> Result<Self> {
        let header = crate::protocol::parse_response_header(reader)?;
        let error_code = reader.read_i16()?;
        let api_versions = reader.read_array(|r| {
            Ok(SupportedApiVersion {
                api_key: r.read_i16()?,
                min_version: r.read_i16()?,
                max_version: r.read_i16()?,
            })
        })?;

        Ok(ApiVersionsResponse { correlation_id: header.correlation_id, error_code, api_versions })
    }

    pub fn supports(&self, api_key: ApiKey, version: ApiVersion) -> bool {
        self.api_versions
            .iter()
            .any(|v| v.api_key == api_key.wire_value() && v.min_version <= version && version <= v.max_version)
    }
}

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;

    lazy_static! {
        static ref TEST_REQUEST_DATA: Vec<u8> = vec![
            0, 18, // api_key
            0, 0, // api_version
            7, 91, 205, 21, // correlation_id = 123456789
            0, 4, b't', b'e', b's', b't', // client_id
        ];
    }

    #[test]
    fn encode_matches_repo_header_fixture() {
        let req = ApiVersionsRequest {
            header: RequestHeader {
                api_key: ApiKey::ApiVersions,
                api_version: 0,
                correlation_id: 123456789,
                client_id: Some("test".into()),
            },
        };

        let mut writer = KafkaWriter::new();
        req.encode(&mut writer).unwrap();

        assert_eq!(writer.as_slice(), &TEST_REQUEST_DATA[..]);
    }

    #[test]
    fn decodes_response_api_versions() {
        let bytes: &[u8] = &[
            0, 0, 0, 123, // correlation_id
            0, 0, // error_code
            0, 0, 0, 1, // api_versions count
            0, 1, 0, 2, 0, 3, // api_key, min, max
        ];

        let mut reader = KafkaReader::new(bytes::Bytes::from_static(bytes));
        let response = ApiVersionsResponse::decode(&mut reader).unwrap();

        assert_eq!(response.correlation_id, 123);
        assert_eq!(response.error_code, 0);
        assert_eq!(
            response.api_versions,
            vec![SupportedApiVersion { api_key: 1, min_version: 2, max_version: 3 }]
        );
    }
}
