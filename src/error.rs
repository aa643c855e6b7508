//! Error kinds raised by the codec and the connection multiplexer.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::ApiKey;

/// Various errors reported by a remote Kafka server.
///
/// We use numeric codes to indicate what problem occurred on the server.
/// These can be translated by the client into exceptions or whatever the
/// appropriate error handling mechanism in the client language is.
///
/// See also [Kafka Errors](http://kafka.apache.org/protocol.html)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i16)]
pub enum KafkaCode {
    Unknown = -1,
    None = 0,
    OffsetOutOfRange = 1,
    CorruptMessage = 2,
    UnknownTopicOrPartition = 3,
    InvalidMessageSize = 4,
    LeaderNotAvailable = 5,
    NotLeaderForPartition = 6,
    RequestTimedOut = 7,
    BrokerNotAvailable = 8,
    ReplicaNotAvailable = 9,
    MessageSizeTooLarge = 10,
    StaleControllerEpoch = 11,
    OffsetMetadataTooLarge = 12,
    NetworkException = 13,
    GroupLoadInProgress = 14,
    GroupCoordinatorNotAvailable = 15,
    NotCoordinatorForGroup = 16,
    InvalidTopic = 17,
    RecordListTooLarge = 18,
    NotEnoughReplicas = 19,
    NotEnoughReplicasAfterAppend = 20,
    InvalidRequiredAcks = 21,
    IllegalGeneration = 22,
    InconsistentGroupProtocol = 23,
    InvalidGroupId = 24,
    UnknownMemberId = 25,
    InvalidSessionTimeout = 26,
    RebalanceInProgress = 27,
    InvalidCommitOffsetSize = 28,
    TopicAuthorizationFailed = 29,
    GroupAuthorizationFailed = 30,
    ClusterAuthorizationFailed = 31,
    InvalidTimestamp = 32,
    UnsupportedSaslMechanism = 33,
    IllegalSaslState = 34,
    UnsupportedVersion = 35,
    TopicAlreadyExists = 36,
    InvalidPartitions = 37,
    InvalidReplicationFactor = 38,
    InvalidReplicaAssignment = 39,
    InvalidConfig = 40,
    NotController = 41,
    InvalidRequest = 42,
    UnsupportedForMessageFormat = 43,
    PolicyViolation = 44,
}

impl From<i16> for KafkaCode {
    fn from(v: i16) -> Self {
        match v {
            -1 => KafkaCode::Unknown,
            0 => KafkaCode::None,
            1 => KafkaCode::OffsetOutOfRange,
            2 => KafkaCode::CorruptMessage,
            3 => KafkaCode::UnknownTopicOrPartition,
            4 => KafkaCode::InvalidMessageSize,
            5 => KafkaCode::LeaderNotAvailable,
            6 => KafkaCode::NotLeaderForPartition,
            7 => KafkaCode::RequestTimedOut,
            8 => KafkaCode::BrokerNotAvailable,
            9 => KafkaCode::ReplicaNotAvailable,
            10 => KafkaCode::MessageSizeTooLarge,
            11 => KafkaCode::StaleControllerEpoch,
            12 => KafkaCode::OffsetMetadataTooLarge,
            13 => KafkaCode::NetworkException,
            14 => KafkaCode::GroupLoadInProgress,
            15 => KafkaCode::GroupCoordinatorNotAvailable,
            16 => KafkaCode::NotCoordinatorForGroup,
            17 => KafkaCode::InvalidTopic,
            18 => KafkaCode::RecordListTooLarge,
            19 => KafkaCode::NotEnoughReplicas,
            20 => KafkaCode::NotEnoughReplicasAfterAppend,
            21 => KafkaCode::InvalidRequiredAcks,
            22 => KafkaCode::IllegalGeneration,
            23 => KafkaCode::InconsistentGroupProtocol,
            24 => KafkaCode::InvalidGroupId,
            25 => KafkaCode::UnknownMemberId,
            26 => KafkaCode::InvalidSessionTimeout,
            27 => KafkaCode::RebalanceInProgress,
            28 => KafkaCode::InvalidCommitOffsetSize,
            29 => KafkaCode::TopicAuthorizationFailed,
            30 => KafkaCode::GroupAuthorizationFailed,
            31 => KafkaCode::ClusterAuthorizationFailed,
            32 => KafkaCode::InvalidTimestamp,
            33 => KafkaCode::UnsupportedSaslMechanism,
            34 => KafkaCode::IllegalSaslState,
            35 => KafkaCode::UnsupportedVersion,
            36 => KafkaCode::TopicAlreadyExists,
            37 => KafkaCode::InvalidPartitions,
            38 => KafkaCode::InvalidReplicationFactor,
            39 => KafkaCode::InvalidReplicaAssignment,
            40 => KafkaCode::InvalidConfig,
            41 => KafkaCode::NotController,
            42 => KafkaCode::InvalidRequest,
            43 => KafkaCode::UnsupportedForMessageFormat,
            44 => KafkaCode::PolicyViolation,
            _ => KafkaCode::Unknown,
        }
    }
}

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("buffer underrun")]
    BufferUnderRun,

    #[error("crc mismatch")]
    CrcMismatch,

    #[error("unsupported compression codec: {0}")]
    UnsupportedCodec(i8),

    #[error("unsupported API version {version} for {api_key:?}")]
    UnsupportedApiVersion { api_key: ApiKey, version: i16 },

    #[error("connection to {0} failed")]
    ConnectionFailed(String),

    #[error("server disconnected")]
    ServerDisconnected,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request canceled")]
    Canceled,

    #[error("connection disposed")]
    Disposed,

    #[error("kafka error: {0:?}")]
    KafkaError(KafkaCode),

    #[error("unexpected response for api key {0:?}")]
    UnexpectedResponse(ApiKey),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid utf-8 string in wire payload")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
