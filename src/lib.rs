//! Wire-protocol codec and per-broker connection multiplexer for a native
//! Kafka client: the request/response machinery on top of which producer,
//! consumer, and admin facades are built.

#![allow(dead_code)]

pub mod compression;
pub mod connection;
pub mod context;
pub mod error;
pub mod membership;
pub mod protocol;
pub mod retry;
mod wire;

pub use compression::Compression;
pub use connection::{Connection, ConnectionConfig};
pub use context::RequestContext;
pub use error::{Error, KafkaCode, Result};
pub use membership::{MembershipEncoder, MembershipRegistry};
pub use protocol::{
    ApiKey, ApiVersion, CorrelationId, ErrorCode, FetchOffset, GenerationId, Offset, PartitionId,
    Request, RequiredAcks, Response, ThrottleTime,
};
pub use retry::RetryPolicy;
pub use wire::{KafkaReader, KafkaWriter};
