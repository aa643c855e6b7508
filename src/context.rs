//! Request context: the bundle of API version, correlation id, client id,
//! and membership-encoder registry threaded through a single encode/decode
//! call. Grounded in the teacher's `client::client::Inner` (which carries an
//! equivalent `client_id`/`correlation_id` pair across request builds) and
//! generalized per spec.md §4.D into a standalone, cloneable value instead
//! of living inside the client struct.

use std::sync::Arc;

use crate::membership::MembershipRegistry;
use crate::protocol::{ApiVersion, CorrelationId};

/// Telemetry hook invoked exactly once per Produce encode, with the message
/// count, the uncompressed request size, and the size actually placed on
/// the wire after compression.
pub type ProduceTelemetry = Arc<dyn Fn(usize, usize, usize) + Send + Sync>;

/// Immutable bundle shared read-only across a request/response pair.
/// Cloning is cheap: the registry and telemetry sink are reference-counted.
#[derive(Clone)]
pub struct RequestContext {
    pub api_version: Option<ApiVersion>,
    pub correlation_id: CorrelationId,
    pub client_id: Option<Arc<str>>,
    pub protocol_type: Option<Arc<str>>,
    encoders: MembershipRegistry,
    telemetry: Option<ProduceTelemetry>,
}

impl RequestContext {
    pub fn new(client_id: Option<String>) -> Self {
        RequestContext {
            api_version: None,
            correlation_id: 0,
            client_id: client_id.map(Arc::from),
            protocol_type: None,
            encoders: MembershipRegistry::new(),
            telemetry: None,
        }
    }

    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    pub fn with_protocol_type(mut self, protocol_type: impl Into<Arc<str>>) -> Self {
        self.protocol_type = Some(protocol_type.into());
        self
    }

    pub fn with_encoders(mut self, encoders: MembershipRegistry) -> Self {
        self.encoders = encoders;
        self
    }

    pub fn with_telemetry(mut self, telemetry: ProduceTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// A copy of this context with the correlation id replaced, sharing the
    /// registry and telemetry sink.
    pub fn with_correlation(&self, id: CorrelationId) -> Self {
        RequestContext { correlation_id: id, ..self.clone() }
    }

    pub fn encoders(&self) -> &MembershipRegistry {
        &self.encoders
    }

    pub fn on_produce_request_messages(&self, count: usize, request_bytes: usize, compressed_bytes: usize) {
        if let Some(telemetry) = &self.telemetry {
            telemetry(count, request_bytes, compressed_bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn with_correlation_preserves_client_id() {
        let ctx = RequestContext::new(Some("client".into())).with_correlation(42);
        assert_eq!(ctx.correlation_id, 42);
        assert_eq!(ctx.client_id.as_deref(), Some("client"));
    }

    #[test]
    fn telemetry_sink_fires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let ctx = RequestContext::new(None).with_telemetry(Arc::new(move |_, _, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        ctx.on_produce_request_messages(3, 100, 40);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
