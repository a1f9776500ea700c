use async_trait::async_trait;

use crate::notification::Urgency;
use crate::store::Subscription;

/// One notification as handed to the transport: the wire payload is
/// serialized once per fan-out and shared across all recipients.
#[derive(Debug, Clone)]
pub struct PushMessage {
    /// Serialized client payload (encrypted per recipient by the transport)
    pub payload: Vec<u8>,
    /// Push-service TTL header, seconds
    pub ttl: Option<u32>,
    pub urgency: Option<Urgency>,
    pub topic: Option<String>,
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// Retryable failure: network error, throttling, push-service 5xx
    Transient { reason: String },
    /// The push service reported the endpoint permanently gone
    Gone,
}

/// Delivery contract the dispatcher fans out over.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(&self, subscription: &Subscription, message: &PushMessage) -> PushOutcome;
}
