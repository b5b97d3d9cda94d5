/// Communication layer: network link and broker session seams.
///
/// Platform crates implement `NetworkLink` (Wi-Fi association) and
/// `BrokerSession` (TLS MQTT). The core only drives them; it never sees
/// sockets, certificates on the wire, or the MQTT packet format.
use crate::config::{BrokerConfig, NetworkConfig};
use crate::identity::{DeviceId, SessionCredential};
use crate::protocol::Topics;

/// Network link (Wi-Fi station).
pub trait NetworkLink {
    /// Error type for link operations
    type Error: core::fmt::Debug;

    /// Link status check.
    fn is_up(&self) -> bool;

    /// Associate with the configured network. Blocking, single attempt.
    fn associate(&mut self, config: &NetworkConfig) -> Result<(), Self::Error>;
}

/// A message received on a subscribed topic.
#[derive(Debug, Clone, Copy)]
pub struct InboundMessage<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
}

/// Authenticated publish/subscribe session with the broker.
pub trait BrokerSession {
    /// Error type for session operations
    type Error: core::fmt::Debug;

    /// Session liveness check.
    fn is_connected(&self) -> bool;

    /// Open a session. Blocking, single attempt.
    fn connect(
        &mut self,
        broker: &BrokerConfig,
        client_id: &DeviceId,
        credential: &SessionCredential,
    ) -> Result<(), Self::Error>;

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Deliver pending inbound messages to `on_message`, keep the session
    /// alive, and return how many were delivered. Non-blocking.
    fn poll(&mut self, on_message: &mut dyn FnMut(InboundMessage<'_>)) -> Result<usize, Self::Error>;
}

/// Which control topic an inbound message arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    /// Answer to the resync request
    GetAccepted,
    /// Echo of a state update
    Update,
    Unknown,
}

impl InboundKind {
    pub fn classify(topics: &Topics, topic: &str) -> Self {
        if topic == topics.get_accepted.as_str() {
            InboundKind::GetAccepted
        } else if topic == topics.update.as_str() {
            InboundKind::Update
        } else {
            InboundKind::Unknown
        }
    }
}

/// Log an inbound control message. Contents are observed only; nothing
/// in the loop branches on them.
pub fn log_inbound(topics: &Topics, msg: &InboundMessage<'_>) -> InboundKind {
    let kind = InboundKind::classify(topics, msg.topic);
    match (kind, core::str::from_utf8(trim_trailing_whitespace(msg.payload))) {
        (InboundKind::Unknown, _) => {
            log::warn!(
                "MQTT: ignoring message on unexpected topic '{}' ({} bytes)",
                msg.topic,
                msg.payload.len()
            );
        }
        (_, Ok(text)) => {
            log::info!(
                "MQTT: received message with topic '{}', length {} bytes:",
                msg.topic,
                msg.payload.len()
            );
            log::info!("{}", text);
        }
        (_, Err(_)) => {
            log::warn!(
                "MQTT: ignoring non-UTF-8 payload on '{}' ({} bytes)",
                msg.topic,
                msg.payload.len()
            );
        }
    }
    kind
}

fn trim_trailing_whitespace(data: &[u8]) -> &[u8] {
    let mut end = data.len();
    while end > 0 && (data[end - 1] == b' ' || data[end - 1] == b'\n' || data[end - 1] == b'\r' || data[end - 1] == b'\t') {
        end -= 1;
    }
    &data[..end]
}
