//! Connectivity supervisor: network link and broker session state machine.
//!
//! ```text
//!   NetworkDown ──associate──▶ NetworkUpSessionDown ──connect+subscribe──▶ Ready
//!        ▲                           ▲      │                               │
//!        └──────── link lost ────────┴──────┘◀────── session lost ──────────┘
//! ```
//!
//! Every call re-derives the current state from the link and session
//! liveness checks, then advances from wherever that leaves it. Failed
//! attempts wait a fixed backoff and retry. The only exit other than
//! `Ready` is a fatal identity failure, or a caller-supplied deadline with
//! [`Supervisor::ensure_ready_until`].

use crate::clock::Clock;
use crate::comm::{log_inbound, BrokerSession, NetworkLink};
use crate::config::{AgentConfig, BrokerConfig, NetworkConfig};
use crate::error::{IdentityError, ReadyError};
use crate::identity::{DeviceId, IdentityProvider};
use crate::protocol::Topics;
use crate::shadow::ReportSink;

/// Link/session state. Owned by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NetworkDown,
    NetworkUpSessionDown,
    Ready,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::NetworkDown => "network_down",
            ConnectionState::NetworkUpSessionDown => "session_down",
            ConnectionState::Ready => "ready",
        }
    }
}

pub struct Supervisor<L, S> {
    link: L,
    session: S,
    network: NetworkConfig,
    broker: BrokerConfig,
    device_id: DeviceId,
    topics: Topics,
    backoff_ms: u32,
    state: ConnectionState,
}

impl<L: NetworkLink, S: BrokerSession> Supervisor<L, S> {
    pub fn new(link: L, session: S, config: &AgentConfig, device_id: DeviceId) -> Self {
        let topics = config.broker.topics.topics(&device_id);
        Self {
            link,
            session,
            network: config.network,
            broker: config.broker,
            device_id,
            topics,
            backoff_ms: config.retry_backoff_ms,
            state: ConnectionState::NetworkDown,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Block until link and session are both up. Retries indefinitely;
    /// returns `Err` only when the identity provider fails.
    pub fn ensure_ready<C, I>(&mut self, clock: &mut C, identity: &mut I) -> Result<(), IdentityError>
    where
        C: Clock,
        I: IdentityProvider,
    {
        loop {
            match self.ensure_ready_until(clock, identity, u64::MAX) {
                Ok(()) => return Ok(()),
                Err(ReadyError::Fatal(e)) => return Err(e),
                Err(ReadyError::StillDown(_)) => {}
            }
        }
    }

    /// Like [`ensure_ready`](Self::ensure_ready), but gives up with
    /// `StillDown` instead of starting a backoff that would end past
    /// `deadline_ms` (uptime).
    pub fn ensure_ready_until<C, I>(
        &mut self,
        clock: &mut C,
        identity: &mut I,
        deadline_ms: u64,
    ) -> Result<(), ReadyError>
    where
        C: Clock,
        I: IdentityProvider,
    {
        loop {
            if self.attempt(identity)? == ConnectionState::Ready {
                return Ok(());
            }

            let resume_at = clock.uptime_ms().saturating_add(u64::from(self.backoff_ms));
            if resume_at > deadline_ms {
                return Err(ReadyError::StillDown(self.state));
            }

            log::warn!(
                "NET: {}, retrying in {} ms",
                self.state.as_str(),
                self.backoff_ms
            );
            clock.delay_ms(self.backoff_ms);
        }
    }

    /// Drain inbound control messages. Only logged; returns how many.
    pub fn poll_inbound(&mut self) -> usize {
        if self.state != ConnectionState::Ready {
            return 0;
        }

        log::debug!("MQTT: polling for incoming messages ...");
        let topics = &self.topics;
        match self.session.poll(&mut |msg| {
            log_inbound(topics, &msg);
        }) {
            Ok(count) => count,
            Err(e) => {
                log::warn!("MQTT: poll failed: {:?}", e);
                0
            }
        }
    }

    /// Publish on the live session. A failed publish drops the state back
    /// to `NetworkUpSessionDown` until the next liveness check.
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), S::Error> {
        if !self.session.is_connected() {
            log::warn!("MQTT: WARNING - connection lost before publish");
        }
        let result = self.session.publish(topic, payload);
        if result.is_err() && self.state == ConnectionState::Ready {
            self.transition(ConnectionState::NetworkUpSessionDown);
        }
        result
    }

    /// One pass through the state machine, no waiting.
    fn attempt<I: IdentityProvider>(&mut self, identity: &mut I) -> Result<ConnectionState, ReadyError> {
        self.refresh();

        if self.state == ConnectionState::NetworkDown {
            log::info!("WiFi: attempting to connect to SSID: {}", self.network.ssid);
            match self.link.associate(&self.network) {
                Ok(()) => {
                    log::info!("WiFi: successfully connected to network {}", self.network.ssid);
                    self.transition(ConnectionState::NetworkUpSessionDown);
                }
                Err(e) => {
                    log::warn!("WiFi: failed to connect: {:?}", e);
                    return Ok(self.state);
                }
            }
        }

        if self.state == ConnectionState::NetworkUpSessionDown {
            let credential = identity.session_credential()?;
            log::info!(
                "MQTT: attempting to connect to broker at mqtts://{}:{}",
                self.broker.endpoint,
                self.broker.port
            );
            match self.session.connect(&self.broker, &self.device_id, &credential) {
                Ok(()) => {
                    log::info!("MQTT: connected as {}", self.device_id);
                    self.on_session_established();
                    self.transition(ConnectionState::Ready);
                }
                Err(e) => {
                    log::warn!("MQTT: failed to connect: {:?}", e);
                }
            }
        }

        Ok(self.state)
    }

    /// Re-derive the state from the liveness checks.
    fn refresh(&mut self) {
        let observed = if !self.link.is_up() {
            ConnectionState::NetworkDown
        } else if !self.session.is_connected() {
            ConnectionState::NetworkUpSessionDown
        } else {
            ConnectionState::Ready
        };

        if observed != self.state {
            match observed {
                ConnectionState::NetworkDown => log::warn!("WiFi: link lost"),
                ConnectionState::NetworkUpSessionDown => log::warn!("MQTT: session lost"),
                ConnectionState::Ready => {}
            }
            self.transition(observed);
        }
    }

    /// Control topic subscriptions and the resync request. Failures are
    /// logged and do not undo the session.
    fn on_session_established(&mut self) {
        for topic in self.topics.subscriptions() {
            log::info!("MQTT: subscribe to {}", topic);
            match self.session.subscribe(topic) {
                Ok(()) => log::info!("MQTT: subscribed to {}", topic),
                Err(e) => log::warn!("MQTT: WARNING - subscription to {} failed: {:?}", topic, e),
            }
        }

        log::info!("MQTT: requesting current state on {}", self.topics.get);
        if let Err(e) = self.session.publish(&self.topics.get, &[]) {
            log::warn!("MQTT: resync request failed: {:?}", e);
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if next != self.state {
            log::info!("NET: {} -> {}", self.state.as_str(), next.as_str());
            self.state = next;
        }
    }
}

impl<L: NetworkLink, S: BrokerSession> ReportSink for Supervisor<L, S> {
    type Error = S::Error;

    fn send_report(&mut self, payload: &[u8]) -> Result<(), Self::Error> {
        let topic = self.topics.update.clone();
        log::info!("MQTT: publishing message to '{}'", topic);
        self.publish(&topic, payload)
    }
}
