//! Shared mocks for the hardware seams.
//!
//! Each mock is a cheap handle over shared state so a test can keep one
//! clone for assertions while the code under test owns the other.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use crate::clock::Clock;
use crate::comm::{BrokerSession, InboundMessage, NetworkLink};
use crate::config::{AgentConfig, BrokerConfig, NetworkConfig, ScanConfig};
use crate::error::IdentityError;
use crate::identity::{DeviceId, IdentityProvider, PrivateKey, SessionCredential};
use crate::scanner::{ObservedPeer, RadioScanner, ScanPass};
use crate::shadow::ReportSink;

/// A peer whose address ends in `last_byte`.
pub fn peer(last_byte: u8, name: &str, rssi: i8) -> ObservedPeer {
    ObservedPeer::new([0xA4, 0xC1, 0x38, 0x00, 0x00, last_byte], name, rssi)
}

pub fn agent_config() -> AgentConfig {
    AgentConfig::new(
        NetworkConfig {
            ssid: "LabNet",
            password: "secret",
        },
        BrokerConfig::new("broker.example.com"),
    )
}

#[derive(Debug)]
pub struct MockError;

// ── Network link ────────────────────────────────────────────────────

#[derive(Default)]
struct LinkState {
    up: bool,
    failures_left: u32,
    associations: u32,
}

#[derive(Clone, Default)]
pub struct MockLink(Rc<RefCell<LinkState>>);

impl MockLink {
    /// The first `n` association attempts fail.
    pub fn failing(n: u32) -> Self {
        let link = Self::default();
        link.0.borrow_mut().failures_left = n;
        link
    }

    pub fn associations(&self) -> u32 {
        self.0.borrow().associations
    }

    pub fn drop_link(&self) {
        self.0.borrow_mut().up = false;
    }
}

impl NetworkLink for MockLink {
    type Error = MockError;

    fn is_up(&self) -> bool {
        self.0.borrow().up
    }

    fn associate(&mut self, _config: &NetworkConfig) -> Result<(), MockError> {
        let mut state = self.0.borrow_mut();
        state.associations += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(MockError);
        }
        state.up = true;
        Ok(())
    }
}

// ── Broker session ──────────────────────────────────────────────────

#[derive(Default)]
struct SessionState {
    connected: bool,
    failures_left: u32,
    fail_subscriptions: bool,
    fail_publishes: bool,
    connects: u32,
    client_ids: Vec<String>,
    subscriptions: Vec<String>,
    published: Vec<(String, Vec<u8>)>,
    inbound: VecDeque<(String, Vec<u8>)>,
    /// Successful calls in order: `connect`, `subscribe <topic>`,
    /// `publish <topic>`.
    calls: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockSession(Rc<RefCell<SessionState>>);

impl MockSession {
    /// The first `n` connect attempts fail.
    pub fn failing(n: u32) -> Self {
        let session = Self::default();
        session.0.borrow_mut().failures_left = n;
        session
    }

    pub fn fail_subscriptions(&self) {
        self.0.borrow_mut().fail_subscriptions = true;
    }

    pub fn fail_publishes(&self) {
        self.0.borrow_mut().fail_publishes = true;
    }

    pub fn drop_connection(&self) {
        self.0.borrow_mut().connected = false;
    }

    pub fn queue_inbound(&self, topic: &str, payload: &[u8]) {
        self.0
            .borrow_mut()
            .inbound
            .push_back((topic.to_string(), payload.to_vec()));
    }

    pub fn connects(&self) -> u32 {
        self.0.borrow().connects
    }

    pub fn client_ids(&self) -> Vec<String> {
        self.0.borrow().client_ids.clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.0.borrow().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.0.borrow().published.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.borrow().calls.clone()
    }
}

impl BrokerSession for MockSession {
    type Error = MockError;

    fn is_connected(&self) -> bool {
        self.0.borrow().connected
    }

    fn connect(
        &mut self,
        _broker: &BrokerConfig,
        client_id: &DeviceId,
        _credential: &SessionCredential,
    ) -> Result<(), MockError> {
        let mut state = self.0.borrow_mut();
        state.connects += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(MockError);
        }
        state.client_ids.push(client_id.as_str().to_string());
        state.calls.push("connect".to_string());
        state.connected = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), MockError> {
        let mut state = self.0.borrow_mut();
        if state.fail_subscriptions {
            return Err(MockError);
        }
        state.subscriptions.push(topic.to_string());
        state.calls.push(format!("subscribe {topic}"));
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MockError> {
        let mut state = self.0.borrow_mut();
        if state.fail_publishes || !state.connected {
            return Err(MockError);
        }
        state.published.push((topic.to_string(), payload.to_vec()));
        state.calls.push(format!("publish {topic}"));
        Ok(())
    }

    fn poll(&mut self, on_message: &mut dyn FnMut(InboundMessage<'_>)) -> Result<usize, MockError> {
        let pending: Vec<_> = self.0.borrow_mut().inbound.drain(..).collect();
        for (topic, payload) in &pending {
            on_message(InboundMessage {
                topic,
                payload,
            });
        }
        Ok(pending.len())
    }
}

// ── Radio scanner ───────────────────────────────────────────────────

#[derive(Default)]
struct ScannerState {
    passes: VecDeque<Result<Vec<ObservedPeer>, MockError>>,
    configured: Vec<ScanConfig>,
    scans: u32,
}

#[derive(Clone, Default)]
pub struct MockScanner(Rc<RefCell<ScannerState>>);

impl MockScanner {
    /// Queue the result of the next pass. An exhausted queue yields empty
    /// passes.
    pub fn queue_pass(&self, peers: Vec<ObservedPeer>) {
        self.0.borrow_mut().passes.push_back(Ok(peers));
    }

    pub fn queue_failure(&self) {
        self.0.borrow_mut().passes.push_back(Err(MockError));
    }

    pub fn configured(&self) -> Vec<ScanConfig> {
        self.0.borrow().configured.clone()
    }

    pub fn scans(&self) -> u32 {
        self.0.borrow().scans
    }
}

impl RadioScanner for MockScanner {
    type Error = MockError;

    fn configure(&mut self, config: &ScanConfig) -> Result<(), MockError> {
        self.0.borrow_mut().configured.push(config.clone());
        Ok(())
    }

    fn scan_once(&mut self, _duration_secs: u16, pass: &mut ScanPass) -> Result<(), MockError> {
        pass.clear();
        let mut state = self.0.borrow_mut();
        state.scans += 1;
        match state.passes.pop_front() {
            Some(Ok(peers)) => {
                for peer in peers {
                    if pass.push(peer).is_err() {
                        break;
                    }
                }
                Ok(())
            }
            Some(Err(e)) => Err(e),
            None => Ok(()),
        }
    }
}

// ── Clock ───────────────────────────────────────────────────────────

/// Starts at uptime 0 with an unsynchronized wall clock. Delays advance
/// uptime instantly.
#[derive(Clone, Default)]
pub struct MockClock {
    uptime_ms: Rc<Cell<u64>>,
    epoch_secs: Rc<Cell<u32>>,
    delays: Rc<RefCell<Vec<u32>>>,
}

impl MockClock {
    pub fn advance(&self, ms: u64) {
        self.uptime_ms.set(self.uptime_ms.get() + ms);
    }

    pub fn set_epoch(&self, secs: u32) {
        self.epoch_secs.set(secs);
    }

    pub fn delays(&self) -> Vec<u32> {
        self.delays.borrow().clone()
    }
}

impl Clock for MockClock {
    fn uptime_ms(&self) -> u64 {
        self.uptime_ms.get()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.borrow_mut().push(ms);
        self.advance(u64::from(ms));
    }

    fn epoch_secs(&self) -> u32 {
        self.epoch_secs.get()
    }
}

// ── Identity ────────────────────────────────────────────────────────

pub struct MockIdentity {
    id: Result<&'static str, IdentityError>,
    credential: Result<SessionCredential, IdentityError>,
}

impl MockIdentity {
    pub fn ok() -> Self {
        Self {
            id: Ok("0123EE"),
            credential: Ok(SessionCredential {
                certificate: "-----BEGIN CERTIFICATE-----",
                private_key: PrivateKey::SecureElement,
            }),
        }
    }

    pub fn without_credential() -> Self {
        Self {
            credential: Err(IdentityError::NoCredential),
            ..Self::ok()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            id: Err(IdentityError::Unavailable),
            ..Self::ok()
        }
    }
}

impl IdentityProvider for MockIdentity {
    fn device_id(&mut self) -> Result<DeviceId, IdentityError> {
        DeviceId::parse(self.id.clone()?)
    }

    fn session_credential(&mut self) -> Result<SessionCredential, IdentityError> {
        self.credential.clone()
    }
}

// ── Report sink ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub reports: Vec<Vec<u8>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            reports: Vec::new(),
            fail: true,
        }
    }
}

impl ReportSink for RecordingSink {
    type Error = MockError;

    fn send_report(&mut self, payload: &[u8]) -> Result<(), MockError> {
        if self.fail {
            return Err(MockError);
        }
        self.reports.push(payload.to_vec());
        Ok(())
    }
}
