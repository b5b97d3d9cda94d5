//! The agent context and its control loop.
//!
//! One `Agent` owns every collaborator and all mutable state. Each tick:
//!
//! 1. ensure the link and session are up (blocks with backoff),
//! 2. drain inbound control messages,
//! 3. run one scan pass and filter it,
//! 4. merge the admitted records into the open document,
//! 5. publish if due.

use crate::clock::Clock;
use crate::comm::{BrokerSession, NetworkLink};
use crate::config::AgentConfig;
use crate::connectivity::{ConnectionState, Supervisor};
use crate::defaults::HALT_REPORT_INTERVAL_MS;
use crate::error::AgentError;
use crate::filter::filter_pass;
use crate::identity::{DeviceId, IdentityProvider};
use crate::scanner::{RadioScanner, ScanPass};
use crate::shadow::{PublishOutcome, ShadowSync};

/// Summary of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Inbound control messages drained
    pub inbound: usize,
    /// Peers seen by the scan pass
    pub observed: usize,
    /// Records admitted by the filter
    pub admitted: usize,
    pub publish: PublishOutcome,
}

pub struct Agent<L, S, R, I, C> {
    config: AgentConfig,
    supervisor: Supervisor<L, S>,
    scanner: R,
    identity: I,
    clock: C,
    shadow: ShadowSync,
    pass: ScanPass,
}

impl<L, S, R, I, C> Agent<L, S, R, I, C>
where
    L: NetworkLink,
    S: BrokerSession,
    R: RadioScanner,
    I: IdentityProvider,
    C: Clock,
{
    /// Validate the configuration, resolve the device identity and
    /// configure the radio.
    pub fn start(
        config: AgentConfig,
        link: L,
        session: S,
        mut scanner: R,
        mut identity: I,
        clock: C,
    ) -> Result<Self, AgentError> {
        config.validate()?;

        let device_id = identity.device_id()?;
        log::info!("APP: device id {}", device_id);

        log::info!(
            "BLE: scan interval {} ms, window {} ms, duration {} s, active {}",
            config.scan.interval_ms,
            config.scan.window_ms,
            config.scan.duration_secs,
            config.scan.active
        );
        if let Err(e) = scanner.configure(&config.scan) {
            log::warn!("BLE: failed to apply scan settings: {:?}", e);
        }

        let supervisor = Supervisor::new(link, session, &config, device_id);
        let shadow = ShadowSync::new(&config.scan, config.publish_interval_ms);

        Ok(Self {
            config,
            supervisor,
            scanner,
            identity,
            clock,
            shadow,
            pass: ScanPass::new(),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn device_id(&self) -> &DeviceId {
        self.supervisor.device_id()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn shadow(&self) -> &ShadowSync {
        &self.shadow
    }

    /// One loop iteration. Only fatal conditions are returned; transient
    /// failures are logged and retried on the next tick.
    pub fn tick(&mut self) -> Result<TickReport, AgentError> {
        self.supervisor
            .ensure_ready(&mut self.clock, &mut self.identity)?;

        let inbound = self.supervisor.poll_inbound();

        log::info!(
            "BLE: scanning for {} second(s) ...",
            self.config.scan.duration_secs
        );
        if let Err(e) = self
            .scanner
            .scan_once(self.config.scan.duration_secs, &mut self.pass)
        {
            log::warn!("BLE: scan failed: {:?}", e);
            self.pass.clear();
        }

        let detections = filter_pass(&self.pass, &self.config.scan, self.clock.epoch_secs());
        self.shadow.accumulate(&detections);

        let publish = self
            .shadow
            .publish_if_due(self.clock.uptime_ms(), &mut self.supervisor);

        Ok(TickReport {
            inbound,
            observed: self.pass.len(),
            admitted: detections.len(),
            publish,
        })
    }

    /// Run forever. A fatal error halts scanning and publishing; the error
    /// is then reported periodically.
    pub fn run(mut self) -> ! {
        log::info!("APP: entering main loop");
        loop {
            if let Err(e) = self.tick() {
                self.halt(e);
            }
        }
    }

    fn halt(mut self, error: AgentError) -> ! {
        loop {
            log::error!("APP: halted: {}", error);
            self.clock.delay_ms(HALT_REPORT_INTERVAL_MS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, IdentityError};
    use crate::protocol::StateDocument;
    use crate::testutil::{
        agent_config, peer, MockClock, MockIdentity, MockLink, MockScanner, MockSession,
    };

    struct Rig {
        session: MockSession,
        scanner: MockScanner,
        clock: MockClock,
    }

    type TestAgent = Agent<MockLink, MockSession, MockScanner, MockIdentity, MockClock>;

    fn start(identity: MockIdentity) -> (Result<TestAgent, AgentError>, Rig) {
        let rig = Rig {
            session: MockSession::default(),
            scanner: MockScanner::default(),
            clock: MockClock::default(),
        };
        let agent = Agent::start(
            agent_config(),
            MockLink::default(),
            rig.session.clone(),
            rig.scanner.clone(),
            identity,
            rig.clock.clone(),
        );
        (agent, rig)
    }

    fn reports(session: &MockSession) -> Vec<StateDocument> {
        session
            .published()
            .iter()
            .filter(|(topic, _)| topic.ends_with("/state/update"))
            .map(|(_, payload)| StateDocument::parse(payload).unwrap())
            .collect()
    }

    #[test]
    fn start_configures_scanner_and_resolves_identity() {
        let (agent, rig) = start(MockIdentity::ok());
        let agent = agent.unwrap();

        assert_eq!(agent.device_id().as_str(), "0123ee");
        assert_eq!(agent.connection_state(), ConnectionState::NetworkDown);
        assert_eq!(rig.scanner.configured(), vec![agent.config().scan.clone()]);
    }

    #[test]
    fn start_rejects_invalid_config() {
        let mut config = agent_config();
        config.scan.window_ms = 500;
        let result: Result<TestAgent, _> = Agent::start(
            config,
            MockLink::default(),
            MockSession::default(),
            MockScanner::default(),
            MockIdentity::ok(),
            MockClock::default(),
        );
        assert!(matches!(
            result,
            Err(AgentError::Config(ConfigError::WindowExceedsInterval { .. }))
        ));
    }

    #[test]
    fn start_fails_without_identity() {
        let (agent, _rig) = start(MockIdentity::unavailable());
        assert!(matches!(
            agent,
            Err(AgentError::Identity(IdentityError::Unavailable))
        ));
    }

    #[test]
    fn tick_publishes_admitted_beacons() {
        let (agent, rig) = start(MockIdentity::ok());
        let mut agent = agent.unwrap();
        rig.clock.set_epoch(1_700_000_000);
        rig.scanner.queue_pass(vec![
            peer(0xA, "RHS-1", -40),
            peer(0xB, "XYZ", -30),
            peer(0xC, "RHS-2", -70),
        ]);

        let report = agent.tick().unwrap();

        assert_eq!(report.observed, 3);
        assert_eq!(report.admitted, 1);
        assert!(matches!(report.publish, PublishOutcome::Published { .. }));
        assert_eq!(agent.connection_state(), ConnectionState::Ready);

        let sent = reports(&rig.session);
        assert_eq!(sent.len(), 1);
        let detections = sent[0].detections();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].device_id, peer(0xA, "", 0).device_id());
        assert_eq!(detections[0].signal_strength, -40);
        assert_eq!(detections[0].observed_at, 1_700_000_000);
        assert!(agent.shadow().document().detections().is_empty());
    }

    #[test]
    fn quiet_ticks_send_heartbeat_after_interval() {
        let (agent, rig) = start(MockIdentity::ok());
        let mut agent = agent.unwrap();

        assert_eq!(agent.tick().unwrap().publish, PublishOutcome::NotDue);
        rig.clock.advance(10_000);
        assert_eq!(agent.tick().unwrap().publish, PublishOutcome::NotDue);
        rig.clock.advance(1);
        assert!(matches!(
            agent.tick().unwrap().publish,
            PublishOutcome::Published { .. }
        ));

        let sent = reports(&rig.session);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].detections().is_empty());
        assert_eq!(sent[0].config_snapshot().name_prefix.as_str(), "RHS");
    }

    #[test]
    fn scan_failure_is_not_fatal() {
        let (agent, rig) = start(MockIdentity::ok());
        let mut agent = agent.unwrap();
        rig.scanner.queue_failure();
        rig.scanner.queue_pass(vec![peer(0xA, "RHS-1", -40)]);

        let first = agent.tick().unwrap();
        assert_eq!(first.observed, 0);
        assert_eq!(first.publish, PublishOutcome::NotDue);

        let second = agent.tick().unwrap();
        assert_eq!(second.admitted, 1);
        assert_eq!(rig.scanner.scans(), 2);
    }

    #[test]
    fn session_loss_is_repaired_before_scanning() {
        let (agent, rig) = start(MockIdentity::ok());
        let mut agent = agent.unwrap();
        agent.tick().unwrap();

        rig.session.drop_connection();
        rig.scanner.queue_pass(vec![peer(0xA, "RHS-1", -40)]);
        // Session is re-established at the top of the tick.
        let report = agent.tick().unwrap();
        assert!(matches!(report.publish, PublishOutcome::Published { .. }));
        assert_eq!(rig.session.connects(), 2);
    }

    #[test]
    fn inbound_messages_are_drained_each_tick() {
        let (agent, rig) = start(MockIdentity::ok());
        let mut agent = agent.unwrap();
        agent.tick().unwrap();

        rig.session
            .queue_inbound("things/0123ee/state/get/accepted", b"{\"state\":{}}");
        assert_eq!(agent.tick().unwrap().inbound, 1);
        assert_eq!(agent.tick().unwrap().inbound, 0);
    }

    #[test]
    fn missing_credential_is_fatal_on_tick() {
        let (agent, rig) = start(MockIdentity::without_credential());
        let mut agent = agent.unwrap();

        assert_eq!(
            agent.tick(),
            Err(AgentError::Identity(IdentityError::NoCredential))
        );
        assert_eq!(rig.scanner.scans(), 0);
    }
}
