//! TLS MQTT session over the ESP-IDF MQTT client.
//!
//! The client's event callback runs on the ESP-IDF MQTT task. It mirrors
//! session liveness into an `AtomicBool` and hands received messages to
//! the control loop through a bounded channel, drained by `poll`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use beacon_shadow::comm::{BrokerSession, InboundMessage};
use beacon_shadow::config::BrokerConfig;
use beacon_shadow::identity::{DeviceId, PrivateKey, SessionCredential};
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::sys::EspError;
use esp_idf_svc::tls::X509;

/// How long `connect` waits for the broker's CONNACK.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Inbound messages buffered between two polls.
const INBOUND_QUEUE_LEN: usize = 8;

#[derive(Debug)]
pub enum SessionError {
    NotConnected,
    Timeout,
    /// Credential PEM is not NUL-terminated
    Credential,
    Esp(EspError),
}

impl From<EspError> for SessionError {
    fn from(e: EspError) -> Self {
        SessionError::Esp(e)
    }
}

type Inbound = (String, Vec<u8>);

pub struct MqttSession {
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
    inbound: Option<Receiver<Inbound>>,
    /// Optional broker CA (NUL-terminated PEM). Falls back to the
    /// ESP-IDF certificate bundle.
    root_ca: Option<&'static str>,
}

impl MqttSession {
    pub fn new(root_ca: Option<&'static str>) -> Self {
        Self {
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
            inbound: None,
            root_ca,
        }
    }

    fn client(&mut self) -> Result<&mut EspMqttClient<'static>, SessionError> {
        self.client.as_mut().ok_or(SessionError::NotConnected)
    }
}

fn pem(text: &'static str) -> Result<X509<'static>, SessionError> {
    if !text.ends_with('\0') {
        return Err(SessionError::Credential);
    }
    Ok(X509::pem_until_nul(text.as_bytes()))
}

impl BrokerSession for MqttSession {
    type Error = SessionError;

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Relaxed)
    }

    fn connect(
        &mut self,
        broker: &BrokerConfig,
        client_id: &DeviceId,
        credential: &SessionCredential,
    ) -> Result<(), SessionError> {
        // Tear down any previous client before opening a new one.
        self.client = None;
        self.inbound = None;
        self.connected.store(false, Ordering::Relaxed);

        let private_key = match credential.private_key {
            PrivateKey::Pem(key) => Some(pem(key)?),
            PrivateKey::SecureElement => {
                log::info!("MQTT: signing with the secure element");
                None
            }
        };
        let conf = MqttClientConfiguration {
            client_id: Some(client_id.as_str()),
            keep_alive_interval: Some(KEEP_ALIVE),
            // Every session is opened by the supervisor so that it is
            // followed by the control subscriptions and a resync request.
            disable_auto_reconnect: true,
            client_certificate: Some(pem(credential.certificate)?),
            private_key,
            // Requires CONFIG_ESP_TLS_USE_SECURE_ELEMENT (sdkconfig.defaults).
            use_secure_element: credential.uses_secure_element(),
            server_certificate: self.root_ca.map(pem).transpose()?,
            crt_bundle_attach: if self.root_ca.is_none() {
                Some(esp_idf_svc::sys::esp_crt_bundle_attach)
            } else {
                None
            },
            ..Default::default()
        };

        let url = format!("mqtts://{}:{}", broker.endpoint, broker.port);
        let (tx, rx) = mpsc::sync_channel::<Inbound>(INBOUND_QUEUE_LEN);
        let connected = self.connected.clone();

        let client = EspMqttClient::new_cb(&url, &conf, move |event| {
            on_event(event.payload(), &connected, &tx);
        })?;
        self.client = Some(client);
        self.inbound = Some(rx);

        let started = Instant::now();
        while !self.connected.load(Ordering::Relaxed) {
            if started.elapsed() > CONNECT_TIMEOUT {
                self.client = None;
                self.inbound = None;
                return Err(SessionError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        self.client()?.subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(SessionError::NotConnected);
        }
        self.client()?.publish(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }

    fn poll(&mut self, on_message: &mut dyn FnMut(InboundMessage<'_>)) -> Result<usize, SessionError> {
        let Some(rx) = self.inbound.as_ref() else {
            return Err(SessionError::NotConnected);
        };

        let mut count = 0;
        while let Ok((topic, payload)) = rx.try_recv() {
            on_message(InboundMessage {
                topic: &topic,
                payload: &payload,
            });
            count += 1;
        }
        Ok(count)
    }
}

fn on_event(payload: EventPayload<'_, EspError>, connected: &AtomicBool, tx: &SyncSender<Inbound>) {
    match payload {
        EventPayload::Connected(_) => {
            log::info!("MQTT: connected to broker");
            connected.store(true, Ordering::Relaxed);
        }
        EventPayload::Disconnected => {
            log::warn!("MQTT: disconnected from broker");
            connected.store(false, Ordering::Relaxed);
        }
        EventPayload::Received { topic, data, .. } => {
            let Some(topic) = topic else {
                // Continuation chunk of a fragmented message.
                return;
            };
            match tx.try_send((topic.to_owned(), data.to_vec())) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("MQTT: inbound queue full, dropped message on {}", topic)
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
        EventPayload::Error(e) => log::warn!("MQTT: client error: {:?}", e),
        _ => {}
    }
}
