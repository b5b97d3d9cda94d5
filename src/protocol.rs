/// Shadow document schema and MQTT topic layout.
///
/// The reported state is a fixed, typed schema serialized with
/// `serde_json_core` into a stack buffer of `MAX_DOCUMENT_LEN` bytes.
/// Uses `heapless` types for no_std/no-alloc operation.
use core::fmt::Write;

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::config::{NamePrefix, ScanConfig};
use crate::defaults::{MAX_DETECTIONS, MAX_DOCUMENT_LEN};
use crate::error::{ConfigError, DocumentError};
use crate::identity::DeviceId;

/// Maximum length for MAC address strings ("aa:bb:cc:dd:ee:ff")
pub type MacString = String<18>;

/// Maximum length for a fully expanded topic
pub const MAX_TOPIC_LEN: usize = 128;

/// Buffer type for topic names
pub type TopicString = String<MAX_TOPIC_LEN>;

/// Detections held by an open document
pub type DetectionList = Vec<DetectionRecord, MAX_DETECTIONS>;

/// Stack buffer for one serialized document
pub type DocumentBuffer = [u8; MAX_DOCUMENT_LEN];

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// An admitted beacon sighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Peer address, lowercase colon-separated
    #[serde(rename = "id")]
    pub device_id: MacString,
    /// RSSI in dBm at detection time
    #[serde(rename = "rssi")]
    pub signal_strength: i8,
    /// Seconds since the Unix epoch (0 if the clock is unsynchronized)
    #[serde(rename = "time")]
    pub observed_at: u32,
}

/// Scan configuration echoed to the remote party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectConfig {
    pub interval: u16,
    pub window: u16,
    pub duration: u16,
    pub name_prefix: NamePrefix,
    pub rssi_threshold: i8,
}

impl From<&ScanConfig> for DetectConfig {
    fn from(scan: &ScanConfig) -> Self {
        Self {
            interval: scan.interval_ms,
            window: scan.window_ms,
            duration: scan.duration_secs,
            name_prefix: scan.name_prefix.clone(),
            rssi_threshold: scan.rssi_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reported {
    pub detect: DetectConfig,
    pub detected: DetectionList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowState {
    pub reported: Reported,
}

/// `{"state":{"reported":{"detect":{..},"detected":[..]}}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    pub state: ShadowState,
}

impl StateDocument {
    /// An empty document carrying a snapshot of the scan configuration.
    pub fn new(scan: &ScanConfig) -> Self {
        Self {
            state: ShadowState {
                reported: Reported {
                    detect: DetectConfig::from(scan),
                    detected: Vec::new(),
                },
            },
        }
    }

    pub fn config_snapshot(&self) -> &DetectConfig {
        &self.state.reported.detect
    }

    pub fn detections(&self) -> &DetectionList {
        &self.state.reported.detected
    }

    pub fn detections_mut(&mut self) -> &mut DetectionList {
        &mut self.state.reported.detected
    }

    /// Drop all detections, keeping the configuration snapshot.
    pub fn reset(&mut self) {
        self.state.reported.detected.clear();
    }

    /// Serialize into `buf`, returning the number of bytes written.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, DocumentError> {
        let capacity = buf.len();
        serde_json_core::to_slice(self, buf).map_err(|e| match e {
            serde_json_core::ser::Error::BufferFull => DocumentError::Overflow { capacity },
            _ => DocumentError::Malformed,
        })
    }

    /// Parse a serialized document.
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        serde_json_core::from_slice::<Self>(bytes)
            .map(|(doc, _)| doc)
            .map_err(|_| DocumentError::Malformed)
    }
}

/// Topic namespace layout: `{root}/{device id}/{document}/...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicScheme {
    pub root: &'static str,
    pub document: &'static str,
}

impl TopicScheme {
    /// `things/{id}/state/...`
    pub const GENERIC: Self = Self {
        root: "things",
        document: "state",
    };

    /// AWS IoT device shadow: `$aws/things/{id}/shadow/...`
    pub const AWS_SHADOW: Self = Self {
        root: "$aws/things",
        document: "shadow",
    };

    /// Longest accepted root segment
    const MAX_ROOT_LEN: usize = 32;
    /// Longest accepted document segment
    const MAX_DOC_SEGMENT_LEN: usize = 16;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.is_empty() || self.document.is_empty() {
            return Err(ConfigError::Missing("topic segment"));
        }
        if self.root.len() > Self::MAX_ROOT_LEN || self.document.len() > Self::MAX_DOC_SEGMENT_LEN {
            return Err(ConfigError::InvalidValue("topic segment length"));
        }
        let has_wildcard = |s: &str| s.contains('+') || s.contains('#');
        if has_wildcard(self.root) || has_wildcard(self.document) {
            return Err(ConfigError::InvalidValue("topic segment"));
        }
        Ok(())
    }

    /// Expand the scheme for one device.
    pub fn topics(&self, id: &DeviceId) -> Topics {
        Topics {
            get: self.expand(id, "get"),
            get_accepted: self.expand(id, "get/accepted"),
            update: self.expand(id, "update"),
        }
    }

    fn expand(&self, id: &DeviceId, action: &str) -> TopicString {
        let mut topic = TopicString::new();
        let _ = write!(topic, "{}/{}/{}/{}", self.root, id, self.document, action);
        topic
    }
}

/// Concrete topics for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Resync request (empty body)
    pub get: TopicString,
    /// Response to a resync request
    pub get_accepted: TopicString,
    /// Reported state updates
    pub update: TopicString,
}

impl Topics {
    /// Control topics subscribed after every session establishment.
    pub fn subscriptions(&self) -> [&str; 2] {
        [self.get_accepted.as_str(), self.update.as_str()]
    }
}
