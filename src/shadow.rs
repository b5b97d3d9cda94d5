//! Reported-state synchronizer.
//!
//! Accumulates detections into the open document between publishes and
//! decides each tick whether to send it. A document with detections is
//! sent on every tick; an empty one at most once per publish interval, as
//! a heartbeat that carries the configuration snapshot.

use crate::config::ScanConfig;
use crate::defaults::MAX_DOCUMENT_LEN;
use crate::error::DocumentError;
use crate::filter::{merge, Merge};
use crate::protocol::{DetectionRecord, DocumentBuffer, StateDocument};

/// Destination for serialized reports.
pub trait ReportSink {
    type Error: core::fmt::Debug;

    fn send_report(&mut self, payload: &[u8]) -> Result<(), Self::Error>;
}

/// What a publish decision did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Not due: interval not elapsed and nothing detected.
    NotDue,
    Published { bytes: usize },
    /// Serialized form exceeded the buffer. Nothing was sent.
    Overflow,
    /// The encoder rejected the document for another reason. Nothing was
    /// sent.
    EncodeFailed,
    /// The sink rejected the report; the document stays open.
    SendFailed,
}

pub struct ShadowSync {
    document: StateDocument,
    last_publish_ms: u64,
    publish_interval_ms: u64,
    evicted: u32,
}

impl ShadowSync {
    pub fn new(scan: &ScanConfig, publish_interval_ms: u64) -> Self {
        Self {
            document: StateDocument::new(scan),
            last_publish_ms: 0,
            publish_interval_ms,
            evicted: 0,
        }
    }

    pub fn document(&self) -> &StateDocument {
        &self.document
    }

    /// Uptime of the last successful publish (0 before the first).
    pub fn last_publish_ms(&self) -> u64 {
        self.last_publish_ms
    }

    /// Records dropped by the eviction policy since startup.
    pub fn evicted(&self) -> u32 {
        self.evicted
    }

    /// Merge one pass into the open document. Known ids are updated in
    /// place, new ids appended. A full list evicts its oldest record.
    pub fn accumulate(&mut self, detections: &[DetectionRecord]) {
        for record in detections {
            let list = self.document.detections_mut();
            if let Merge::Full(record) = merge(list, record.clone()) {
                let oldest = list.remove(0);
                self.evicted = self.evicted.saturating_add(1);
                log::warn!(
                    "APP: detection list full, evicting oldest ({})",
                    oldest.device_id
                );
                // A slot was just freed.
                let _ = list.push(record);
            }
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_publish_ms) > self.publish_interval_ms
            || !self.document.detections().is_empty()
    }

    /// Publish the document through `sink` if due.
    pub fn publish_if_due<K: ReportSink>(&mut self, now_ms: u64, sink: &mut K) -> PublishOutcome {
        let mut buf: DocumentBuffer = [0u8; MAX_DOCUMENT_LEN];
        self.publish_into(now_ms, sink, &mut buf)
    }

    pub(crate) fn publish_into<K: ReportSink>(
        &mut self,
        now_ms: u64,
        sink: &mut K,
        buf: &mut [u8],
    ) -> PublishOutcome {
        if !self.is_due(now_ms) {
            return PublishOutcome::NotDue;
        }

        let len = match self.document.serialize(buf) {
            Ok(len) => len,
            Err(e) => return encode_failure(e),
        };

        if let Ok(text) = core::str::from_utf8(&buf[..len]) {
            log::info!("{}", text);
        }

        match sink.send_report(&buf[..len]) {
            Ok(()) => {
                log::info!(
                    "APP: published {} detections ({} bytes)",
                    self.document.detections().len(),
                    len
                );
                self.last_publish_ms = now_ms;
                self.document.reset();
                PublishOutcome::Published { bytes: len }
            }
            Err(e) => {
                log::warn!("MQTT: publish failed: {:?}", e);
                PublishOutcome::SendFailed
            }
        }
    }
}

/// Log a serialization failure and map it to the skipped-publish outcome.
fn encode_failure(e: DocumentError) -> PublishOutcome {
    match e {
        DocumentError::Overflow { capacity } => {
            log::error!(
                "APP: shadow document exceeds {} bytes, publish skipped",
                capacity
            );
            PublishOutcome::Overflow
        }
        DocumentError::Malformed => {
            log::error!("APP: shadow document could not be encoded, publish skipped");
            PublishOutcome::EncodeFailed
        }
    }
}
