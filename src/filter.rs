/// Admission filter for BLE scan passes.
///
/// A peer is admitted iff its advertised name is non-empty and starts with
/// the configured prefix, and its RSSI is at or above the threshold. No
/// scoring and no history across passes: each admitted peer yields one
/// detection record stamped at evaluation time.
use heapless::Vec;

use crate::config::ScanConfig;
use crate::defaults::MAX_PEERS_PER_PASS;
use crate::protocol::DetectionRecord;
use crate::scanner::ObservedPeer;

/// Detection records produced by one pass
pub type PassDetections = Vec<DetectionRecord, MAX_PEERS_PER_PASS>;

/// Outcome of merging a record into a detection list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merge {
    /// Same id already present, rssi and time overwritten in place
    Updated,
    /// New id appended
    Appended,
    /// New id but the list is full; the record is handed back
    Full(DetectionRecord),
}

/// The admission test.
pub fn admits(peer: &ObservedPeer, config: &ScanConfig) -> bool {
    !peer.name.is_empty()
        && peer.name.starts_with(config.name_prefix.as_str())
        && peer.rssi >= config.rssi_threshold
}

/// Filter one pass in scan order. Duplicate ids within the pass collapse
/// into one record holding the last observation.
pub fn filter_pass(pass: &[ObservedPeer], config: &ScanConfig, now_secs: u32) -> PassDetections {
    log::info!("BLE: scan returned {} results", pass.len());

    let mut detections = PassDetections::new();
    for (i, peer) in pass.iter().enumerate() {
        let id = peer.device_id();
        log::debug!(
            "BLE: scan result #{}: {} ({}) RSSI = {}",
            i,
            peer.name,
            id,
            peer.rssi
        );

        if !admits(peer, config) {
            continue;
        }

        log::info!(
            "APP: found BLE device with matching name and RSSI: {} ({}) RSSI = {}",
            peer.name,
            id,
            peer.rssi
        );

        let record = DetectionRecord {
            device_id: id,
            signal_strength: peer.rssi,
            observed_at: now_secs,
        };
        if let Merge::Full(dropped) = merge(&mut detections, record) {
            // Unreachable while the pass and detection buffers share a capacity.
            log::warn!("BLE: detection buffer full, dropped {}", dropped.device_id);
        }
    }

    detections
}

/// Insert or update `record` by id, last write wins.
pub fn merge<const N: usize>(list: &mut Vec<DetectionRecord, N>, record: DetectionRecord) -> Merge {
    if let Some(existing) = list
        .iter_mut()
        .find(|r| r.device_id == record.device_id)
    {
        existing.signal_strength = record.signal_strength;
        existing.observed_at = record.observed_at;
        return Merge::Updated;
    }

    match list.push(record) {
        Ok(()) => Merge::Appended,
        Err(record) => Merge::Full(record),
    }
}
