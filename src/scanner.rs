//! BLE scan pass types and the radio scanner seam.
//!
//! A scan pass is one bounded-duration listen on the radio. The platform
//! backend fills a fixed-capacity `ScanPass`; the filter turns it into
//! detection records. Passes are not cumulative: every call starts empty.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::config::ScanConfig;
use crate::defaults::MAX_PEERS_PER_PASS;
use crate::protocol::MacString;

/// Maximum length for advertised device names
pub type NameString = String<33>;

/// Observed peers from one pass
pub type ScanPass = Vec<ObservedPeer, MAX_PEERS_PER_PASS>;

/// One advertisement seen during a scan pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedPeer {
    pub addr: [u8; 6],
    /// Advertised local name, empty if none was advertised
    pub name: NameString,
    pub rssi: i8,
}

impl ObservedPeer {
    /// Build a peer, truncating over-long names at a char boundary.
    pub fn new(addr: [u8; 6], name: &str, rssi: i8) -> Self {
        let mut peer = Self {
            addr,
            name: NameString::new(),
            rssi,
        };
        push_truncated(&mut peer.name, name);
        peer
    }

    /// Opaque identifier used in detection records.
    pub fn device_id(&self) -> MacString {
        let mut id = MacString::new();
        format_mac(&self.addr, &mut id);
        id
    }
}

/// Platform radio backend.
pub trait RadioScanner {
    /// Error type for radio operations
    type Error: core::fmt::Debug;

    /// Apply duty-cycle settings (interval, window, active flag).
    fn configure(&mut self, config: &ScanConfig) -> Result<(), Self::Error>;

    /// Run one pass of `duration_secs` and store what was seen in `pass`.
    ///
    /// Implementations clear `pass` first and record reports with
    /// [`merge_observation`], so a pass holds one entry per address.
    /// Addresses beyond its capacity are dropped.
    fn scan_once(&mut self, duration_secs: u16, pass: &mut ScanPass) -> Result<(), Self::Error>;
}

/// Record one advertising report in `pass`, keyed by address.
///
/// Repeated advertisements and scan responses from a known address update
/// its entry in place: the RSSI always, the name only when the report
/// carries one (scan responses often do, plain advertisements often don't).
/// Returns `false` if the address is new and the pass is full.
pub fn merge_observation(pass: &mut ScanPass, peer: ObservedPeer) -> bool {
    if let Some(known) = pass.iter_mut().find(|p| p.addr == peer.addr) {
        known.rssi = peer.rssi;
        if !peer.name.is_empty() {
            known.name = peer.name;
        }
        return true;
    }
    pass.push(peer).is_ok()
}

/// Parse BLE advertisement data (AD structures) to extract the local name.
///
/// AD structure format: [length] [type] [data...]
/// Types we care about:
///   0x08 = Shortened local name
///   0x09 = Complete local name (preferred when both are present)
pub struct BleAdvParser;

impl BleAdvParser {
    /// Parse advertisement data bytes into an ObservedPeer.
    /// `addr` is the 6-byte advertiser address.
    /// `rssi` is the received signal strength.
    /// `ad_data` is the raw advertisement (or scan response) payload.
    pub fn parse(addr: &[u8; 6], rssi: i8, ad_data: &[u8]) -> ObservedPeer {
        let mut shortened: Option<&str> = None;
        let mut complete: Option<&str> = None;

        let mut pos = 0;
        while pos < ad_data.len() {
            let len = ad_data[pos] as usize;
            if len == 0 || pos + 1 + len > ad_data.len() {
                break;
            }

            let ad_type = ad_data[pos + 1];
            let data = &ad_data[pos + 2..pos + 1 + len];

            match ad_type {
                0x08 => shortened = core::str::from_utf8(data).ok(),
                0x09 => complete = core::str::from_utf8(data).ok(),
                _ => {}
            }

            pos += 1 + len;
        }

        ObservedPeer::new(*addr, complete.or(shortened).unwrap_or(""), rssi)
    }
}

/// Format a 6-byte address into "aa:bb:cc:dd:ee:ff"
pub fn format_mac(mac: &[u8; 6], buf: &mut MacString) {
    let _ = write!(
        buf,
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
}

fn push_truncated<const N: usize>(buf: &mut String<N>, s: &str) {
    for c in s.chars() {
        if buf.push(c).is_err() {
            break;
        }
    }
}
