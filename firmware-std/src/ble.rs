//! BLE scanning via NimBLE (esp32-nimble).

use beacon_shadow::config::ScanConfig;
use beacon_shadow::scanner::{merge_observation, BleAdvParser, RadioScanner, ScanPass};
use esp32_nimble::{BLEDevice, BLEError, BLEScan};
use esp_idf_svc::hal::task::block_on;

pub struct NimbleScanner {
    device: &'static BLEDevice,
    scan: BLEScan,
}

impl NimbleScanner {
    pub fn new() -> Self {
        Self {
            device: BLEDevice::take(),
            scan: BLEScan::new(),
        }
    }
}

impl RadioScanner for NimbleScanner {
    type Error = BLEError;

    fn configure(&mut self, config: &ScanConfig) -> Result<(), BLEError> {
        self.scan
            .active_scan(config.active)
            .interval(config.interval_ms)
            .window(config.window_ms);
        Ok(())
    }

    fn scan_once(&mut self, duration_secs: u16, pass: &mut ScanPass) -> Result<(), BLEError> {
        pass.clear();
        let mut dropped = 0u32;

        let duration_ms = i32::from(duration_secs) * 1000;
        block_on(self.scan.start(self.device, duration_ms, |device, data| {
            let addr = device.addr().as_be_bytes();
            let peer = BleAdvParser::parse(&addr, device.rssi(), data.payload());
            if !merge_observation(pass, peer) {
                dropped += 1;
            }
            None::<()> // Continue scanning
        }))?;

        if dropped > 0 {
            log::warn!("BLE: pass buffer full, dropped {} reports from new addresses", dropped);
        }
        Ok(())
    }
}
