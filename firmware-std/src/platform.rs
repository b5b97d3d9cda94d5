//! Clock and identity backed by ESP-IDF services.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use beacon_shadow::board;
use beacon_shadow::clock::Clock;
use beacon_shadow::defaults::NTP_SERVER;
use beacon_shadow::error::IdentityError;
use beacon_shadow::identity::{DeviceId, IdentityProvider, SessionCredential};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
use esp_idf_svc::sys::{esp, esp_efuse_mac_get_default, EspError};

/// Uptime from boot plus an SNTP-synchronized wall clock.
pub struct EspClock {
    boot: Instant,
    sntp: EspSntp<'static>,
}

impl EspClock {
    /// Starts SNTP. Synchronization completes in the background once the
    /// network is up.
    pub fn start() -> Result<Self, EspError> {
        let mut conf = SntpConf::default();
        conf.servers[0] = NTP_SERVER;
        let sntp = EspSntp::new(&conf)?;
        log::info!("NTP: synchronizing wall clock with {}", NTP_SERVER);
        Ok(Self {
            boot: Instant::now(),
            sntp,
        })
    }
}

impl Clock for EspClock {
    fn uptime_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    fn epoch_secs(&self) -> u32 {
        if self.sntp.get_sync_status() != SyncStatus::Completed {
            return 0;
        }
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

/// Credential PEMs as NUL-terminated strings, fixed at build time.
pub struct Credentials {
    pub certificate: Option<&'static str>,
    pub private_key: Option<&'static str>,
}

/// Identifier from the factory eFuse MAC.
pub struct EfuseIdentity {
    credentials: Credentials,
}

impl EfuseIdentity {
    pub fn new(credentials: Credentials) -> Self {
        if board::HAS_SECURE_ELEMENT && credentials.private_key.is_none() {
            log::info!("ID: {} signs with its secure element", board::BOARD_NAME);
        }
        Self { credentials }
    }
}

impl IdentityProvider for EfuseIdentity {
    fn device_id(&mut self) -> Result<DeviceId, IdentityError> {
        let mut mac = [0u8; 6];
        esp!(unsafe { esp_efuse_mac_get_default(mac.as_mut_ptr()) }).map_err(|e| {
            log::error!("ID: failed to read eFuse MAC: {:?}", e);
            IdentityError::Unavailable
        })?;
        DeviceId::from_bytes(&mac)
    }

    fn session_credential(&mut self) -> Result<SessionCredential, IdentityError> {
        SessionCredential::resolve(
            self.credentials.certificate,
            self.credentials.private_key,
            board::HAS_SECURE_ELEMENT,
        )
    }
}
