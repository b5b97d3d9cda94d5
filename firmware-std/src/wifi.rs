//! Wi-Fi station link over `BlockingWifi`.

use beacon_shadow::comm::NetworkLink;
use beacon_shadow::config::NetworkConfig;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

#[derive(Debug)]
pub enum LinkError {
    /// SSID or password does not fit the driver's buffers
    Credentials,
    Esp(EspError),
}

impl From<EspError> for LinkError {
    fn from(e: EspError) -> Self {
        LinkError::Esp(e)
    }
}

pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiLink {
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self { wifi }
    }
}

impl NetworkLink for WifiLink {
    type Error = LinkError;

    fn is_up(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn associate(&mut self, config: &NetworkConfig) -> Result<(), LinkError> {
        let auth_method = if config.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: config.ssid.try_into().map_err(|_| LinkError::Credentials)?,
            password: config.password.try_into().map_err(|_| LinkError::Credentials)?,
            auth_method,
            ..Default::default()
        };
        self.wifi.set_configuration(&Configuration::Client(client))?;

        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        if self.wifi.is_connected()? {
            // Associated but no address yet, or a stale association.
            let _ = self.wifi.disconnect();
        }

        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;

        if let Ok(ip_info) = self.wifi.wifi().sta_netif().get_ip_info() {
            log::info!("WiFi: IP address {:?}", ip_info.ip);
        }
        Ok(())
    }
}
