//! beacon-shadow: ESP-IDF std firmware
//!
//! Binds the portable core to the ESP32: Wi-Fi station via esp-idf-svc,
//! TLS MQTT via the ESP-IDF MQTT client, BLE scanning via NimBLE
//! (esp32-nimble), SNTP wall clock. The control loop runs on the main
//! thread.

mod ble;
mod mqtt;
mod platform;
mod settings;
mod wifi;

use beacon_shadow::agent::Agent;
use beacon_shadow::board;
use beacon_shadow::protocol::VERSION;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("beacon-shadow v{} starting on {} (std)", VERSION, board::BOARD_NAME);

    let config = settings::agent_config()?;

    // ── Peripherals ──────────────────────────────────────────────────

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;

    // ── Collaborators ────────────────────────────────────────────────

    let link = wifi::WifiLink::new(wifi);
    let session = mqtt::MqttSession::new(settings::root_ca());
    let scanner = ble::NimbleScanner::new();
    let identity = platform::EfuseIdentity::new(settings::credentials());
    let clock = platform::EspClock::start()?;

    let agent = Agent::start(config, link, session, scanner, identity, clock)?;
    log::info!("APP: device {} ready to scan", agent.device_id());

    agent.run()
}
