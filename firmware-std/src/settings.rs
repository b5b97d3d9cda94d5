//! Build-time settings.
//!
//! Values come from environment variables at compile time:
//!
//! | variable                | meaning                                   |
//! |-------------------------|-------------------------------------------|
//! | `WIFI_SSID`/`WIFI_PASS` | network credentials                       |
//! | `BROKER_ENDPOINT`       | broker host name                          |
//! | `BROKER_PORT`           | broker port (default 8883)                |
//! | `TOPIC_SCHEME`          | `aws` for `$aws/things/...`, else generic |
//! | `DEVICE_CERT`           | client certificate PEM                    |
//! | `DEVICE_KEY`            | private key PEM, unset with a secure element |
//! | `ROOT_CA`               | broker CA PEM, unset to use the CA bundle |
//! | `DETECT_NAME_PREFIX`    | beacon name prefix override               |
//! | `DETECT_RSSI_THRESHOLD` | RSSI threshold override (dBm)             |

use anyhow::Context;
use beacon_shadow::config::{AgentConfig, BrokerConfig, NetworkConfig, ScanConfig};
use beacon_shadow::protocol::TopicScheme;

use crate::platform::Credentials;

pub fn agent_config() -> anyhow::Result<AgentConfig> {
    let network = NetworkConfig {
        ssid: option_env!("WIFI_SSID").unwrap_or(""),
        password: option_env!("WIFI_PASS").unwrap_or(""),
    };

    let topics = match option_env!("TOPIC_SCHEME") {
        Some("aws") => TopicScheme::AWS_SHADOW,
        _ => TopicScheme::GENERIC,
    };
    let mut broker = BrokerConfig::new(option_env!("BROKER_ENDPOINT").unwrap_or("")).with_topics(topics);
    if let Some(port) = option_env!("BROKER_PORT") {
        broker.port = port.trim().parse().context("BROKER_PORT")?;
    }

    let scan = ScanConfig::new()
        .with_overrides(
            option_env!("DETECT_NAME_PREFIX"),
            option_env!("DETECT_RSSI_THRESHOLD"),
        )
        .context("scan overrides")?;

    Ok(AgentConfig::new(network, broker).with_scan(scan))
}

pub fn credentials() -> Credentials {
    Credentials {
        certificate: option_env!("DEVICE_CERT").map(nul_terminated),
        private_key: option_env!("DEVICE_KEY").map(nul_terminated),
    }
}

pub fn root_ca() -> Option<&'static str> {
    option_env!("ROOT_CA").map(nul_terminated)
}

/// The TLS layer reads PEMs up to a terminating NUL. Called once per
/// value at startup.
fn nul_terminated(pem: &'static str) -> &'static str {
    if pem.ends_with('\0') {
        return pem;
    }
    Box::leak(format!("{pem}\0").into_boxed_str())
}
