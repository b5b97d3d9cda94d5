//! Static agent configuration.
//!
//! Everything here is set once at startup (compiled-in defaults plus
//! optional build-time overrides) and never changes while the loop runs.

use heapless::String;

use crate::defaults;
use crate::error::ConfigError;
use crate::protocol::TopicScheme;

/// Name prefix storage, sized to the prefix limit.
pub type NamePrefix = String<{ defaults::MAX_PREFIX_LEN }>;

/// BLE scan timing and admission criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Scan interval in milliseconds
    pub interval_ms: u16,
    /// Scan window in milliseconds, less or equal the interval
    pub window_ms: u16,
    /// Duration of one scan pass in seconds
    pub duration_secs: u16,
    /// Active scanning (request scan responses)
    pub active: bool,
    /// Advertised names must start with this prefix
    pub name_prefix: NamePrefix,
    /// Minimum RSSI (dBm) to admit a peer
    pub rssi_threshold: i8,
}

impl ScanConfig {
    pub fn new() -> Self {
        let mut name_prefix = NamePrefix::new();
        let _ = name_prefix.push_str(defaults::NAME_PREFIX);
        Self {
            interval_ms: defaults::SCAN_INTERVAL_MS,
            window_ms: defaults::SCAN_WINDOW_MS,
            duration_secs: defaults::SCAN_DURATION_SECS,
            active: defaults::SCAN_ACTIVE,
            name_prefix,
            rssi_threshold: defaults::RSSI_THRESHOLD,
        }
    }

    /// Replace the name prefix.
    pub fn with_name_prefix(mut self, prefix: &str) -> Result<Self, ConfigError> {
        check_prefix(prefix)?;
        self.name_prefix.clear();
        self.name_prefix
            .push_str(prefix)
            .map_err(|_| ConfigError::PrefixTooLong {
                max: defaults::MAX_PREFIX_LEN,
            })?;
        Ok(self)
    }

    pub fn with_rssi_threshold(mut self, threshold: i8) -> Self {
        self.rssi_threshold = threshold;
        self
    }

    /// Apply textual overrides (build-time environment values). `None`
    /// keeps the current setting.
    pub fn with_overrides(
        self,
        name_prefix: Option<&str>,
        rssi_threshold: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = match name_prefix {
            Some(prefix) => self.with_name_prefix(prefix)?,
            None => self,
        };
        if let Some(raw) = rssi_threshold {
            config.rssi_threshold = raw
                .trim()
                .parse::<i8>()
                .map_err(|_| ConfigError::InvalidValue("rssi threshold"))?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Zero("scan interval"));
        }
        if self.window_ms == 0 {
            return Err(ConfigError::Zero("scan window"));
        }
        if self.duration_secs == 0 {
            return Err(ConfigError::Zero("scan duration"));
        }
        if self.window_ms > self.interval_ms {
            return Err(ConfigError::WindowExceedsInterval {
                interval_ms: self.interval_ms,
                window_ms: self.window_ms,
            });
        }
        check_prefix(&self.name_prefix)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The prefix is echoed verbatim into the shadow document, so it must
/// not need escaping (the document size budget assumes raw bytes).
fn check_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.len() > defaults::MAX_PREFIX_LEN {
        return Err(ConfigError::PrefixTooLong {
            max: defaults::MAX_PREFIX_LEN,
        });
    }
    let printable = prefix
        .bytes()
        .all(|b| (0x20..0x7F).contains(&b) && b != b'"' && b != b'\\');
    if !printable {
        return Err(ConfigError::PrefixCharacter);
    }
    Ok(())
}

/// Wi-Fi credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub ssid: &'static str,
    pub password: &'static str,
}

/// Broker endpoint and topic layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Host name only, no scheme.
    pub endpoint: &'static str,
    pub port: u16,
    pub topics: TopicScheme,
}

impl BrokerConfig {
    pub const fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            port: defaults::BROKER_PORT,
            topics: TopicScheme::GENERIC,
        }
    }

    pub const fn with_topics(mut self, topics: TopicScheme) -> Self {
        self.topics = topics;
        self
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub network: NetworkConfig,
    pub broker: BrokerConfig,
    pub scan: ScanConfig,
    /// Unconditional report period
    pub publish_interval_ms: u64,
    /// Wait between connection attempts
    pub retry_backoff_ms: u32,
}

impl AgentConfig {
    pub fn new(network: NetworkConfig, broker: BrokerConfig) -> Self {
        Self {
            network,
            broker,
            scan: ScanConfig::new(),
            publish_interval_ms: defaults::PUBLISH_INTERVAL_MS,
            retry_backoff_ms: defaults::RETRY_BACKOFF_MS,
        }
    }

    pub fn with_scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.ssid.is_empty() {
            return Err(ConfigError::Missing("wifi ssid"));
        }
        if self.broker.endpoint.is_empty() {
            return Err(ConfigError::Missing("broker endpoint"));
        }
        if self.broker.port == 0 {
            return Err(ConfigError::Zero("broker port"));
        }
        if self.publish_interval_ms == 0 {
            return Err(ConfigError::Zero("publish interval"));
        }
        if self.retry_backoff_ms == 0 {
            return Err(ConfigError::Zero("retry backoff"));
        }
        self.broker.topics.validate()?;
        self.scan.validate()
    }
}
