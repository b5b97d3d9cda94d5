/// Compiled-in defaults for the proximity reporter.
///
/// Scan timing and admission values match the reference hand-hygiene
/// deployment (badge beacons advertising as `RHS-*`). Capacity constants
/// are sized together: a document holding `MAX_DETECTIONS` records with a
/// `MAX_PREFIX_LEN` prefix always serializes within `MAX_DOCUMENT_LEN`.

/// BLE scan interval in milliseconds.
pub const SCAN_INTERVAL_MS: u16 = 100;

/// BLE scan window in milliseconds. Must not exceed the interval.
pub const SCAN_WINDOW_MS: u16 = 99;

/// Length of one scan pass in seconds.
pub const SCAN_DURATION_SECS: u16 = 1;

/// Active scanning requests scan responses: more power, faster names.
pub const SCAN_ACTIVE: bool = true;

/// Advertised-name prefix a beacon must carry to be reported.
pub const NAME_PREFIX: &str = "RHS";

/// Minimum RSSI (dBm) for a beacon to count as "nearby".
pub const RSSI_THRESHOLD: i8 = -50;

/// Maximum length of the configured name prefix in bytes.
pub const MAX_PREFIX_LEN: usize = 16;

/// Minimum time between two unconditional shadow reports.
pub const PUBLISH_INTERVAL_MS: u64 = 10_000;

/// Fixed wait between connection attempts.
pub const RETRY_BACKOFF_MS: u32 = 5_000;

/// Serialized shadow document budget in bytes.
pub const MAX_DOCUMENT_LEN: usize = 1024;

/// Detection records kept per publish window before the oldest is evicted.
///
/// Worst case record: `{"id":"aa:bb:cc:dd:ee:ff","rssi":-128,"time":4294967295},`
/// is 57 bytes; the document envelope with a full prefix is under 170.
pub const MAX_DETECTIONS: usize = 14;

/// Observed peers kept from a single scan pass.
pub const MAX_PEERS_PER_PASS: usize = 32;

/// TLS MQTT port of the broker.
pub const BROKER_PORT: u16 = 8883;

/// NTP server used to synchronize the wall clock at startup.
pub const NTP_SERVER: &str = "pool.ntp.org";

/// How often a halted agent repeats its fatal error report.
pub const HALT_REPORT_INTERVAL_MS: u32 = 60_000;
