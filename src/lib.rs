//! beacon-shadow library: portable proximity reporter core.
//!
//! Detects nearby BLE beacons that match a name prefix and signal
//! threshold, and reports them to an MQTT broker as part of a synchronized
//! reported-state document, while keeping the network link and broker
//! session alive. This crate holds the connection state machine, the
//! scan filter and the publish policy with no platform dependencies,
//! testable on any host with `cargo test`. Platform binaries (the ESP-IDF
//! firmware in `firmware-std/`) implement the hardware traits:
//!
//! - [`comm::NetworkLink`], [`comm::BrokerSession`]: Wi-Fi and TLS MQTT
//! - [`scanner::RadioScanner`]: BLE scanning
//! - [`identity::IdentityProvider`]: device id and session credential
//! - [`clock::Clock`]: uptime, delays and synchronized wall-clock time
//!
//! `no_std`, no allocator. Fixed-capacity `heapless` buffers throughout.

#![cfg_attr(not(test), no_std)]

pub mod agent;
pub mod board;
pub mod clock;
pub mod comm;
pub mod config;
pub mod connectivity;
pub mod defaults;
pub mod error;
pub mod filter;
pub mod identity;
pub mod protocol;
pub mod scanner;
pub mod shadow;

#[cfg(test)]
mod testutil;
