//! Device identity consumed from an external provider.
//!
//! On the reference board the identifier is the serial number of the
//! secure element and the TLS private key never leaves it. The core only
//! sees the normalized identifier and opaque credential material.

use core::fmt::{self, Write};

use heapless::String;

use crate::error::IdentityError;

/// Longest accepted device identifier (hex characters).
pub const MAX_DEVICE_ID_LEN: usize = 32;

/// Stable, lowercase hexadecimal device identifier.
///
/// Used as MQTT client id and as the key of the topic namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId(String<MAX_DEVICE_ID_LEN>);

impl DeviceId {
    /// Normalize and validate a raw identifier (surrounding whitespace is
    /// ignored, upper-case hex is folded to lower-case).
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(IdentityError::EmptyId);
        }
        if raw.len() > MAX_DEVICE_ID_LEN {
            return Err(IdentityError::IdTooLong {
                max: MAX_DEVICE_ID_LEN,
            });
        }

        let mut id = String::new();
        for c in raw.chars() {
            if !c.is_ascii_hexdigit() {
                return Err(IdentityError::NotHex);
            }
            let _ = id.push(c.to_ascii_lowercase());
        }
        Ok(Self(id))
    }

    /// Build an identifier from raw serial bytes (e.g. an eFuse MAC).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        if bytes.is_empty() {
            return Err(IdentityError::EmptyId);
        }
        if bytes.len() * 2 > MAX_DEVICE_ID_LEN {
            return Err(IdentityError::IdTooLong {
                max: MAX_DEVICE_ID_LEN,
            });
        }

        let mut id = String::new();
        for b in bytes {
            let _ = write!(id, "{:02x}", b);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the TLS client key lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateKey {
    /// Key material, PEM.
    Pem(&'static str),
    /// Held by a secure element; the TLS stack must sign in hardware.
    SecureElement,
}

/// TLS client credential for the broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCredential {
    /// Device certificate, PEM.
    pub certificate: &'static str,
    pub private_key: PrivateKey,
}

impl SessionCredential {
    /// Assemble a credential from provisioned material. A missing key is
    /// only acceptable when the board carries a secure element.
    pub fn resolve(
        certificate: Option<&'static str>,
        private_key: Option<&'static str>,
        has_secure_element: bool,
    ) -> Result<Self, IdentityError> {
        let certificate = certificate
            .filter(|pem| !pem.trim_end_matches('\0').is_empty())
            .ok_or(IdentityError::NoCredential)?;
        let private_key = match private_key {
            Some(pem) => PrivateKey::Pem(pem),
            None if has_secure_element => PrivateKey::SecureElement,
            None => return Err(IdentityError::NoCredential),
        };
        Ok(Self {
            certificate,
            private_key,
        })
    }

    pub fn uses_secure_element(&self) -> bool {
        self.private_key == PrivateKey::SecureElement
    }
}

/// Source of the device identifier and session credential.
pub trait IdentityProvider {
    /// The device identifier. Must be stable for the process lifetime.
    fn device_id(&mut self) -> Result<DeviceId, IdentityError>;

    /// Credential used to authenticate a new broker session.
    fn session_credential(&mut self) -> Result<SessionCredential, IdentityError>;
}
