//! Credential value types.

use crate::types::DeviceId;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use std::fmt;

/// Random bytes in a freshly generated service password.
const PASSWORD_BYTES: usize = 16;

/// Full credential set written after registration or device linking.
#[derive(Clone)]
pub struct SetCredentials {
    /// Stable account identifier. When absent, any stored identifier is removed.
    pub identifier: Option<String>,
    pub number: String,
    pub device_id: DeviceId,
    /// Written only when present and non-empty.
    pub device_name: Option<String>,
    pub password: String,
}

impl fmt::Debug for SetCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetCredentials")
            .field("identifier", &self.identifier)
            .field("number", &self.number)
            .field("device_id", &self.device_id)
            .field("device_name", &self.device_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Username/password pair for authenticating against the remote service.
#[derive(Clone, PartialEq, Eq, serde::Serialize)]
pub struct WebServiceCredentials {
    pub username: String,
    pub password: String,
}

impl WebServiceCredentials {
    /// `Authorization` header value: `Basic base64(username:password)`.
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// True when neither a username nor a password is stored.
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for WebServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebServiceCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh service password (16 random bytes, base64).
pub fn generate_password() -> String {
    let mut bytes = [0u8; PASSWORD_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
