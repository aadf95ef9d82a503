use std::fmt;
use std::str::FromStr;

use super::DeviceId;

/// Separator between the base identifier and the device id.
pub const DEVICE_SEPARATOR: char = '.';

/// Encode a combined key: `<base>.<device_id>`.
pub fn encode(base: &str, device_id: DeviceId) -> String {
    format!("{}{}{}", base, DEVICE_SEPARATOR, device_id)
}

/// Split a combined key on its last separator into `(base, device_id)`.
///
/// Lenient: a value without a separator decodes to the whole string and no
/// device id. The device id part is returned unparsed.
pub fn decode(combined: &str) -> (&str, Option<&str>) {
    match combined.rsplit_once(DEVICE_SEPARATOR) {
        Some((base, device)) => (base, Some(device)),
        None => (combined, None),
    }
}

/// A base identifier (phone number or stable identifier) bound to one device.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceAddress {
    pub base: String,
    pub device_id: DeviceId,
}

impl DeviceAddress {
    pub fn new(base: impl Into<String>, device_id: DeviceId) -> Self {
        Self {
            base: base.into(),
            device_id,
        }
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (base, device) = decode(s);
        let device = device.ok_or(AddressParseError)?;
        if device.is_empty() || !device.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressParseError);
        }
        Ok(Self {
            base: base.to_string(),
            device_id: device.parse().map_err(|_| AddressParseError)?,
        })
    }
}

#[derive(Debug)]
pub struct AddressParseError;

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid device address format")
    }
}

impl std::error::Error for AddressParseError {}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base, DEVICE_SEPARATOR, self.device_id)
    }
}

impl serde::Serialize for DeviceAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for DeviceAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DeviceAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}
