mod address;

pub use address::{decode, encode, AddressParseError, DeviceAddress, DEVICE_SEPARATOR};

/// Device id type (non-negative, assigned by the remote service).
pub type DeviceId = u32;
