//! Device Identity Configuration
//!
//! Single source of truth for everything that names the device on air.
//! The same name is used for the GAP advertising payload and the GATT
//! device-name attribute; earlier firmware revisions carried two diverging
//! copies of this string, so it is deliberately one constant now.

/// Device name advertised in GAP advertising data and served from the GATT
/// device-name attribute.
pub const DEVICE_NAME: &str = "LuminaSet-RGBKit";

/// Opaque manufacturer tag embedded as Manufacturer Specific Data in every
/// advertising payload.
pub const MANUFACTURER_TAG: &[u8] = b"LuminaSet";

/// Primary service UUID (128-bit, little-endian byte order as registered
/// with the host stack).
pub const SERVICE_UUID: [u8; 16] = [
    0xDA, 0xBD, 0xE8, 0xFC, 0x9E, 0xDE, 0x46, 0xB2, 0x0C, 0x4A, 0x5F, 0xD6, 0xFF, 0xFF, 0xE1, 0xA0,
];

/// Data characteristic UUID (128-bit, little-endian byte order).
pub const CHARACTERISTIC_UUID: [u8; 16] = [
    0xDA, 0xBD, 0xE8, 0xFC, 0x9E, 0xDE, 0x46, 0xB2, 0x0C, 0x4A, 0x5F, 0xD6, 0xFF, 0xFF, 0xE1, 0xA1,
];

/// Characteristic User Description descriptor type (16-bit assigned number).
pub const USER_DESCRIPTION_UUID: u16 = 0x2901;

/// Human-readable description served from the user-description descriptor.
pub const CHARACTERISTIC_DESCRIPTION: &str = "Device RX/TX API";

/// Device identity consumed by the advertising controller when it rebuilds
/// the advertisement payload.
#[derive(Debug, Clone, Copy)]
pub struct DeviceIdentity {
    /// Complete local name embedded in the advertising payload
    pub name: &'static str,
    /// Manufacturer-specific data tag
    pub manufacturer_tag: &'static [u8],
}

impl DeviceIdentity {
    /// Identity of the shipped LuminaSet RGB controller
    pub const fn luminaset() -> Self {
        Self {
            name: DEVICE_NAME,
            manufacturer_tag: MANUFACTURER_TAG,
        }
    }
}
