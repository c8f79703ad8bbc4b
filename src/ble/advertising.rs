//! BLE Advertising Controller
//!
//! Owns advertisement payload construction and drives advertising start
//! through a driver implemented by the host-stack glue. The payload is an
//! ephemeral value rebuilt from the device identity on every attempt; no
//! explicit stop exists because a successful connection stops advertising
//! inside the stack itself.

use defmt::{debug, Format};
use heapless::Vec;

use crate::identity::DeviceIdentity;

/// Maximum advertising data length (legacy advertising, BLE specification)
pub const MAX_ADV_DATA_LEN: usize = 31;

/// AD structure type: Flags
const AD_TYPE_FLAGS: u8 = 0x01;
/// AD structure type: Complete Local Name
const AD_TYPE_COMPLETE_NAME: u8 = 0x09;
/// AD structure type: Manufacturer Specific Data
const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// Flags octet: LE General Discoverable Mode
const FLAG_GENERAL_DISCOVERABLE: u8 = 0x02;
/// Flags octet: BR/EDR Not Supported
const FLAG_BREDR_UNSUPPORTED: u8 = 0x04;

/// Advertising state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
#[repr(u8)]
pub enum AdvState {
    Stopped = 0,
    Active = 1,
}

/// Advertising setup errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum AdvError {
    /// Combined AD structures exceed the 31-byte legacy payload limit
    PayloadOverflow,
    /// Host stack rejected the advertisement data
    SetPayloadFailed,
    /// Host stack failed to start advertising
    StartFailed,
}

/// Assembled advertisement payload (flags, complete name, manufacturer tag)
pub struct AdvPayload {
    data: Vec<u8, MAX_ADV_DATA_LEN>,
}

impl AdvPayload {
    /// Build a fresh payload from the device identity.
    ///
    /// The name is always embedded complete, never shortened; an identity
    /// that does not fit the legacy payload is a setup error.
    pub fn build(identity: &DeviceIdentity) -> Result<Self, AdvError> {
        let mut payload = Self { data: Vec::new() };
        payload.push_field(
            AD_TYPE_FLAGS,
            &[FLAG_GENERAL_DISCOVERABLE | FLAG_BREDR_UNSUPPORTED],
        )?;
        payload.push_field(AD_TYPE_COMPLETE_NAME, identity.name.as_bytes())?;
        payload.push_field(AD_TYPE_MANUFACTURER_DATA, identity.manufacturer_tag)?;
        Ok(payload)
    }

    /// Raw AD structure bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Append one AD structure: length, type, payload
    fn push_field(&mut self, ad_type: u8, field: &[u8]) -> Result<(), AdvError> {
        self.data
            .push(field.len() as u8 + 1)
            .map_err(|_| AdvError::PayloadOverflow)?;
        self.data.push(ad_type).map_err(|_| AdvError::PayloadOverflow)?;
        self.data
            .extend_from_slice(field)
            .map_err(|_| AdvError::PayloadOverflow)?;
        Ok(())
    }
}

/// Seam to the host stack's advertising primitives.
///
/// The firmware glue implements this over the SoftDevice; tests implement
/// it with a recording mock.
pub trait AdvDriver {
    /// Hand the assembled payload to the stack
    fn set_payload(&mut self, payload: &AdvPayload) -> Result<(), AdvError>;

    /// Begin undirected general-discoverable advertising with no timeout.
    ///
    /// Expiry, if the stack ever imposes one, is reported back through the
    /// lifecycle as an advertising-complete event.
    fn start(&mut self) -> Result<(), AdvError>;
}

/// Advertising controller state
pub struct AdvController<D: AdvDriver> {
    driver: D,
    identity: DeviceIdentity,
    state: AdvState,
}

impl<D: AdvDriver> AdvController<D> {
    /// Create a stopped controller for the given identity
    pub const fn new(driver: D, identity: DeviceIdentity) -> Self {
        Self {
            driver,
            identity,
            state: AdvState::Stopped,
        }
    }

    /// Rebuild the payload and (re)start advertising.
    ///
    /// The first failure propagates without retry; recovery is owned by the
    /// lifecycle machine, which re-enters here on the next sync or
    /// disconnect event.
    pub fn restart(&mut self) -> Result<(), AdvError> {
        let payload = AdvPayload::build(&self.identity)?;
        self.driver.set_payload(&payload)?;
        self.driver.start()?;
        self.state = AdvState::Active;
        debug!("ADV: advertising active ({} payload bytes)", payload.as_slice().len());
        Ok(())
    }

    /// Record the implicit advertising stop performed by the stack when a
    /// connection is established.
    pub fn connection_established(&mut self) {
        self.state = AdvState::Stopped;
    }

    /// Current advertising state
    pub fn state(&self) -> AdvState {
        self.state
    }

    /// Whether advertising is currently active
    pub fn is_advertising(&self) -> bool {
        self.state == AdvState::Active
    }

    /// Access the underlying driver
    pub fn driver(&self) -> &D {
        &self.driver
    }
}
