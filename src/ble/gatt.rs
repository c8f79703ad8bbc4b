//! GATT Access Dispatcher
//!
//! Routes attribute access operations, keyed by attribute handle and
//! operation kind, to the value-level handlers on the attribute store.
//! Validation failures are mapped to ATT protocol error codes and returned
//! to the requester; nothing here is ever fatal to the host task.

use defmt::{debug, info, Format};
use heapless::Vec;

use crate::ble::attributes::{AttributeStore, StoreError, CHR_VALUE_LEN};

/// Attribute access operation kinds delivered by the host stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum AccessOp {
    /// Read the data characteristic value
    ReadChr,
    /// Write the data characteristic value
    WriteChr,
    /// Read the user-description descriptor
    ReadDsc,
    /// Write the user-description descriptor
    WriteDsc,
}

/// ATT protocol error codes returned to the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
#[repr(u8)]
pub enum AttError {
    /// Write attempted on a read-only attribute
    WriteNotPermitted = 0x03,
    /// Write payload length does not match the attribute value length
    InvalidAttributeValueLength = 0x0D,
    /// Catch-all for operation kinds the schema does not support
    UnlikelyError = 0x0E,
    /// Response staging buffer cannot hold the attribute value
    InsufficientResources = 0x11,
}

/// Routes access operations on the fixed schema to the attribute store.
///
/// Holds only the attribute handles assigned at registration time; all
/// value state lives in the [`AttributeStore`] passed into each call.
pub struct GattDispatcher {
    value_handle: u16,
    descr_handle: u16,
}

impl GattDispatcher {
    /// Create a dispatcher for the handles assigned at schema registration
    pub const fn new(value_handle: u16, descr_handle: u16) -> Self {
        Self {
            value_handle,
            descr_handle,
        }
    }

    /// Handle of the data characteristic value attribute
    pub fn value_handle(&self) -> u16 {
        self.value_handle
    }

    /// Handle of the user-description descriptor attribute
    pub fn descr_handle(&self) -> u16 {
        self.descr_handle
    }

    /// Dispatch one attribute access operation.
    ///
    /// Read results are appended to `out`, mirroring the transport staging
    /// buffer of the host stack. Any (handle, operation) pair outside the
    /// fixed schema is answered with [`AttError::UnlikelyError`].
    pub fn access<const N: usize>(
        &self,
        store: &mut AttributeStore,
        conn_handle: u16,
        attr_handle: u16,
        op: AccessOp,
        data: &[u8],
        out: &mut Vec<u8, N>,
    ) -> Result<(), AttError> {
        match (attr_handle, op) {
            (h, AccessOp::ReadChr) if h == self.value_handle => self.read_characteristic(store, out),
            (h, AccessOp::WriteChr) if h == self.value_handle => {
                self.write_characteristic(store, conn_handle, data)
            }
            (h, AccessOp::ReadDsc) if h == self.descr_handle => self.read_descriptor(store, out),
            (h, AccessOp::WriteDsc) if h == self.descr_handle => Err(AttError::WriteNotPermitted),
            _ => {
                debug!(
                    "GATT: unsupported access: handle={}, op={:?}",
                    attr_handle, op
                );
                Err(AttError::UnlikelyError)
            }
        }
    }

    /// Canonical bytes for an attribute handle, taken from the store.
    ///
    /// The firmware glue rewrites the stack's attribute table from this
    /// after a rejected write, so the table never serves bytes the store
    /// did not accept.
    pub fn canonical_bytes<'a>(&self, store: &'a AttributeStore, attr_handle: u16) -> Option<&'a [u8]> {
        if attr_handle == self.value_handle {
            Some(store.value())
        } else if attr_handle == self.descr_handle {
            Some(store.description().as_bytes())
        } else {
            None
        }
    }

    /// Append the current characteristic value to the staging buffer
    fn read_characteristic<const N: usize>(
        &self,
        store: &AttributeStore,
        out: &mut Vec<u8, N>,
    ) -> Result<(), AttError> {
        out.extend_from_slice(store.value())
            .map_err(|_| AttError::InsufficientResources)
    }

    /// Replace the characteristic value; exact-length writes only
    fn write_characteristic(
        &self,
        store: &mut AttributeStore,
        conn_handle: u16,
        data: &[u8],
    ) -> Result<(), AttError> {
        match store.write_value(data) {
            Ok(()) => {
                info!(
                    "GATT: characteristic written: conn={}, value={=[u8]:x}",
                    conn_handle,
                    store.value().as_slice()
                );
                Ok(())
            }
            Err(StoreError::InvalidValueLength) => {
                debug!(
                    "GATT: rejected write of {} bytes (expected {})",
                    data.len(),
                    CHR_VALUE_LEN
                );
                Err(AttError::InvalidAttributeValueLength)
            }
        }
    }

    /// Append the user-description string to the staging buffer
    fn read_descriptor<const N: usize>(
        &self,
        store: &AttributeStore,
        out: &mut Vec<u8, N>,
    ) -> Result<(), AttError> {
        out.extend_from_slice(store.description().as_bytes())
            .map_err(|_| AttError::InsufficientResources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUE_HANDLE: u16 = 0x0010;
    const DESCR_HANDLE: u16 = 0x0011;

    fn dispatcher() -> (GattDispatcher, AttributeStore) {
        (
            GattDispatcher::new(VALUE_HANDLE, DESCR_HANDLE),
            AttributeStore::new("Device RX/TX API"),
        )
    }

    #[test]
    fn test_characteristic_write_then_read() {
        let (disp, mut store) = dispatcher();
        let mut out: Vec<u8, 23> = Vec::new();

        disp.access(&mut store, 1, VALUE_HANDLE, AccessOp::WriteChr, &[9, 8, 7, 6], &mut out)
            .unwrap();
        disp.access(&mut store, 1, VALUE_HANDLE, AccessOp::ReadChr, &[], &mut out)
            .unwrap();

        assert_eq!(out.as_slice(), &[9, 8, 7, 6]);
    }

    #[test]
    fn test_malformed_write_rejected() {
        let (disp, mut store) = dispatcher();
        let mut out: Vec<u8, 23> = Vec::new();

        store.write_value(&[1, 2, 3, 4]).unwrap();
        let result = disp.access(
            &mut store,
            1,
            VALUE_HANDLE,
            AccessOp::WriteChr,
            &[1, 2, 3, 4, 5],
            &mut out,
        );

        assert_eq!(result, Err(AttError::InvalidAttributeValueLength));
        assert_eq!(store.value(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_descriptor_read() {
        let (disp, mut store) = dispatcher();
        let mut out: Vec<u8, 23> = Vec::new();

        disp.access(&mut store, 1, DESCR_HANDLE, AccessOp::ReadDsc, &[], &mut out)
            .unwrap();
        assert_eq!(out.as_slice(), b"Device RX/TX API");
    }

    #[test]
    fn test_descriptor_write_not_permitted() {
        let (disp, mut store) = dispatcher();
        let mut out: Vec<u8, 23> = Vec::new();

        let result = disp.access(&mut store, 1, DESCR_HANDLE, AccessOp::WriteDsc, &[0], &mut out);
        assert_eq!(result, Err(AttError::WriteNotPermitted));
        assert_eq!(store.description(), "Device RX/TX API");
    }

    #[test]
    fn test_canonical_bytes_after_rejected_descriptor_write() {
        let (disp, mut store) = dispatcher();
        let mut out: Vec<u8, 23> = Vec::new();

        let result = disp.access(
            &mut store,
            1,
            DESCR_HANDLE,
            AccessOp::WriteDsc,
            b"attacker",
            &mut out,
        );
        assert_eq!(result, Err(AttError::WriteNotPermitted));

        // The table restore after a rejection must source the descriptor
        // string, not the characteristic value, for the descriptor handle
        assert_eq!(
            disp.canonical_bytes(&store, DESCR_HANDLE),
            Some(&b"Device RX/TX API"[..])
        );
        assert_eq!(
            disp.canonical_bytes(&store, VALUE_HANDLE),
            Some(&[0u8, 0, 0, 0][..])
        );
        assert_eq!(disp.canonical_bytes(&store, 0x1234), None);
    }

    #[test]
    fn test_read_into_exhausted_buffer() {
        let (disp, mut store) = dispatcher();

        // Staging buffer too small for the 4-byte value
        let mut out: Vec<u8, 2> = Vec::new();
        let result = disp.access(&mut store, 1, VALUE_HANDLE, AccessOp::ReadChr, &[], &mut out);
        assert_eq!(result, Err(AttError::InsufficientResources));
    }

    #[test]
    fn test_unknown_handle_is_unlikely() {
        let (disp, mut store) = dispatcher();
        let mut out: Vec<u8, 23> = Vec::new();

        let result = disp.access(&mut store, 1, 0x1234, AccessOp::ReadChr, &[], &mut out);
        assert_eq!(result, Err(AttError::UnlikelyError));
    }

    #[test]
    fn test_mismatched_op_is_unlikely() {
        let (disp, mut store) = dispatcher();
        let mut out: Vec<u8, 23> = Vec::new();

        // Descriptor op aimed at the characteristic handle
        let result = disp.access(&mut store, 1, VALUE_HANDLE, AccessOp::ReadDsc, &[], &mut out);
        assert_eq!(result, Err(AttError::UnlikelyError));
    }
}
