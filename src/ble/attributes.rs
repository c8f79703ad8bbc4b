//! Attribute Store
//!
//! Owns the value storage behind the fixed GATT schema: the 4-byte data
//! characteristic value and the static user-description string. The store
//! is a plain owned value so unit tests can construct isolated instances;
//! the firmware glue in `services` wraps the single live instance behind a
//! critical-section accessor.

use defmt::Format;

/// Fixed length of the data characteristic value (bytes)
pub const CHR_VALUE_LEN: usize = 4;

/// Attribute store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum StoreError {
    /// Write payload length does not match the fixed value length
    InvalidValueLength,
}

/// Value storage for the fixed attribute schema
pub struct AttributeStore {
    /// Data characteristic value, replaced wholesale on every valid write
    value: [u8; CHR_VALUE_LEN],
    /// Read-only user description for the data characteristic
    description: &'static str,
}

impl AttributeStore {
    /// Create a store with a zeroed value and the given description
    pub const fn new(description: &'static str) -> Self {
        Self {
            value: [0; CHR_VALUE_LEN],
            description,
        }
    }

    /// Current characteristic value
    pub fn value(&self) -> &[u8; CHR_VALUE_LEN] {
        &self.value
    }

    /// Replace the characteristic value wholesale.
    ///
    /// Partial or offset writes are not supported; anything other than an
    /// exact 4-byte payload is rejected and the stored value is untouched.
    pub fn write_value(&mut self, data: &[u8]) -> Result<(), StoreError> {
        if data.len() != CHR_VALUE_LEN {
            return Err(StoreError::InvalidValueLength);
        }
        self.value.copy_from_slice(data);
        Ok(())
    }

    /// User-description string for the data characteristic
    pub fn description(&self) -> &'static str {
        self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_round_trip() {
        let mut store = AttributeStore::new("test descriptor");

        assert_eq!(store.value(), &[0, 0, 0, 0]);

        store.write_value(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(store.value(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_write_length_validation() {
        let mut store = AttributeStore::new("test descriptor");
        store.write_value(&[1, 2, 3, 4]).unwrap();

        // Too short, too long and empty writes must all leave the value alone
        for bad in [&[][..], &[1][..], &[1, 2, 3][..], &[1, 2, 3, 4, 5][..]] {
            assert_eq!(store.write_value(bad), Err(StoreError::InvalidValueLength));
            assert_eq!(store.value(), &[1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_description_is_static() {
        let store = AttributeStore::new("Device RX/TX API");
        assert_eq!(store.description(), "Device RX/TX API");
    }
}
