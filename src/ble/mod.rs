//! BLE Protocol Implementation
//!
//! Contains all BLE-related functionality for the peripheral: the GAP
//! connection lifecycle, advertising management and GATT attribute access.
//! All lifecycle and GATT events are delivered serially from the single
//! BLE host task; none of these modules block or spawn work of their own.

pub mod advertising;
pub mod attributes;
pub mod gatt;
pub mod lifecycle;
pub mod services;
