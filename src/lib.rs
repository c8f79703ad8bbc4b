#![no_std]

//! LuminaSet RGB BLE Peripheral Firmware Library
//!
//! This library provides the control-plane logic for the LuminaSet RGB
//! controller peripheral, organized into clear architectural layers:
//!
//! - `identity`: Fixed device configuration (name, UUIDs, manufacturer tag)
//! - `ble`: BLE protocol implementation (GAP lifecycle, GATT access)

pub mod ble;
pub mod identity;
