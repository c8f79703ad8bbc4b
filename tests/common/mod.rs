//! Common test utilities and setup for embedded tests
//!
//! Links the pieces every defmt-test binary needs: the global logger, the
//! panic handler, and the SoftDevice crate for its interrupt vectors and
//! critical section implementation.

pub use defmt_rtt as _; // global logger
// Use nrf-softdevice which provides both interrupt vectors and critical section
pub use nrf_softdevice as _;
pub use panic_probe as _; // panic handler
pub use {embassy_executor as _, embassy_nrf as _, embassy_sync as _, embassy_time as _};
