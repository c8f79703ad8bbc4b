//! Connection Lifecycle State Machine
//!
//! Consumes stack-level lifecycle events (reset, sync, connect, disconnect,
//! advertising-complete) and drives the advertising controller so the
//! peripheral is always advertising when not connected. The state is an
//! explicit enum rather than being implied by event ordering, so illegal
//! sequences are observable instead of silently tolerated.

use defmt::{debug, error, info, warn, Format};

use crate::ble::advertising::{AdvController, AdvDriver};

/// Lifecycle states of the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum LifecycleState {
    /// Before stack sync, or after an advertising setup failure
    Idle,
    /// Discoverable and connectable, waiting for a central
    Advertising,
    /// A central is attached; advertising is stopped inside the stack
    Connected,
}

/// GAP events delivered by the host stack
#[derive(Debug, Clone, Copy, Format)]
pub enum GapEvent {
    /// Connection attempt finished; status 0 means a peer attached
    Connected { conn_handle: u16, status: u8 },
    /// An attached peer dropped the link
    Disconnected { conn_handle: u16, reason: u8 },
    /// The current advertising run expired inside the stack
    AdvertisingComplete,
    /// Any GAP event type this firmware does not act on
    Other { kind: u8 },
}

/// The lifecycle state machine.
///
/// Every event that removes the peripheral from an advertising state
/// (disconnect, failed connect, advertising expiry) re-enters advertising
/// through [`Lifecycle::on_sync`]. If advertising setup itself fails, the
/// error is logged and the machine stays in `Idle` until the next lifecycle
/// event triggers another sync.
pub struct Lifecycle<D: AdvDriver> {
    state: LifecycleState,
    adv: AdvController<D>,
}

impl<D: AdvDriver> Lifecycle<D> {
    /// Create a machine in `Idle`, before the first stack sync
    pub const fn new(adv: AdvController<D>) -> Self {
        Self {
            state: LifecycleState::Idle,
            adv,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether the advertising controller reports advertising active
    pub fn is_advertising(&self) -> bool {
        self.adv.is_advertising()
    }

    /// Access the advertising controller
    pub fn adv(&self) -> &AdvController<D> {
        &self.adv
    }

    /// Stack reset: drop back to `Idle` and wait for the next sync.
    ///
    /// No recovery action is taken here; the stack re-invokes sync on its
    /// own once it is back up.
    pub fn on_reset(&mut self, reason: i32) {
        error!("LIFECYCLE: stack reset, reason={}", reason);
        self.state = LifecycleState::Idle;
    }

    /// Stack sync: build the payload and start advertising indefinitely
    pub fn on_sync(&mut self) {
        match self.adv.restart() {
            Ok(()) => {
                info!("LIFECYCLE: advertising started");
                self.state = LifecycleState::Advertising;
            }
            Err(e) => {
                // Deliberately no retry loop: the next sync or disconnect
                // event re-enters here.
                error!("LIFECYCLE: failed to start advertising: {:?}", e);
                self.state = LifecycleState::Idle;
            }
        }
    }

    /// Apply one GAP event
    pub fn on_gap_event(&mut self, event: GapEvent) {
        match event {
            GapEvent::Connected { conn_handle, status: 0 } => {
                if self.state != LifecycleState::Advertising {
                    warn!("LIFECYCLE: connect while {:?}", self.state);
                }
                info!("LIFECYCLE: central connected, conn={}", conn_handle);
                self.adv.connection_established();
                self.state = LifecycleState::Connected;
            }
            GapEvent::Connected { status, .. } => {
                // The attempt failed mid-negotiation and left no link
                error!("LIFECYCLE: connection failed, status={}", status);
                self.on_sync();
            }
            GapEvent::Disconnected { conn_handle, reason } => {
                if self.state != LifecycleState::Connected {
                    warn!("LIFECYCLE: disconnect while {:?}", self.state);
                }
                warn!(
                    "LIFECYCLE: central disconnected, conn={}, reason={}",
                    conn_handle, reason
                );
                self.on_sync();
            }
            GapEvent::AdvertisingComplete => {
                info!("LIFECYCLE: advertising completed, restarting");
                self.on_sync();
            }
            GapEvent::Other { kind } => {
                debug!("LIFECYCLE: unhandled GAP event {}", kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::advertising::{AdvError, AdvPayload};
    use crate::identity::DeviceIdentity;

    const TEST_IDENTITY: DeviceIdentity = DeviceIdentity {
        name: "RGB-Test",
        manufacturer_tag: b"LS",
    };

    struct MockDriver {
        starts: usize,
        fail_start: bool,
    }

    impl AdvDriver for MockDriver {
        fn set_payload(&mut self, _payload: &AdvPayload) -> Result<(), AdvError> {
            Ok(())
        }

        fn start(&mut self) -> Result<(), AdvError> {
            if self.fail_start {
                return Err(AdvError::StartFailed);
            }
            self.starts += 1;
            Ok(())
        }
    }

    fn machine() -> Lifecycle<MockDriver> {
        let driver = MockDriver {
            starts: 0,
            fail_start: false,
        };
        Lifecycle::new(AdvController::new(driver, TEST_IDENTITY))
    }

    #[test]
    fn test_sync_connect_disconnect_sequence() {
        let mut lc = machine();
        assert_eq!(lc.state(), LifecycleState::Idle);

        lc.on_sync();
        assert_eq!(lc.state(), LifecycleState::Advertising);
        assert!(lc.is_advertising());

        lc.on_gap_event(GapEvent::Connected { conn_handle: 1, status: 0 });
        assert_eq!(lc.state(), LifecycleState::Connected);
        assert!(!lc.is_advertising());

        lc.on_gap_event(GapEvent::Disconnected { conn_handle: 1, reason: 0x13 });
        assert_eq!(lc.state(), LifecycleState::Advertising);
        assert!(lc.is_advertising());
    }

    #[test]
    fn test_failed_connect_rearms_advertising() {
        let mut lc = machine();
        lc.on_sync();
        let starts_before = lc.adv().driver().starts;

        lc.on_gap_event(GapEvent::Connected { conn_handle: 1, status: 0x3E });
        assert_eq!(lc.state(), LifecycleState::Advertising);
        assert!(lc.is_advertising());
        assert_eq!(lc.adv().driver().starts, starts_before + 1);
    }

    #[test]
    fn test_advertising_complete_restarts() {
        let mut lc = machine();
        lc.on_sync();
        let starts_before = lc.adv().driver().starts;

        lc.on_gap_event(GapEvent::AdvertisingComplete);
        assert_eq!(lc.state(), LifecycleState::Advertising);
        assert_eq!(lc.adv().driver().starts, starts_before + 1);
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut lc = machine();
        lc.on_sync();
        lc.on_sync();
        lc.on_sync();

        assert_eq!(lc.state(), LifecycleState::Advertising);
        assert!(lc.is_advertising());
        assert_eq!(lc.adv().driver().starts, 3);
    }

    #[test]
    fn test_reset_drops_to_idle() {
        let mut lc = machine();
        lc.on_sync();

        lc.on_reset(-1);
        assert_eq!(lc.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_setup_failure_waits_for_next_event() {
        let driver = MockDriver {
            starts: 0,
            fail_start: true,
        };
        let mut lc = Lifecycle::new(AdvController::new(driver, TEST_IDENTITY));

        lc.on_sync();
        assert_eq!(lc.state(), LifecycleState::Idle);
        assert!(!lc.is_advertising());
        // No retry happened on its own
        assert_eq!(lc.adv().driver().starts, 0);
    }

    #[test]
    fn test_unknown_event_ignored() {
        let mut lc = machine();
        lc.on_sync();
        let starts_before = lc.adv().driver().starts;

        lc.on_gap_event(GapEvent::Other { kind: 42 });
        assert_eq!(lc.state(), LifecycleState::Advertising);
        assert_eq!(lc.adv().driver().starts, starts_before);
    }

    #[test]
    fn test_disconnect_while_idle_still_rearms() {
        let mut lc = machine();

        // Never synced, yet a stray disconnect must not leave the device
        // undiscoverable.
        lc.on_gap_event(GapEvent::Disconnected { conn_handle: 7, reason: 0x08 });
        assert_eq!(lc.state(), LifecycleState::Advertising);
        assert!(lc.is_advertising());
    }
}
