//! GATT Server Services Module
//!
//! Registers the fixed attribute schema with the SoftDevice and routes
//! server write events through the GATT access dispatcher. The schema is
//! one primary service with a single 4-byte data characteristic
//! (read|write|notify) carrying a read-only user-description descriptor.
//! Notify is declared in the schema but no notification dispatch exists.

use core::cell::RefCell;

use defmt::{debug, info, warn, Format};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, RegisterError, WriteOp};
use nrf_softdevice::ble::{Connection, SecurityMode, Uuid};
use nrf_softdevice::Softdevice;

use crate::ble::attributes::AttributeStore;
use crate::ble::gatt::{AccessOp, GattDispatcher};
use crate::identity;

/// Events surfaced from the GATT server connection loop
#[derive(Debug, Format)]
pub enum ServerEvent {
    /// The data characteristic value was replaced by the central
    ValueWritten { conn_handle: u16 },
}

/// Global attribute store instance.
///
/// SoftDevice write callbacks and the host task both funnel through the
/// single BLE host executor thread, so a critical section is all the
/// discipline the store needs. Anything moving attribute access off that
/// thread must add real mutual exclusion here.
static ATTRIBUTE_STORE: Mutex<CriticalSectionRawMutex, RefCell<AttributeStore>> =
    Mutex::new(RefCell::new(AttributeStore::new(identity::CHARACTERISTIC_DESCRIPTION)));

/// Access the global attribute store
pub fn with_store<T, F>(f: F) -> T
where
    F: FnOnce(&mut AttributeStore) -> T,
{
    ATTRIBUTE_STORE.lock(|store| f(&mut store.borrow_mut()))
}

/// Main GATT server implementation
pub struct Server {
    dispatcher: GattDispatcher,
}

impl Server {
    /// Register the fixed schema and build the dispatcher over the
    /// assigned handles. Each registered attribute is logged for
    /// diagnostics.
    pub fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let mut service_builder = ServiceBuilder::new(sd, Uuid::new_128(&identity::SERVICE_UUID))?;
        info!("GATT: service registered");

        let initial = with_store(|store| *store.value());
        let attr = Attribute::new(&initial[..]);
        let metadata = Metadata::new(Properties::new().read().write().notify());
        let mut characteristic_builder =
            service_builder.add_characteristic(Uuid::new_128(&identity::CHARACTERISTIC_UUID), attr, metadata)?;

        // Read-only at the table level too, so descriptor writes are
        // refused by the stack before they can touch the attribute table
        let descriptor = characteristic_builder.add_descriptor(
            Uuid::new_16(identity::USER_DESCRIPTION_UUID),
            Attribute::new(identity::CHARACTERISTIC_DESCRIPTION.as_bytes())
                .write_security(SecurityMode::NoAccess),
        )?;

        let characteristic_handles = characteristic_builder.build();
        let _service_handle = service_builder.build();

        info!(
            "GATT: characteristic registered, value_handle={}",
            characteristic_handles.value_handle
        );
        info!("GATT: descriptor registered, handle={}", descriptor.handle());

        Ok(Self {
            dispatcher: GattDispatcher::new(characteristic_handles.value_handle, descriptor.handle()),
        })
    }

    /// Rewrite the SoftDevice attribute table from the store after a
    /// rejected write, so the table never exposes bytes the store did
    /// not accept.
    fn restore_table_value(&self, handle: u16) {
        let sd = unsafe { Softdevice::steal() };
        let restored = with_store(|store| {
            match self.dispatcher.canonical_bytes(store, handle) {
                Some(bytes) => gatt_server::set_value(sd, handle, bytes).is_ok(),
                None => false,
            }
        });
        if !restored {
            warn!("GATT: failed to restore attribute table value for handle {}", handle);
        }
    }
}

impl gatt_server::Server for Server {
    type Event = ServerEvent;

    fn on_write(
        &self,
        conn: &Connection,
        handle: u16,
        _op: WriteOp,
        offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        let conn_handle = conn.handle().unwrap_or(0);

        let op = if handle == self.dispatcher.value_handle() {
            AccessOp::WriteChr
        } else if handle == self.dispatcher.descr_handle() {
            AccessOp::WriteDsc
        } else {
            debug!("GATT: write to unknown handle {}", handle);
            return None;
        };

        // The schema has no partial writes
        if offset != 0 {
            warn!("GATT: rejected offset write at {}", offset);
            self.restore_table_value(handle);
            return None;
        }

        let result = with_store(|store| {
            let mut staging: Vec<u8, 0> = Vec::new();
            self.dispatcher
                .access(store, conn_handle, handle, op, data, &mut staging)
        });

        match result {
            Ok(()) => Some(ServerEvent::ValueWritten { conn_handle }),
            Err(e) => {
                warn!("GATT: write rejected: {:?}", e);
                self.restore_table_value(handle);
                None
            }
        }
    }
}
