#![no_std]
#![no_main]

use defmt::*;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::{config::Config, interrupt};
use embassy_time::{Duration, Timer};
use heapless::Vec;
use nrf_softdevice::ble::{gatt_server, peripheral};
use nrf_softdevice::{raw, Config as SdConfig, Softdevice};
use panic_probe as _;

use luminaset_rgb_firmware::ble::advertising::{
    AdvController, AdvDriver, AdvError, AdvPayload, MAX_ADV_DATA_LEN,
};
use luminaset_rgb_firmware::ble::lifecycle::{GapEvent, Lifecycle};
use luminaset_rgb_firmware::ble::services::{Server, ServerEvent};
use luminaset_rgb_firmware::identity::{self, DeviceIdentity};

/// Advertising driver over the SoftDevice.
///
/// The lifecycle machine hands the assembled payload in here; the host
/// task picks it up and runs the actual advertise call, because starting
/// advertising with the SoftDevice means awaiting a connection.
struct StackAdvDriver {
    payload: Vec<u8, MAX_ADV_DATA_LEN>,
}

impl StackAdvDriver {
    const fn new() -> Self {
        Self { payload: Vec::new() }
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl AdvDriver for StackAdvDriver {
    fn set_payload(&mut self, payload: &AdvPayload) -> Result<(), AdvError> {
        self.payload.clear();
        self.payload
            .extend_from_slice(payload.as_slice())
            .map_err(|_| AdvError::SetPayloadFailed)
    }

    fn start(&mut self) -> Result<(), AdvError> {
        // The actual advertise call runs in ble_host_task, keyed off the
        // controller state; nothing to arm here.
        Ok(())
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting LuminaSet RGB firmware");

    // Configure nRF peripherals
    let mut nrf_config = Config::default();
    // Configure interrupt priorities to avoid SoftDevice reserved levels (0, 1, 4)
    nrf_config.gpiote_interrupt_priority = interrupt::Priority::P2;
    nrf_config.time_interrupt_priority = interrupt::Priority::P2;

    let _peripherals = embassy_nrf::init(nrf_config);

    info!("Embassy initialized, configuring SoftDevice...");

    let sd_config = SdConfig {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 247 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t { attr_tab_size: 1408 }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: Default::default(),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&sd_config);
    info!("SoftDevice enabled successfully!");

    // The GATT device-name attribute uses the same identity constant as the
    // advertising payload, keeping the two on-air names consistent.
    set_device_name(identity::DEVICE_NAME);

    let server = Server::new(sd).unwrap_or_else(|_| {
        defmt::panic!("Failed to register GATT schema");
    });
    info!("GATT schema registered");

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(ble_host_task(sd, server)));

    info!("System initialized, entering main loop");

    loop {
        Timer::after(Duration::from_secs(10)).await;
        info!("Heartbeat - system running");
    }
}

/// Set the GAP device-name attribute with open read access
fn set_device_name(name: &'static str) {
    let mut sec_mode: raw::ble_gap_conn_sec_mode_t = unsafe { core::mem::zeroed() };
    sec_mode.set_sm(1);
    sec_mode.set_lv(1);

    let ret = unsafe { raw::sd_ble_gap_device_name_set(&sec_mode, name.as_ptr(), name.len() as u16) };
    if ret != raw::NRF_SUCCESS {
        defmt::panic!("Failed to set device name: {}", ret);
    }
}

/// Host event loop: runs the lifecycle machine against the SoftDevice,
/// advertising whenever the machine asks for it and serving GATT while a
/// central is connected.
#[embassy_executor::task]
async fn ble_host_task(sd: &'static Softdevice, server: Server) {
    info!("BLE host task started");

    let controller = AdvController::new(StackAdvDriver::new(), DeviceIdentity::luminaset());
    let mut lifecycle = Lifecycle::new(controller);

    // The SoftDevice is up by the time this task runs
    lifecycle.on_sync();

    loop {
        if !lifecycle.is_advertising() {
            // Advertising setup failed; stay parked until an external
            // lifecycle event would re-arm it.
            Timer::after(Duration::from_secs(1)).await;
            continue;
        }

        let mut adv_buf: Vec<u8, MAX_ADV_DATA_LEN> = Vec::new();
        adv_buf
            .extend_from_slice(lifecycle.adv().driver().payload())
            .unwrap_or_else(|_| defmt::panic!("advertising payload overflow"));
        let adv_data: &[u8] = &adv_buf;

        let config = peripheral::Config {
            interval: 400, // 250ms
            timeout: None, // advertise until a central connects
            ..Default::default()
        };
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data,
            scan_data: &[],
        };

        match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => {
                let conn_handle = conn.handle().unwrap_or(0xFFFF);
                lifecycle.on_gap_event(GapEvent::Connected { conn_handle, status: 0 });

                // Serve GATT until the connection drops
                let disconnect = gatt_server::run(&conn, &server, |event| match event {
                    ServerEvent::ValueWritten { conn_handle } => {
                        debug!("BLE: value written on conn {}", conn_handle);
                    }
                })
                .await;
                debug!("BLE: connection ended: {:?}", Debug2Format(&disconnect));

                // BLE_HCI_REMOTE_USER_TERMINATED_CONNECTION
                lifecycle.on_gap_event(GapEvent::Disconnected { conn_handle, reason: 0x13 });
            }
            Err(peripheral::AdvertiseError::Timeout) => {
                lifecycle.on_gap_event(GapEvent::AdvertisingComplete);
            }
            Err(e) => {
                error!("BLE: advertising failed: {:?}", Debug2Format(&e));
                Timer::after(Duration::from_secs(1)).await;
                lifecycle.on_gap_event(GapEvent::AdvertisingComplete);
            }
        }
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}
