//! Motion Node Firmware — Main Entry Point
//!
//! Hexagonal architecture around a battery-budgeted wake/sleep loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  HardwareAdapter      GatewayTransport      NvsAdapter       │
//! │  (Sensor+Power)       (TransportPort)       (Config+Addr)    │
//! │  LogEventSink                                                │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ────────────────        │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │             NodeService (pure logic)                 │    │
//! │  │  ReportScheduler · PowerManager                      │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! │                                                              │
//! │  EventCore (ISR-shared counters) ◀── tick / PIR interrupts   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use motion_node::adapters::device_id;
use motion_node::adapters::hardware::{HardwareAdapter, StdDelay};
use motion_node::adapters::log_sink::LogEventSink;
use motion_node::adapters::nvs::NvsAdapter;
use motion_node::adapters::transport::GatewayTransport;
use motion_node::app::ports::ConfigPort;
use motion_node::app::service::NodeService;
use motion_node::config::NodeConfig;
use motion_node::drivers::{hw_init, pir, wake_timer, watchdog::Watchdog};
use motion_node::error::Error as NodeError;
use motion_node::events::EVENT_CORE;
use motion_node::sensors::SensorHub;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  MotionNode v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Persistent state ───────────────────────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };

    // Factory-reset strap: held LOW at boot wipes address and config so
    // the node re-provisions from scratch.
    if pir::factory_reset_requested() {
        warn!("Factory reset strap detected");
        if let Err(e) = nvs.factory_reset() {
            warn!("Factory reset failed: {}", e);
        }
    }

    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("{} — using defaults", NodeError::from(e));
            NodeConfig::default()
        }
    };

    let address = nvs.load_address();
    info!(
        "Routing: node={} parent={} distance={} ({})",
        address.node_id,
        address.parent_id,
        address.distance,
        if address.is_provisioned() { "provisioned" } else { "awaiting assignment" },
    );

    let mac = device_id::read_mac();
    info!("Device ID: {}", device_id::device_id(&mac));

    // ── 4. Interrupt sources ──────────────────────────────────
    if let Err(e) = hw_init::init_isr_service() {
        log::error!("ISR service init failed: {} — continuing without PIR edge", e);
    }
    wake_timer::start(config.tick_period_secs);
    let watchdog = Watchdog::new();

    // ── 5. Construct adapters and the service core ────────────
    let sensor_hub = SensorHub::new(&config, StdDelay);
    let mut hw = HardwareAdapter::new(sensor_hub, config.tick_period_secs);
    let mut transport = GatewayTransport::new(address.node_id);
    let mut sink = LogEventSink::new();

    let mut service = NodeService::new(&config);
    service.announce(&mut transport, &mut sink);

    info!(
        "System ready: ~{}s ticks, telemetry every {} tick(s)",
        config.tick_period_secs,
        config.report_period_ticks(),
    );

    // ── 6. Wake/report/sleep loop ─────────────────────────────
    loop {
        service.run_cycle(&EVENT_CORE, &mut hw, &mut transport, &mut sink);
        watchdog.feed();
        service.sleep(&mut transport, &mut hw, &mut sink);
    }
}
