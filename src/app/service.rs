//! Node service — the hexagonal core.
//!
//! [`NodeService`] owns the report scheduler and the power state machine and
//! exposes a clean, hardware-agnostic API: announce once, then alternate
//! [`run_cycle`](NodeService::run_cycle) and [`sleep`](NodeService::sleep)
//! forever.  All I/O flows through port traits injected at call sites,
//! making the entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────┐ ──▶ TransportPort
//!                 │      NodeService        │
//!   PowerPort ◀── │  Scheduler · PowerMgr   │ ──▶ EventSink
//!                 └────────────────────────┘
//! ```

use log::info;

use crate::config::NodeConfig;
use crate::events::EventCore;
use crate::power::{PowerManager, PowerState};
use crate::scheduler::{LIGHT_CHILD_ID, MOTION_CHILD_ID, ReportScheduler};

use super::events::AppEvent;
use super::ports::{DeviceType, EventSink, PowerPort, SensorPort, TransportPort, WakeSource};

/// Orchestrates one wake/report/sleep cycle at a time.
pub struct NodeService {
    scheduler: ReportScheduler,
    power: PowerManager,
    cycle_count: u64,
}

impl NodeService {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            scheduler: ReportScheduler::new(config),
            power: PowerManager::new(),
            cycle_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the node's sub-devices to the gateway.  Call once at boot,
    /// before the first cycle.
    pub fn announce(&mut self, transport: &mut impl TransportPort, sink: &mut impl EventSink) {
        transport.present(MOTION_CHILD_ID, DeviceType::MotionSensor);
        transport.present(LIGHT_CHILD_ID, DeviceType::LightSensor);
        sink.emit(&AppEvent::Started);
        info!("NodeService announced (motion child {}, light child {})",
            MOTION_CHILD_ID, LIGHT_CHILD_ID);
    }

    // ── Per-wake orchestration ────────────────────────────────

    /// Run one full ACTIVE period: scheduler decisions, PIR enable output,
    /// event emission.  Call once per wake, then [`sleep`](Self::sleep).
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`PowerPort`] — this avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn run_cycle(
        &mut self,
        core: &EventCore,
        hw: &mut (impl SensorPort + PowerPort),
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) {
        self.cycle_count += 1;

        let outcome = self.scheduler.run_cycle(core, hw, transport);

        if outcome.motion_reported {
            sink.emit(&AppEvent::MotionReported);
        }
        if let Some(telemetry) = outcome.telemetry {
            sink.emit(&AppEvent::Telemetry(telemetry));
        }

        // Apply the derived enable line every cycle; the driver treats
        // repeated sets as idempotent.
        hw.set_pir_enabled(outcome.pir_enabled);
    }

    /// Hand control to the power state machine until an interrupt fires.
    pub fn sleep(
        &mut self,
        transport: &mut impl TransportPort,
        hw: &mut impl PowerPort,
        sink: &mut impl EventSink,
    ) -> WakeSource {
        sink.emit(&AppEvent::EnteringSleep);
        let wake = self.power.sleep_until_wake(transport, hw);
        sink.emit(&AppEvent::WokeUp(wake));
        wake
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current power state.
    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    /// ACTIVE periods executed since boot.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Completed sleep/wake round trips since boot.
    pub fn sleep_cycles(&self) -> u32 {
        self.power.sleep_cycles()
    }
}
