//! Report scheduler.
//!
//! Runs once per wake cycle, before the next sleep transition, and makes two
//! independent decisions against the counter snapshot:
//!
//! 1. **Motion report** — drain the pending-motion signal and send a single
//!    "tripped" message.  Bursts that coalesced in the latch collapse into
//!    one report; nothing is ever lost or double-reported.
//! 2. **Periodic telemetry** — when the tick counter *equals* the scheduled
//!    report tick, read battery + light and send them.  Equality (not `>=`)
//!    is deliberate: a skipped tick silently drops that report rather than
//!    firing it late.
//!
//! The scheduler also derives the PIR enable line each cycle — enabled
//! exactly while no cooldown is running.  That output is stateless.

use log::{debug, info};

use crate::app::events::TelemetryData;
use crate::app::ports::{MetricKind, SensorPort, TransportPort};
use crate::config::NodeConfig;
use crate::events::EventCore;

/// Gateway child id of the motion sub-device.
pub const MOTION_CHILD_ID: u8 = 1;
/// Gateway child id of the light-level sub-device.
pub const LIGHT_CHILD_ID: u8 = 2;

/// What one scheduler pass did, for event emission and diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleOutcome {
    /// A motion report was sent this cycle.
    pub motion_reported: bool,
    /// Telemetry fired this cycle.
    pub telemetry: Option<TelemetryData>,
    /// Desired PIR enable line level (derived, not stored).
    pub pir_enabled: bool,
}

/// Per-wake report decisions.  Owns the main-path-only schedule state;
/// everything interrupt-shared stays in [`EventCore`].
pub struct ReportScheduler {
    /// Tick value at which the next periodic report is due.
    next_report_tick: u16,
    /// Report period in ticks (integer-truncated from seconds).
    period_ticks: u16,
    /// Last battery percent actually transmitted.  Unchanged values are
    /// suppressed to avoid spending radio energy on no news.
    last_battery_percent: Option<u8>,
}

impl ReportScheduler {
    pub fn new(config: &NodeConfig) -> Self {
        let period_ticks = config.report_period_ticks();
        info!(
            "ReportScheduler: period {} tick(s) ({} s requested, {} s tick)",
            period_ticks, config.report_interval_secs, config.tick_period_secs
        );
        Self {
            // First periodic report is due at the first tick.
            next_report_tick: 1,
            period_ticks,
            last_battery_percent: None,
        }
    }

    /// Tick value the next periodic report is scheduled for.
    pub fn next_report_tick(&self) -> u16 {
        self.next_report_tick
    }

    /// Run one scheduling pass.  Call exactly once per ACTIVE period.
    pub fn run_cycle(
        &mut self,
        core: &EventCore,
        sensors: &mut impl SensorPort,
        transport: &mut impl TransportPort,
    ) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();

        // ── 1. Motion report ──────────────────────────────────
        if core.take_motion_pending() {
            info!("Motion tripped — reporting to gateway");
            transport.send_binary_state(MOTION_CHILD_ID, true);
            outcome.motion_reported = true;
        }

        // ── 2. Periodic telemetry ─────────────────────────────
        let snap = core.snapshot();
        if snap.tick_count == self.next_report_tick {
            let battery = sensors.read_battery_percent();
            let light = sensors.read_light_level();

            let battery_sent = self.last_battery_percent != Some(battery);
            if battery_sent {
                transport.send_battery_percent(battery);
                self.last_battery_percent = Some(battery);
            } else {
                debug!("Battery unchanged at {}%, not resending", battery);
            }
            transport.send_metric(LIGHT_CHILD_ID, MetricKind::LightLevel, light);

            self.next_report_tick = self.next_report_tick.wrapping_add(self.period_ticks);
            outcome.telemetry = Some(TelemetryData {
                tick_count: snap.tick_count,
                battery_percent: battery,
                light_level: light,
                battery_sent,
            });
        }

        // ── 3. Derived PIR enable ─────────────────────────────
        outcome.pir_enabled = !snap.in_cooldown();

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::DeviceType;
    use crate::events::DEFAULT_COOLDOWN_TICKS;

    /// Test transport that records every outbound message.
    #[derive(Default)]
    struct RecordingTransport {
        binary: Vec<(u8, bool)>,
        metrics: Vec<(u8, MetricKind, u16)>,
        battery: Vec<u8>,
    }

    impl TransportPort for RecordingTransport {
        fn present(&mut self, _child_id: u8, _device: DeviceType) {}
        fn send_binary_state(&mut self, child_id: u8, tripped: bool) {
            self.binary.push((child_id, tripped));
        }
        fn send_metric(&mut self, child_id: u8, metric: MetricKind, value: u16) {
            self.metrics.push((child_id, metric, value));
        }
        fn send_battery_percent(&mut self, level: u8) {
            self.battery.push(level);
        }
        fn power_down(&mut self) {}
        fn power_up(&mut self) {}
    }

    struct FixedSensors {
        battery: u8,
        light: u16,
    }

    impl SensorPort for FixedSensors {
        fn read_battery_percent(&mut self) -> u8 {
            self.battery
        }
        fn read_light_level(&mut self) -> u16 {
            self.light
        }
    }

    fn fixture() -> (EventCore, ReportScheduler, FixedSensors, RecordingTransport) {
        let core = EventCore::new(DEFAULT_COOLDOWN_TICKS);
        let sched = ReportScheduler::new(&NodeConfig::default());
        let sensors = FixedSensors {
            battery: 87,
            light: 42,
        };
        (core, sched, sensors, RecordingTransport::default())
    }

    #[test]
    fn motion_drained_exactly_once() {
        let (core, mut sched, mut sensors, mut tx) = fixture();
        core.on_tick();
        assert!(core.on_motion());

        let out = sched.run_cycle(&core, &mut sensors, &mut tx);
        assert!(out.motion_reported);
        assert_eq!(tx.binary, vec![(MOTION_CHILD_ID, true)]);

        // Nothing pending on the second pass.
        core.on_tick();
        let out = sched.run_cycle(&core, &mut sensors, &mut tx);
        assert!(!out.motion_reported);
        assert_eq!(tx.binary.len(), 1);
    }

    #[test]
    fn burst_collapses_to_single_report() {
        let (core, mut sched, mut sensors, mut tx) = fixture();
        core.on_tick();
        assert!(core.on_motion());
        // Suppressed re-triggers inside the cooldown.
        assert!(!core.on_motion());
        assert!(!core.on_motion());

        sched.run_cycle(&core, &mut sensors, &mut tx);
        assert_eq!(tx.binary.len(), 1);
    }

    #[test]
    fn telemetry_fires_on_equality_and_advances() {
        let (core, mut sched, mut sensors, mut tx) = fixture();

        // Default config: 10 s / 8 s truncates to a 1-tick period, so
        // every tick is a report tick.
        for expected_tick in 1..=3u16 {
            core.on_tick();
            let out = sched.run_cycle(&core, &mut sensors, &mut tx);
            let t = out.telemetry.expect("telemetry due every tick");
            assert_eq!(t.tick_count, expected_tick);
            assert_eq!(sched.next_report_tick(), expected_tick + 1);
        }
        assert_eq!(tx.metrics.len(), 3);
    }

    #[test]
    fn skipped_tick_drops_report_silently() {
        let (core, mut sched, mut sensors, mut tx) = fixture();

        // Two ticks pass before the main path runs: tick_count is now 2 but
        // the report was scheduled for tick 1.  Equality fails — dropped.
        core.on_tick();
        core.on_tick();
        let out = sched.run_cycle(&core, &mut sensors, &mut tx);
        assert!(out.telemetry.is_none());
        assert!(tx.metrics.is_empty());
        // The schedule does not self-heal; that report is gone.
        assert_eq!(sched.next_report_tick(), 1);
    }

    #[test]
    fn unchanged_battery_is_suppressed() {
        let (core, mut sched, mut sensors, mut tx) = fixture();

        core.on_tick();
        sched.run_cycle(&core, &mut sensors, &mut tx);
        core.on_tick();
        sched.run_cycle(&core, &mut sensors, &mut tx);
        // Two telemetry fires, one battery send.
        assert_eq!(tx.metrics.len(), 2);
        assert_eq!(tx.battery, vec![87]);

        sensors.battery = 86;
        core.on_tick();
        let out = sched.run_cycle(&core, &mut sensors, &mut tx);
        assert!(out.telemetry.unwrap().battery_sent);
        assert_eq!(tx.battery, vec![87, 86]);
    }

    #[test]
    fn pir_enable_tracks_cooldown() {
        let (core, mut sched, mut sensors, mut tx) = fixture();

        // Settle window still armed at boot.
        let out = sched.run_cycle(&core, &mut sensors, &mut tx);
        assert!(!out.pir_enabled);

        core.on_tick();
        let out = sched.run_cycle(&core, &mut sensors, &mut tx);
        assert!(out.pir_enabled);

        assert!(core.on_motion());
        let out = sched.run_cycle(&core, &mut sensors, &mut tx);
        assert!(!out.pir_enabled);
    }
}
