//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and the sleep/wake machinery, exposing them
//! through [`SensorPort`] and [`PowerPort`].  This is the only module in
//! the system that calls `esp_light_sleep_start`.  On non-espidf targets
//! the underlying drivers use cfg-gated simulation stubs and the "sleep"
//! is a short thread sleep followed by a hand-fired tick.
//!
//! ## Light-sleep wake plumbing
//!
//! The RTC timer and the PIR data pin are both armed as wake sources.  On
//! a timer wake, esp_timer catches up after resume and dispatches the
//! overdue wake-timer callback, which runs the tick handler.  On a GPIO
//! wake the level-triggered wakeup may race the edge ISR, so the motion
//! handler is invoked directly after resume — the debounce cooldown
//! coalesces the duplicate if the ISR fired too.

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::app::ports::{PowerPort, SensorPort, WakeSource};
use crate::drivers::pir;
use crate::sensors::SensorHub;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::pins;

/// Blocking delay source backed by the OS scheduler.
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    sensor_hub: SensorHub<StdDelay>,
    tick_period_secs: u16,
    peripherals_down: bool,
}

impl HardwareAdapter {
    pub fn new(sensor_hub: SensorHub<StdDelay>, tick_period_secs: u16) -> Self {
        Self {
            sensor_hub,
            tick_period_secs,
            peripherals_down: false,
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_battery_percent(&mut self) -> u8 {
        self.sensor_hub.read_battery_percent()
    }

    fn read_light_level(&mut self) -> u16 {
        self.sensor_hub.read_light_level()
    }
}

// ── PowerPort implementation ──────────────────────────────────

impl PowerPort for HardwareAdapter {
    fn set_pir_enabled(&mut self, enabled: bool) {
        pir::set_enabled(enabled);
    }

    fn disable_peripherals(&mut self) {
        if self.peripherals_down {
            return;
        }
        self.peripherals_down = true;
        debug!("power: peripherals down");
    }

    fn restore_peripherals(&mut self) {
        // Idempotent: restoring without a prior disable is a no-op, and
        // the hardware ends up in the same configuration either way.
        if !self.peripherals_down {
            return;
        }
        self.peripherals_down = false;
        debug!("power: peripherals restored");
    }

    #[cfg(target_os = "espidf")]
    fn sleep_until_wake(&mut self) -> WakeSource {
        // SAFETY: All sleep-configuration calls happen from the single
        // main task; the PIR pin was configured as an input in hw_init.
        unsafe {
            esp_sleep_enable_timer_wakeup(self.tick_period_secs as u64 * 1_000_000);
            gpio_wakeup_enable(pins::PIR_DATA_GPIO, gpio_int_type_t_GPIO_INTR_HIGH_LEVEL);
            esp_sleep_enable_gpio_wakeup();

            esp_light_sleep_start();

            match esp_sleep_get_wakeup_cause() {
                c if c == esp_sleep_source_t_ESP_SLEEP_WAKEUP_GPIO => {
                    // Level wake may have out-raced the edge ISR; latch the
                    // event by hand.  A duplicate falls into the cooldown.
                    crate::events::motion_isr_handler();
                    WakeSource::Motion
                }
                _ => WakeSource::Tick,
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn sleep_until_wake(&mut self) -> WakeSource {
        // Milliseconds stand in for seconds so simulation runs in real time.
        std::thread::sleep(std::time::Duration::from_millis(self.tick_period_secs as u64));
        crate::drivers::wake_timer::sim_fire_tick();
        WakeSource::Tick
    }
}
