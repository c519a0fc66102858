//! LDR ambient light sensing with switched divider power.
//!
//! The photoresistor divider draws current whenever powered, so its high
//! side hangs off a GPIO that is only driven HIGH for the duration of a
//! sample.  An RAII guard de-powers the divider on every exit path, and a
//! short settle delay lets the divider voltage stabilise before sampling.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1_CH5 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicBool`/`AtomicU16` pair so tests
//! can inject raw values and assert the power line was cycled.

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use embedded_hal::delay::DelayNs;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

#[cfg(target_os = "espidf")]
use crate::pins;

static SIM_LIGHT_ADC: AtomicU16 = AtomicU16::new(0);
static SIM_LIGHT_POWERED: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_light_adc(raw: u16) {
    SIM_LIGHT_ADC.store(raw, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_light_powered() -> bool {
    SIM_LIGHT_POWERED.load(Ordering::Relaxed)
}

const ADC_FULL_SCALE_RAW: u32 = 4095;

/// Drives the LDR divider power line HIGH on construction and LOW on drop.
struct PowerGuard;

impl PowerGuard {
    fn on() -> Self {
        set_power(true);
        PowerGuard
    }
}

impl Drop for PowerGuard {
    fn drop(&mut self) {
        set_power(false);
    }
}

#[cfg(target_os = "espidf")]
fn set_power(on: bool) {
    hw_init::gpio_write(pins::LIGHT_POWER_GPIO, on);
}

#[cfg(not(target_os = "espidf"))]
fn set_power(on: bool) {
    SIM_LIGHT_POWERED.store(on, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
pub struct LightReading {
    pub raw: u16,
    /// Normalised brightness, 0 (dark) to 100 (saturated).
    pub level: u16,
}

pub struct LightSensor {
    settle_ms: u32,
}

impl LightSensor {
    pub fn new(settle_ms: u32) -> Self {
        Self { settle_ms }
    }

    /// Power the divider, wait for it to settle, sample, de-power.
    pub fn read(&self, delay: &mut impl DelayNs) -> LightReading {
        let _power = PowerGuard::on();
        delay.delay_ms(self.settle_ms);
        let raw = self.read_adc();
        LightReading {
            raw,
            level: raw_to_level(raw),
        }
    }

    // A failed ADC read degrades to a dark reading; the next cycle retries.
    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        match hw_init::adc1_read(hw_init::ADC1_CH_LIGHT) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("light: {}", crate::error::Error::from(e));
                0
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_LIGHT_ADC.load(Ordering::Relaxed)
    }
}

fn raw_to_level(raw: u16) -> u16 {
    (raw as u32 * 100 / ADC_FULL_SCALE_RAW) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopDelay;
    impl DelayNs for NoopDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Delay impl that records whether the divider was powered while waiting.
    struct PowerProbe {
        powered_during_settle: bool,
    }
    impl DelayNs for PowerProbe {
        fn delay_ns(&mut self, _ns: u32) {
            self.powered_during_settle = sim_light_powered();
        }
    }

    #[test]
    fn level_maps_full_scale_to_100() {
        assert_eq!(raw_to_level(0), 0);
        assert_eq!(raw_to_level(4095), 100);
        assert_eq!(raw_to_level(2048), 50);
    }

    #[test]
    fn divider_powered_only_during_sample() {
        let mut probe = PowerProbe {
            powered_during_settle: false,
        };
        sim_set_light_adc(1000);
        let reading = LightSensor::new(50).read(&mut probe);
        assert_eq!(reading.raw, 1000);
        assert!(probe.powered_during_settle);
        assert!(!sim_light_powered(), "divider left powered after read");
    }
}
