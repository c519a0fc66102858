//! Battery voltage sensing through a resistive divider.
//!
//! The cell voltage is halved by a 1:2 divider before the ADC pin, sampled
//! through ADC1, converted back to millivolts, then mapped onto a 0–100 %
//! window between the configured empty and full voltages.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1_CH4 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

use crate::pins;

static SIM_BATTERY_ADC: AtomicU16 = AtomicU16::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_battery_adc(raw: u16) {
    SIM_BATTERY_ADC.store(raw, Ordering::Relaxed);
}

/// 12-bit ADC at 12 dB attenuation spans roughly 0–3100 mV on the S3.
const ADC_FULL_SCALE_MV: u32 = 3100;
const ADC_FULL_SCALE_RAW: u32 = 4095;

#[derive(Debug, Clone, Copy)]
pub struct BatteryReading {
    pub raw: u16,
    pub millivolts: u16,
    pub percent: u8,
}

pub struct BatterySensor {
    full_mv: u16,
    empty_mv: u16,
}

impl BatterySensor {
    pub fn new(full_mv: u16, empty_mv: u16) -> Self {
        Self { full_mv, empty_mv }
    }

    pub fn read(&self) -> BatteryReading {
        let raw = self.read_adc();
        let millivolts = self.raw_to_millivolts(raw);
        let percent = self.millivolts_to_percent(millivolts);
        BatteryReading {
            raw,
            millivolts,
            percent,
        }
    }

    // A failed ADC read degrades to an empty reading rather than aborting
    // the report cycle; the gateway sees 0 % and can alert on it.
    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        match hw_init::adc1_read(hw_init::ADC1_CH_BATTERY) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("battery: {}", crate::error::Error::from(e));
                0
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_BATTERY_ADC.load(Ordering::Relaxed)
    }

    /// Pin millivolts times the divider ratio gives cell millivolts.
    fn raw_to_millivolts(&self, raw: u16) -> u16 {
        let pin_mv = raw as u32 * ADC_FULL_SCALE_MV / ADC_FULL_SCALE_RAW;
        (pin_mv * pins::BATTERY_DIVIDER).min(u16::MAX as u32) as u16
    }

    fn millivolts_to_percent(&self, mv: u16) -> u8 {
        if mv <= self.empty_mv {
            return 0;
        }
        if mv >= self.full_mv {
            return 100;
        }
        let span = (self.full_mv - self.empty_mv) as u32;
        let above = (mv - self.empty_mv) as u32;
        (above * 100 / span) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor() -> BatterySensor {
        BatterySensor::new(3000, 1900)
    }

    #[test]
    fn full_cell_clamps_to_100() {
        assert_eq!(sensor().millivolts_to_percent(3000), 100);
        assert_eq!(sensor().millivolts_to_percent(3400), 100);
    }

    #[test]
    fn empty_cell_clamps_to_0() {
        assert_eq!(sensor().millivolts_to_percent(1900), 0);
        assert_eq!(sensor().millivolts_to_percent(1200), 0);
    }

    #[test]
    fn midpoint_maps_linearly() {
        // 2450 mV is exactly halfway through the 1900..3000 window.
        assert_eq!(sensor().millivolts_to_percent(2450), 50);
    }

    #[test]
    fn divider_ratio_restores_cell_voltage() {
        // Raw 2000/4095 ≈ 1514 mV at the pin, ×2 divider ≈ 3028 mV cell.
        let mv = sensor().raw_to_millivolts(2000);
        assert!((3020..=3040).contains(&mv), "got {mv}");
    }

    #[test]
    fn injected_adc_flows_through_read() {
        sim_set_battery_adc(2000);
        let reading = sensor().read();
        assert_eq!(reading.raw, 2000);
        assert_eq!(reading.percent, 100);
    }
}
