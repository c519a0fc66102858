//! Sensor subsystem — individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns both analog drivers and implements [`SensorPort`] so the
//! report scheduler can sample without caring which ADC channel backs what.

pub mod battery;
pub mod light;

use embedded_hal::delay::DelayNs;

use crate::app::ports::SensorPort;
use crate::config::NodeConfig;
use battery::BatterySensor;
use light::LightSensor;

/// Aggregates all sensor drivers behind the [`SensorPort`] boundary.
pub struct SensorHub<D: DelayNs> {
    battery: BatterySensor,
    light: LightSensor,
    delay: D,
}

impl<D: DelayNs> SensorHub<D> {
    /// Construct a new hub.  Calibration windows come from the persisted
    /// node config; the delay source is owned here so the light sensor's
    /// settle wait works on both targets.
    pub fn new(config: &NodeConfig, delay: D) -> Self {
        Self {
            battery: BatterySensor::new(config.battery_full_mv, config.battery_empty_mv),
            light: LightSensor::new(config.light_settle_ms),
            delay,
        }
    }
}

impl<D: DelayNs> SensorPort for SensorHub<D> {
    fn read_battery_percent(&mut self) -> u8 {
        self.battery.read().percent
    }

    fn read_light_level(&mut self) -> u16 {
        self.light.read(&mut self.delay).level
    }
}
