//! System configuration parameters
//!
//! All tunable parameters for the motion node.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Core node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Timing ---
    /// Wake-timer tick period (seconds).  ~8 s is the hardware default; the
    /// prescaler is approximate, not cycle-accurate.
    pub tick_period_secs: u16,
    /// Target periodic telemetry interval (seconds).  Converted to ticks by
    /// integer division, so intervals shorter than one tick truncate.
    pub report_interval_secs: u16,

    // --- Battery ---
    /// Battery voltage treated as 100% (millivolts, 2xAA fresh).
    pub battery_full_mv: u16,
    /// Battery voltage treated as 0% (millivolts, brown-out imminent).
    pub battery_empty_mv: u16,

    // --- Light sensor ---
    /// Settle time after powering the LDR divider, before sampling (ms).
    pub light_settle_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_period_secs: 8,
            report_interval_secs: 10,

            // Battery (2xAA alkaline through the divider)
            battery_full_mv: 3000,
            battery_empty_mv: 1900,

            // Light
            light_settle_ms: 50,
        }
    }
}

impl NodeConfig {
    /// Telemetry interval converted to ticks.
    ///
    /// Integer division: the 10 s default truncates to a single 8 s tick, so
    /// telemetry effectively fires every tick.
    pub fn report_period_ticks(&self) -> u16 {
        self.report_interval_secs / self.tick_period_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = NodeConfig::default();
        assert!(c.tick_period_secs > 0);
        assert!(c.report_interval_secs >= c.tick_period_secs);
        assert!(c.battery_full_mv > c.battery_empty_mv);
        assert!(c.light_settle_ms > 0);
    }

    #[test]
    fn report_period_truncates_to_whole_ticks() {
        let c = NodeConfig::default();
        // 10 s / 8 s tick = 1 tick, not 2.
        assert_eq!(c.report_period_ticks(), 1);

        let c = NodeConfig {
            report_interval_secs: 60,
            ..NodeConfig::default()
        };
        assert_eq!(c.report_period_ticks(), 7);
    }

    #[test]
    fn serde_roundtrip() {
        let c = NodeConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: NodeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.tick_period_secs, c2.tick_period_secs);
        assert_eq!(c.battery_full_mv, c2.battery_full_mv);
        assert_eq!(c.light_settle_ms, c2.light_settle_ms);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = NodeConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: NodeConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.report_interval_secs, c2.report_interval_secs);
        assert_eq!(c.battery_empty_mv, c2.battery_empty_mv);
    }
}
