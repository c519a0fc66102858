//! GPIO / peripheral pin assignments for the motion node main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// PIR motion sensor (HC-SR501 class, 3.3 V retrofit)
// ---------------------------------------------------------------------------

/// Digital input: PIR output, rising edge on detection.  RTC-capable GPIO so
/// the edge can wake the CPU from light sleep.
pub const PIR_DATA_GPIO: i32 = 8;
/// Digital output: powers the PIR front-end (active HIGH).  Driven LOW while
/// the debounce cooldown is running so the element can settle unpowered.
pub const PIR_ENABLE_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Sensors — Analog (ADC1)
// ---------------------------------------------------------------------------

/// Battery voltage through a 1:2 resistive divider.
/// ADC1 channel 4 (GPIO 5 on ESP32-S3).
pub const BATTERY_ADC_GPIO: i32 = 5;
/// Divider ratio between battery terminal and ADC pin.
pub const BATTERY_DIVIDER: u32 = 2;

/// LDR photoresistor, low side of a 10 kΩ divider.
/// ADC1 channel 5 (GPIO 6 on ESP32-S3).
pub const LIGHT_ADC_GPIO: i32 = 6;
/// Digital output: powers the LDR divider only while sampling.
pub const LIGHT_POWER_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Provisioning / service
// ---------------------------------------------------------------------------

/// Digital input with pull-up.  Held LOW at boot = factory reset: the
/// persisted node id, parent id, and distance are invalidated.
pub const FACTORY_RESET_GPIO: i32 = 10;
