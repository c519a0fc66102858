//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService (domain)
//! ```
//!
//! Driven adapters (radio transport, sensor front-end, power control,
//! storage) implement these traits.  The scheduling core consumes them via
//! generics, so the domain never touches hardware directly and the whole
//! wake/report cycle runs under test with mock adapters.

use crate::config::NodeConfig;

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain → gateway)
// ───────────────────────────────────────────────────────────────

/// Logical sub-device types announced to the gateway at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// Binary tripped/untripped motion sensor.
    MotionSensor,
    /// Ambient light level sensor.
    LightSensor,
}

/// Kinds of generic telemetry metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Ambient light level, 0–100.
    LightLevel,
}

/// Write-side port to the home-automation gateway.
///
/// Sends are fire-once per cycle: the scheduling core never inspects the
/// outcome.  An adapter may retry or buffer internally, invisibly to the
/// core.
pub trait TransportPort {
    /// Register one logical sub-device (called once per child at boot).
    fn present(&mut self, child_id: u8, device: DeviceType);

    /// Report the motion sensor state.
    fn send_binary_state(&mut self, child_id: u8, tripped: bool);

    /// Report a generic telemetry metric.
    fn send_metric(&mut self, child_id: u8, metric: MetricKind, value: u16);

    /// Report battery state of charge (0–100).
    fn send_battery_percent(&mut self, level: u8);

    /// Power the radio down before sleep.
    fn power_down(&mut self);

    /// Power the radio back up after wake.  Idempotent.
    fn power_up(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the telemetry inputs.
///
/// Both reads are short, fixed-latency synchronous operations; the light
/// read includes the sensor settle delay internally.
pub trait SensorPort {
    /// Battery state of charge, 0–100.
    fn read_battery_percent(&mut self) -> u8;

    /// Ambient light level, 0–100.  Powers the photo sensor, waits the
    /// settle time, samples, and de-powers it on every exit path.
    fn read_light_level(&mut self) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Power port (driven adapter: domain → sleep/peripheral control)
// ───────────────────────────────────────────────────────────────

/// What pulled the CPU out of sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeSource {
    /// The periodic wake timer fired.
    Tick,
    /// The PIR data pin edge fired.
    Motion,
}

/// Peripheral power sequencing and the one blocking suspension point.
pub trait PowerPort {
    /// Drive the PIR front-end enable line.  Idempotent.
    fn set_pir_enabled(&mut self, enabled: bool);

    /// Power down non-essential peripherals (ADC, unused timers, brown-out
    /// detector) ahead of sleep.
    fn disable_peripherals(&mut self);

    /// Restore peripherals after wake.  Must be idempotent: if a prior
    /// disable never happened (or restore runs twice) the hardware ends up
    /// configured as if it was never touched.
    fn restore_peripherals(&mut self);

    /// Halt until the wake timer or the PIR edge fires.  This is the only
    /// blocking call in the entire firmware.
    fn sleep_until_wake(&mut self) -> WakeSource;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / diagnostics)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a test
/// recorder, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// Implementations MUST validate before persisting: a timing value that
/// truncates the report period to zero ticks would silently disable
/// telemetry, so invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], not clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`NodeConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for node addressing and config blobs.
///
/// Keys are namespaced to prevent collisions between subsystems; writes are
/// atomic (the ESP-IDF NVS API guarantees this natively, the in-memory
/// simulation trivially).
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
