//! Outbound application events.
//!
//! The [`NodeService`](super::service::NodeService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them — log to serial, record in a test, etc.

use super::ports::WakeSource;

/// Structured events emitted by the scheduling core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The node has announced itself to the gateway.
    Started,

    /// An accepted motion event (or coalesced burst) was reported.
    MotionReported,

    /// Periodic telemetry fired.
    Telemetry(TelemetryData),

    /// Handing off to the power state machine.
    EnteringSleep,

    /// The CPU woke up (carries what woke it).
    WokeUp(WakeSource),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryData {
    /// Wake-timer tick at which the report fired.
    pub tick_count: u16,
    /// Battery state of charge, 0–100.
    pub battery_percent: u8,
    /// Ambient light level, 0–100.
    pub light_level: u16,
    /// Whether the battery value was actually transmitted (unchanged levels
    /// are suppressed to save radio energy).
    pub battery_sent: bool,
}
