//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => {
                info!("START | node announced");
            }
            AppEvent::MotionReported => {
                info!("MOTION | reported");
            }
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | tick={} | batt={}%{} | light={}",
                    t.tick_count,
                    t.battery_percent,
                    if t.battery_sent { "" } else { " (suppressed)" },
                    t.light_level,
                );
            }
            AppEvent::EnteringSleep => {
                info!("POWER | entering sleep");
            }
            AppEvent::WokeUp(source) => {
                info!("POWER | woke up ({:?})", source);
            }
        }
    }
}
