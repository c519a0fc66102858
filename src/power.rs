//! Power state machine.
//!
//! Two states, no terminal state, cycling indefinitely:
//!
//! ```text
//!            all work dispatched
//!   ACTIVE ────────────────────────▶ SLEEPING
//!      ▲                                │
//!      └────────────────────────────────┘
//!        wake timer tick OR PIR edge
//! ```
//!
//! Entering sleep powers the radio down, disables non-essential peripherals
//! (ADC, unused timers, brown-out detector), and halts the CPU in the
//! deepest mode that both interrupt sources can still wake.  Waking restores
//! everything in reverse; restore is idempotent, so a failed or skipped
//! disable leaves the device behaving as if peripherals were never touched.
//! This is deterministic hardware sequencing — there is no failure path.

use log::debug;

use crate::app::ports::{PowerPort, TransportPort, WakeSource};

/// Current power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Peripherals powered, main path running.
    Active,
    /// CPU halted, peripherals down, waiting on an interrupt.
    Sleeping,
}

/// Orchestrates the ACTIVE ⇄ SLEEPING transitions.
pub struct PowerManager {
    state: PowerState,
    sleep_cycles: u32,
    last_wake: Option<WakeSource>,
}

impl PowerManager {
    pub fn new() -> Self {
        Self {
            state: PowerState::Active,
            sleep_cycles: 0,
            last_wake: None,
        }
    }

    /// Current state.  `Sleeping` is only ever observable from an ISR; by
    /// the time the main path regains control the machine is `Active` again.
    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Completed sleep/wake round trips since boot.
    pub fn sleep_cycles(&self) -> u32 {
        self.sleep_cycles
    }

    /// What ended the most recent sleep.
    pub fn last_wake(&self) -> Option<WakeSource> {
        self.last_wake
    }

    /// Execute one full ACTIVE → SLEEPING → ACTIVE round trip.
    ///
    /// Sequencing: radio down, peripherals down, halt; then on wake,
    /// peripherals up, radio up.  The radio brackets the outside of the
    /// sequence so it is never left powered across the halt.
    pub fn sleep_until_wake(
        &mut self,
        transport: &mut impl TransportPort,
        power: &mut impl PowerPort,
    ) -> WakeSource {
        debug!("Power: entering sleep (cycle {})", self.sleep_cycles + 1);
        transport.power_down();
        power.disable_peripherals();
        self.state = PowerState::Sleeping;

        let wake = power.sleep_until_wake();

        self.state = PowerState::Active;
        power.restore_peripherals();
        transport.power_up();

        self.sleep_cycles = self.sleep_cycles.wrapping_add(1);
        self.last_wake = Some(wake);
        debug!("Power: woke on {:?}", wake);
        wake
    }
}
