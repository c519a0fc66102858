//! Interrupt-shared event counters.
//!
//! The whole wake/report pipeline is driven by two interrupt sources writing
//! a handful of small counters that the main path reads once per wake:
//!
//! ```text
//! ┌──────────────┐        ┌──────────────────────┐        ┌──────────────┐
//! │ Wake timer   │ on_tick│                      │snapshot│              │
//! │ ISR (~8 s)   │───────▶│  EventCore           │───────▶│  Main loop   │
//! │              │        │  (counters behind a  │        │  (scheduler, │
//! │ PIR edge ISR │on_motion  critical section)   │ drain  │   then sleep)│
//! │              │───────▶│                      │───────▶│              │
//! └──────────────┘        └──────────────────────┘        └──────────────┘
//! ```
//!
//! Both handlers are O(1), allocation-free, and perform no I/O.  Multi-step
//! counter updates are guarded by [`critical_section`] so the main path never
//! observes a torn pairing of the cooldown counters.  The counters wrap; all
//! comparisons are by equality, never ordering, so wrap-around is harmless.

use core::cell::Cell;

use critical_section::Mutex;

/// Debounce cooldown after an accepted motion event, in wake-timer ticks
/// (4 ticks ≈ 32 s).  Re-triggers inside the window coalesce and never stack
/// additional windows.
pub const DEFAULT_COOLDOWN_TICKS: u16 = 4;

/// Initial settle window applied at boot, in ticks.  The PIR element rings
/// for a few seconds after power-up; anything it reports before the first
/// tick is discarded.
pub const SETTLE_TICKS: u16 = 1;

// ───────────────────────────────────────────────────────────────
// Counter state
// ───────────────────────────────────────────────────────────────

/// A consistent point-in-time copy of every shared counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    /// Wake-timer ticks since boot (wrapping).
    pub tick_count: u16,
    /// Tick value up to which the motion input is suppressed.
    pub cooldown_end: u16,
    /// Tick value up to which the cooldown has been serviced.  The sensor is
    /// logically suppressed exactly while this differs from `cooldown_end`.
    pub cooldown_released: u16,
    /// Motion events accepted since boot.
    pub events_detected: u16,
    /// Motion events already reported by the main path.
    pub events_reported: u16,
}

impl Counters {
    const fn boot() -> Self {
        Self {
            tick_count: 0,
            // Seed a settle window: suppressed until the first tick fires.
            cooldown_end: SETTLE_TICKS,
            cooldown_released: 0,
            events_detected: 0,
            events_reported: 0,
        }
    }

    /// True while the debounce cooldown (or boot settle window) is running.
    pub fn in_cooldown(&self) -> bool {
        self.cooldown_end != self.cooldown_released
    }

    /// True if an accepted motion event has not been reported yet.
    pub fn motion_pending(&self) -> bool {
        self.events_detected != self.events_reported
    }
}

// ───────────────────────────────────────────────────────────────
// EventCore
// ───────────────────────────────────────────────────────────────

/// Owns the interrupt-shared counters.
///
/// The ISR entry points ([`on_tick`](Self::on_tick),
/// [`on_motion`](Self::on_motion)) and the main-path accessors all take
/// `&self`; every access runs inside a critical section, which on the target
/// masks interrupts for the duration of the compound read/update.
///
/// Production code uses the [`EVENT_CORE`] static so the registered ISRs can
/// reach it; tests construct their own instance for deterministic runs.
pub struct EventCore {
    state: Mutex<Cell<Counters>>,
    cooldown_ticks: u16,
}

impl EventCore {
    /// Construct a core with the boot-time settle window armed.
    pub const fn new(cooldown_ticks: u16) -> Self {
        Self {
            state: Mutex::new(Cell::new(Counters::boot())),
            cooldown_ticks,
        }
    }

    // ── ISR paths ─────────────────────────────────────────────

    /// Wake-timer tick handler.  Services one tick of cooldown if active,
    /// then advances the tick counter.  Never fails, never does I/O.
    pub fn on_tick(&self) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut c = cell.get();
            if c.cooldown_released != c.cooldown_end {
                c.cooldown_released = c.cooldown_released.wrapping_add(1);
            }
            c.tick_count = c.tick_count.wrapping_add(1);
            cell.set(c);
        });
    }

    /// PIR edge handler.  Accepts the event only when no cooldown is
    /// running; a suppressed trigger is expected filtering, not a failure.
    ///
    /// Returns whether the event was accepted (the static ISR shim ignores
    /// this; the counters carry the information to the main path).
    pub fn on_motion(&self) -> bool {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut c = cell.get();
            if c.cooldown_end != c.cooldown_released {
                return false;
            }
            c.cooldown_end = c.cooldown_end.wrapping_add(self.cooldown_ticks);
            c.events_detected = c.events_detected.wrapping_add(1);
            cell.set(c);
            true
        })
    }

    // ── Main-path accessors ───────────────────────────────────

    /// Consistent copy of all counters.
    pub fn snapshot(&self) -> Counters {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    /// Drain the pending-motion signal: if any accepted event is unreported,
    /// mark everything reported and return `true`.  Compare and update happen
    /// in one critical section, so a racing `on_motion` either lands before
    /// the drain (reported now) or after it (reported next cycle) — never
    /// lost, never double-reported.
    pub fn take_motion_pending(&self) -> bool {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut c = cell.get();
            if c.events_detected == c.events_reported {
                return false;
            }
            c.events_reported = c.events_detected;
            cell.set(c);
            true
        })
    }

    /// True while the motion input is suppressed.  The PIR enable line is
    /// derived from this each cycle; it is not stored anywhere.
    pub fn in_cooldown(&self) -> bool {
        self.snapshot().in_cooldown()
    }
}

// ───────────────────────────────────────────────────────────────
// Static instance + ISR shims
// ───────────────────────────────────────────────────────────────

/// The one production instance, reachable from registered ISRs.
pub static EVENT_CORE: EventCore = EventCore::new(DEFAULT_COOLDOWN_TICKS);

/// Wake-timer ISR entry point.  Register on the periodic hardware timer.
pub fn tick_isr_handler() {
    EVENT_CORE.on_tick();
}

/// PIR ISR entry point.  Register on the PIR data pin rising edge.
pub fn motion_isr_handler() {
    let _ = EVENT_CORE.on_motion();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_settle_window_suppresses_first_trigger() {
        let core = EventCore::new(DEFAULT_COOLDOWN_TICKS);
        assert!(core.in_cooldown());
        assert!(!core.on_motion());
        assert_eq!(core.snapshot().events_detected, 0);
    }

    #[test]
    fn settle_window_releases_after_one_tick() {
        let core = EventCore::new(DEFAULT_COOLDOWN_TICKS);
        core.on_tick();
        let c = core.snapshot();
        assert_eq!(c.cooldown_released, c.cooldown_end);
        assert!(!core.in_cooldown());
    }

    #[test]
    fn accepted_motion_arms_cooldown() {
        let core = EventCore::new(DEFAULT_COOLDOWN_TICKS);
        core.on_tick();
        assert!(core.on_motion());
        let c = core.snapshot();
        assert_eq!(c.events_detected, 1);
        assert_eq!(c.cooldown_end, SETTLE_TICKS + DEFAULT_COOLDOWN_TICKS);
        assert!(core.in_cooldown());
    }

    #[test]
    fn triggers_inside_cooldown_coalesce() {
        let core = EventCore::new(DEFAULT_COOLDOWN_TICKS);
        core.on_tick();
        assert!(core.on_motion());
        let armed_end = core.snapshot().cooldown_end;

        // Two more triggers before the cooldown is serviced.
        assert!(!core.on_motion());
        assert!(!core.on_motion());

        let c = core.snapshot();
        assert_eq!(c.events_detected, 1);
        // Re-triggers must not stack additional windows.
        assert_eq!(c.cooldown_end, armed_end);
    }

    #[test]
    fn cooldown_releases_after_configured_ticks() {
        let core = EventCore::new(DEFAULT_COOLDOWN_TICKS);
        core.on_tick();
        assert!(core.on_motion());

        for _ in 0..DEFAULT_COOLDOWN_TICKS - 1 {
            core.on_tick();
            assert!(core.in_cooldown());
            assert!(!core.on_motion());
        }
        core.on_tick();
        assert!(!core.in_cooldown());
        assert!(core.on_motion());
        assert_eq!(core.snapshot().events_detected, 2);
    }

    #[test]
    fn take_motion_pending_drains_exactly_once() {
        let core = EventCore::new(DEFAULT_COOLDOWN_TICKS);
        core.on_tick();
        assert!(core.on_motion());

        assert!(core.take_motion_pending());
        assert!(!core.take_motion_pending());

        let c = core.snapshot();
        assert_eq!(c.events_reported, c.events_detected);
    }

    #[test]
    fn tick_count_is_monotonic_per_tick() {
        let core = EventCore::new(DEFAULT_COOLDOWN_TICKS);
        for expected in 1..=10u16 {
            core.on_tick();
            assert_eq!(core.snapshot().tick_count, expected);
        }
    }

    #[test]
    fn counters_tolerate_wrap() {
        let core = EventCore::new(DEFAULT_COOLDOWN_TICKS);
        // Burn through most of the u16 range; equality-based comparisons must
        // keep working across the wrap.
        for _ in 0..u32::from(u16::MAX) + 10 {
            core.on_tick();
        }
        assert!(!core.in_cooldown());
        assert!(core.on_motion());
        core.on_tick();
        assert!(core.in_cooldown());
    }
}
