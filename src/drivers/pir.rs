//! PIR motion detector front-end.
//!
//! The detection edge itself is serviced entirely by the ISR registered in
//! `hw_init::init_isr_service()`; this module owns the other two pins the
//! element touches:
//!
//! - the enable line, driven LOW during the debounce cooldown so the PIR
//!   element settles unpowered instead of re-triggering on its own tail
//! - the factory-reset strap, sampled once at boot
//!
//! On host targets [`sim_trigger_motion()`] stands in for the GPIO edge.

use crate::drivers::hw_init;
use crate::pins;

/// Drive the PIR front-end enable line.  Idempotent — callers re-assert the
/// desired level every wake cycle rather than tracking edges.
pub fn set_enabled(enabled: bool) {
    hw_init::gpio_write(pins::PIR_ENABLE_GPIO, enabled);
}

/// Sample the factory-reset strap.  Held LOW at boot means the installer is
/// requesting re-provisioning.  Pull-up keeps it HIGH when unstrapped.
pub fn factory_reset_requested() -> bool {
    !hw_init::gpio_read(pins::FACTORY_RESET_GPIO)
}

/// Inject one PIR rising edge.  Simulation stand-in for the GPIO ISR.
#[cfg(not(target_os = "espidf"))]
pub fn sim_trigger_motion() {
    crate::events::motion_isr_handler();
}
