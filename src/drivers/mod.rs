//! Hardware drivers — peripheral init, wake timer, PIR front-end, watchdog.

pub mod hw_init;
pub mod pir;
pub mod wake_timer;
pub mod watchdog;
