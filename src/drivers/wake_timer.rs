//! Periodic wake timer using ESP-IDF's esp_timer API.
//!
//! Drives the ~8 s tick: each expiry runs the tick handler on the counter
//! core and (on hardware) ends the current light-sleep interval.  The
//! period is approximate — a coarse RC-backed prescaler, not a calibrated
//! clock — which is why all downstream scheduling counts ticks rather than
//! seconds.
//!
//! On simulation targets the main loop fires ticks itself via
//! [`sim_fire_tick()`] after its stand-in sleep.

use crate::events::tick_isr_handler;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut WAKE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: WAKE_TIMER is written once in `start()` before the first expiry.
/// Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn wake_timer() -> esp_timer_handle_t {
    unsafe { WAKE_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn wake_tick_cb(_arg: *mut core::ffi::c_void) {
    tick_isr_handler();
}

/// Start the periodic wake timer.
#[cfg(target_os = "espidf")]
pub fn start(period_secs: u16) {
    // SAFETY: WAKE_TIMER is written here once at boot from the single
    // main-task context before any expiry fires.  The callback only touches
    // the counter core behind a critical section.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(wake_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"wake\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&args, &raw mut WAKE_TIMER);
        if ret != ESP_OK {
            log::error!("wake_timer: create failed (rc={})", ret);
            return;
        }
        let ret = esp_timer_start_periodic(WAKE_TIMER, period_secs as u64 * 1_000_000);
        if ret != ESP_OK {
            log::error!("wake_timer: start failed (rc={})", ret);
            return;
        }

        info!("wake_timer: periodic tick every ~{}s", period_secs);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start(period_secs: u16) {
    log::info!("wake_timer(sim): ~{}s ticks driven by sleep loop", period_secs);
}

/// Fire one tick by hand.  Simulation stand-in for a timer expiry.
#[cfg(not(target_os = "espidf"))]
pub fn sim_fire_tick() {
    tick_isr_handler();
}

/// Stop the wake timer.
#[cfg(target_os = "espidf")]
pub fn stop() {
    // SAFETY: wake_timer() contract — main task only; null-check prevents
    // stopping a timer that never started.
    unsafe {
        let t = wake_timer();
        if !t.is_null() {
            esp_timer_stop(t);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop() {}
