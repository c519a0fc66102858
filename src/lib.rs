//! Motion node firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod power;
pub mod scheduler;

pub mod pins;

// The adapter ring compiles on both targets; the actual hardware access
// is guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
pub mod sensors;
