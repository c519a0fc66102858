//! Adapters — concrete implementations of the domain port traits.

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod transport;
