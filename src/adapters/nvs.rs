//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`], and persists the
//! routing identity ([`NodeAddress`]) the radio needs across power cycles.
//!
//! - Config validation: all fields are range-checked before persistence.
//!   In particular a report interval that truncates to zero ticks is
//!   rejected outright rather than clamped.
//! - Address repair: a first boot or a worn flash cell leaves address
//!   fields at the erased-flash value 0xFF.  `load_address()` detects the
//!   sentinel and resets the affected field so the node re-provisions
//!   instead of routing with garbage.
//! - Namespace isolation: config, address, and test keys each use their
//!   own namespace.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::NodeConfig;
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "motionnode";
const CONFIG_KEY: &str = "nodecfg";

const ADDR_NAMESPACE: &str = "routing";
const ADDR_KEY: &str = "address";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 4000;

/// Erased NOR flash reads back all-ones; a 0xFF byte in any address field
/// therefore means "never written" (or lost), not a real value.
pub const ADDR_UNSET: u8 = 0xFF;

/// Mesh routing identity persisted across power cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    /// This node's mesh id.  0xFF = unassigned, gateway will allocate.
    pub node_id: u8,
    /// Next-hop parent toward the gateway.  0xFF = unknown, re-discover.
    pub parent_id: u8,
    /// Hop count to the gateway.  0xFF = unknown.
    pub distance: u8,
}

impl NodeAddress {
    pub const fn unset() -> Self {
        Self {
            node_id: ADDR_UNSET,
            parent_id: ADDR_UNSET,
            distance: ADDR_UNSET,
        }
    }

    pub fn is_provisioned(&self) -> bool {
        self.node_id != ADDR_UNSET
    }

    /// Replace sentinel bytes with explicit unset markers.
    ///
    /// A partially-corrupted record keeps its good fields: only the fields
    /// reading as erased flash are reset.  Returns `true` if any field was
    /// repaired.
    pub fn repair(&mut self) -> bool {
        let mut repaired = false;
        if self.node_id == ADDR_UNSET
            && (self.parent_id != ADDR_UNSET || self.distance != ADDR_UNSET)
        {
            // node_id lost: parent/distance are meaningless without it.
            self.parent_id = ADDR_UNSET;
            self.distance = ADDR_UNSET;
            repaired = true;
        }
        if self.parent_id == ADDR_UNSET && self.distance != ADDR_UNSET {
            // Distance without a parent cannot be trusted.
            self.distance = ADDR_UNSET;
            repaired = true;
        }
        repaired
    }
}

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Fails only if flash initialisation fails unrecoverably. On first boot
    /// or after a version mismatch the NVS partition is erased and
    /// re-initialised automatically.
    pub fn new() -> crate::error::Result<Self> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(crate::error::Error::Init("NVS flash erase failed"));
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(crate::error::Error::Init("NVS flash init failed"));
                }
            } else if ret != ESP_OK {
                return Err(crate::error::Error::Init("NVS flash init failed"));
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// NVS keys are NUL-terminated and at most 15 chars; longer keys are
    /// truncated.
    #[cfg(target_os = "espidf")]
    fn key_buf(key: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let kb = key.as_bytes();
        let kl = kb.len().min(15);
        buf[..kl].copy_from_slice(&kb[..kl]);
        buf
    }

    // ── Routing address ───────────────────────────────────────

    /// Load the persisted node address, repairing erased-flash sentinels.
    ///
    /// Never fails: a missing or unreadable record comes back as
    /// [`NodeAddress::unset()`] so boot proceeds into re-provisioning.
    pub fn load_address(&self) -> NodeAddress {
        let mut buf = [0u8; 16];
        let mut addr = match self.read(ADDR_NAMESPACE, ADDR_KEY, &mut buf) {
            Ok(len) => match postcard::from_bytes::<NodeAddress>(&buf[..len]) {
                Ok(addr) => addr,
                Err(_) => {
                    warn!("NvsAdapter: address record corrupted, resetting");
                    NodeAddress::unset()
                }
            },
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored address (first boot)");
                NodeAddress::unset()
            }
            Err(_) => {
                warn!("NvsAdapter: address read failed, resetting");
                NodeAddress::unset()
            }
        };
        if addr.repair() {
            warn!("NvsAdapter: repaired partially-erased address record");
        }
        addr
    }

    /// Persist the node address.
    pub fn save_address(&mut self, addr: &NodeAddress) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(addr).map_err(|_| StorageError::IoError)?;
        self.write(ADDR_NAMESPACE, ADDR_KEY, &bytes)?;
        info!(
            "NvsAdapter: address saved (node={} parent={} distance={})",
            addr.node_id, addr.parent_id, addr.distance
        );
        Ok(())
    }

    /// Factory reset: drop the persisted address and config so the node
    /// boots as factory-fresh.  Triggered by the reset strap at boot.
    pub fn factory_reset(&mut self) -> Result<(), StorageError> {
        self.delete(ADDR_NAMESPACE, ADDR_KEY)?;
        self.delete(CONFIG_NAMESPACE, CONFIG_KEY)?;
        warn!("NvsAdapter: factory reset — address and config erased");
        Ok(())
    }
}

fn validate_config(cfg: &NodeConfig) -> Result<(), ConfigError> {
    if !(1..=60).contains(&cfg.tick_period_secs) {
        return Err(ConfigError::ValidationFailed("tick_period_secs must be 1–60"));
    }
    if cfg.report_interval_secs < cfg.tick_period_secs {
        // Would truncate report_period_ticks() to zero and silently
        // disable telemetry.
        return Err(ConfigError::ValidationFailed(
            "report_interval_secs must be >= tick_period_secs",
        ));
    }
    if cfg.battery_full_mv <= cfg.battery_empty_mv {
        return Err(ConfigError::ValidationFailed(
            "battery_full_mv must be > battery_empty_mv",
        ));
    }
    if !(1..=1000).contains(&cfg.light_settle_ms) {
        return Err(ConfigError::ValidationFailed("light_settle_ms must be 1–1000"));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            if let Some(bytes) = self.store.borrow().get(&key) {
                let cfg: NodeConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(NodeConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let key_cstr = b"nodecfg\0";
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }

                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: NodeConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(NodeConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(NodeConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError> {
        validate_config(config)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            self.store.borrow_mut().insert(key, bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let key_cstr = b"nodecfg\0";
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let key_buf = Self::key_buf(key);
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let key_buf = Self::key_buf(key);
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().remove(&composite);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let key_buf = Self::key_buf(key);
                let ret = unsafe { nvs_erase_key(handle, key_buf.as_ptr() as *const _) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow().contains_key(&composite)
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let key_buf = Self::key_buf(key);
                let ret = unsafe {
                    nvs_find_key(handle, key_buf.as_ptr() as *const _, core::ptr::null_mut())
                };
                Ok(ret == ESP_OK)
            });
            result.unwrap_or(false)
        }
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }
}
