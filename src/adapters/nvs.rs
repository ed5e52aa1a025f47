//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`StatePort`]: the whole [`PersistedState`] is one JSON blob
//! under a single key, so each save is atomic (ESP-IDF NVS commits are
//! atomic per `nvs_commit()`).  The simulation backend keeps the blob in an
//! in-memory map.

use log::{info, warn};

use crate::app::ports::{StateError, StatePort};
use crate::error::Error;
use crate::state::PersistedState;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const STATE_NAMESPACE: &str = "rainbypass";
#[cfg(not(target_os = "espidf"))]
const STATE_KEY: &str = "state";
#[cfg(target_os = "espidf")]
const STATE_KEY: &core::ffi::CStr = c"state";

/// Upper bound for the JSON record (two 168-hour series plus config).
const MAX_BLOB_SIZE: usize = 8192;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, StateError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32
            {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as i32 {
                    return Err(StateError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK as i32 {
                    return Err(StateError::IoError);
                }
            } else if ret != ESP_OK as i32 {
                return Err(StateError::IoError);
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

    /// Drop the stored record (forces first-run setup on next boot).
    pub fn erase(&mut self) -> Result<(), StateError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .remove(&Self::composite_key(STATE_NAMESPACE, STATE_KEY));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            Self::with_nvs_handle(STATE_NAMESPACE, true, |handle| {
                let ret = unsafe { nvs_erase_key(handle, STATE_KEY.as_ptr()) };
                if ret != ESP_OK as i32 && ret != ESP_ERR_NVS_NOT_FOUND as i32 {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            })
            .map_err(|_| StateError::IoError)
        }
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

        // SAFETY: ns_buf is NUL-terminated; handle is written by nvs_open.
        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Vec<u8>, StateError> {
        let result = Self::with_nvs_handle(STATE_NAMESPACE, false, |handle| {
            let key = STATE_KEY;
            let mut size: usize = 0;

            // First call: get size
            let ret = unsafe { nvs_get_blob(handle, key.as_ptr(), core::ptr::null_mut(), &mut size) };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH as i32);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(handle, key.as_ptr(), buf.as_mut_ptr() as *mut _, &mut size)
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        });

        match result {
            Ok(bytes) => Ok(bytes),
            // A never-opened namespace reports NOT_FOUND from nvs_open too.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND as i32 => Err(StateError::NotFound),
            Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH as i32 => Err(StateError::Corrupted),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {}", e);
                Err(StateError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Vec<u8>, StateError> {
        self.store
            .borrow()
            .get(&Self::composite_key(STATE_NAMESPACE, STATE_KEY))
            .cloned()
            .ok_or(StateError::NotFound)
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        Self::with_nvs_handle(STATE_NAMESPACE, true, |handle| {
            let key = STATE_KEY;
            let ret = unsafe {
                nvs_set_blob(handle, key.as_ptr(), bytes.as_ptr() as *const _, bytes.len())
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|e| {
            warn!("NvsAdapter: NVS write error {}", e);
            StateError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        self.store.borrow_mut().insert(
            Self::composite_key(STATE_NAMESPACE, STATE_KEY),
            bytes.to_vec(),
        );
        Ok(())
    }

    /// Raw write, bypassing validation (tests: corrupt records).
    #[cfg(not(target_os = "espidf"))]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        let _ = self.write_blob(bytes);
    }
}

impl StatePort for NvsAdapter {
    fn load(&self) -> Result<PersistedState, StateError> {
        let bytes = self.read_blob()?;
        let state: PersistedState =
            serde_json::from_slice(&bytes).map_err(|_| StateError::Corrupted)?;
        let state = state.validated().map_err(|e| match e {
            Error::ConfigInvalid(msg) => StateError::Invalid(msg),
            _ => StateError::Corrupted,
        })?;
        info!("NvsAdapter: loaded state ({} bytes)", bytes.len());
        Ok(state)
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), StateError> {
        let bytes = state.to_json().map_err(|_| StateError::Invalid("unserialisable"))?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(StateError::Invalid("record too large"));
        }
        self.write_blob(&bytes)?;
        info!("NvsAdapter: state saved ({} bytes)", bytes.len());
        Ok(())
    }
}
