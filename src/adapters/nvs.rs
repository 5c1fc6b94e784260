//! Flash-backed key/value storage.
//!
//! [`NvsAdapter`] serves both [`ConfigPort`] (the postcard-encoded
//! [`ControllerConfig`]) and [`StoragePort`] (raw blobs such as the learning
//! record). Both live in the `hotcirc` namespace under distinct keys.
//!
//! The adapter delegates to a backend with one blob API:
//! - on the device, `flash` talks to ESP-IDF NVS directly; every mutation is
//!   followed by `nvs_commit()`, so a blob is either fully replaced or left
//!   untouched;
//! - on the host, `sim` keeps blobs in memory so tests can inspect and
//!   corrupt them.

use log::{debug, info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::ControllerConfig;

const CONFIG_NAMESPACE: &str = "hotcirc";
const CONFIG_KEY: &str = "config";

/// Largest config blob accepted from flash.
const MAX_CONFIG_BLOB: usize = 512;

/// Backend-level failure, mapped onto the port error types below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlobError {
    Missing,
    Truncated { needed: usize },
    NoSpace,
    Driver(i32),
}

impl From<BlobError> for StorageError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::Missing => StorageError::NotFound,
            BlobError::Truncated { needed } => StorageError::BufferTooSmall { needed },
            BlobError::NoSpace => StorageError::Full,
            BlobError::Driver(_) => StorageError::IoError,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
type Backend = sim::MemFlash;
#[cfg(target_os = "espidf")]
type Backend = flash::EspFlash;

/// `Default` skips mounting; on the device every access then fails with
/// an I/O error, which callers already tolerate.
#[derive(Default)]
pub struct NvsAdapter {
    backend: Backend,
}

impl NvsAdapter {
    /// Mount the NVS partition.
    ///
    /// A partition that is full or was written by a newer IDF is erased and
    /// mounted again. Any other mount failure is an I/O error.
    pub fn new() -> Result<Self, ConfigError> {
        let backend = Backend::mount().map_err(|e| {
            warn!("NVS | mount failed ({:?})", e);
            ConfigError::IoError
        })?;
        Ok(Self { backend })
    }
}

// ── ConfigPort ────────────────────────────────────────────────

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let bytes = match self.backend.get_vec(CONFIG_NAMESPACE, CONFIG_KEY, MAX_CONFIG_BLOB) {
            Ok(bytes) => bytes,
            Err(BlobError::Missing) => {
                info!("NVS | no stored config, using defaults");
                return Ok(ControllerConfig::default());
            }
            Err(BlobError::Truncated { needed }) => {
                warn!("NVS | config blob too large ({} bytes)", needed);
                return Err(ConfigError::Corrupted);
            }
            Err(e) => {
                warn!("NVS | config read failed ({:?})", e);
                return Err(ConfigError::IoError);
            }
        };

        let cfg: ControllerConfig =
            postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("NVS | config loaded ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        match self.backend.set(CONFIG_NAMESPACE, CONFIG_KEY, &bytes) {
            Ok(()) => {
                info!("NVS | config saved ({} bytes)", bytes.len());
                Ok(())
            }
            Err(BlobError::NoSpace) => Err(ConfigError::StorageFull),
            Err(e) => {
                warn!("NVS | config write failed ({:?})", e);
                Err(ConfigError::IoError)
            }
        }
    }
}

// ── StoragePort ───────────────────────────────────────────────

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        Ok(self.backend.get(namespace, key, buf)?)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.backend.set(namespace, key, data)?;
        debug!("NVS | {}/{} written ({} bytes)", namespace, key, data.len());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        Ok(self.backend.erase(namespace, key)?)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.backend.contains(namespace, key)
    }
}

// ── Host backend ──────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::BlobError;

    /// In-memory stand-in for the NVS partition.
    #[derive(Default)]
    pub(super) struct MemFlash {
        blobs: RefCell<HashMap<(String, String), Vec<u8>>>,
    }

    fn slot(namespace: &str, key: &str) -> (String, String) {
        (namespace.to_owned(), key.to_owned())
    }

    impl MemFlash {
        pub(super) fn mount() -> Result<Self, BlobError> {
            log::info!("NVS | in-memory backend");
            Ok(Self::default())
        }

        pub(super) fn get(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, BlobError> {
            let blobs = self.blobs.borrow();
            let data = blobs.get(&slot(ns, key)).ok_or(BlobError::Missing)?;
            let dst = buf
                .get_mut(..data.len())
                .ok_or(BlobError::Truncated { needed: data.len() })?;
            dst.copy_from_slice(data);
            Ok(data.len())
        }

        pub(super) fn get_vec(&self, ns: &str, key: &str, limit: usize) -> Result<Vec<u8>, BlobError> {
            let blobs = self.blobs.borrow();
            let data = blobs.get(&slot(ns, key)).ok_or(BlobError::Missing)?;
            if data.len() > limit {
                return Err(BlobError::Truncated { needed: data.len() });
            }
            Ok(data.clone())
        }

        pub(super) fn set(&self, ns: &str, key: &str, data: &[u8]) -> Result<(), BlobError> {
            self.blobs.borrow_mut().insert(slot(ns, key), data.to_vec());
            Ok(())
        }

        pub(super) fn erase(&self, ns: &str, key: &str) -> Result<(), BlobError> {
            self.blobs.borrow_mut().remove(&slot(ns, key));
            Ok(())
        }

        pub(super) fn contains(&self, ns: &str, key: &str) -> bool {
            self.blobs.borrow().contains_key(&slot(ns, key))
        }
    }
}

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod flash {
    use esp_idf_svc::sys::*;

    use super::BlobError;

    /// Stateless handle over the default NVS partition.
    #[derive(Default)]
    pub(super) struct EspFlash;

    /// NVS names are limited to 15 bytes plus the terminator.
    fn c_name(name: &str) -> [u8; 16] {
        let mut out = [0u8; 16];
        let len = name.len().min(15);
        out[..len].copy_from_slice(&name.as_bytes()[..len]);
        out
    }

    fn check(ret: esp_err_t) -> Result<(), BlobError> {
        match ret {
            ESP_OK => Ok(()),
            ESP_ERR_NVS_NOT_FOUND => Err(BlobError::Missing),
            ESP_ERR_NVS_NOT_ENOUGH_SPACE => Err(BlobError::NoSpace),
            other => Err(BlobError::Driver(other)),
        }
    }

    /// Run `f` with an open namespace handle; the handle is always closed.
    fn scoped<T>(
        ns: &str,
        mode: nvs_open_mode_t,
        f: impl FnOnce(nvs_handle_t) -> Result<T, BlobError>,
    ) -> Result<T, BlobError> {
        let ns = c_name(ns);
        let mut handle: nvs_handle_t = 0;
        // SAFETY: `ns` is NUL-terminated and outlives the call.
        check(unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) })?;
        let out = f(handle);
        // SAFETY: `handle` was opened above and is not used afterwards.
        unsafe { nvs_close(handle) };
        out
    }

    fn blob_len(handle: nvs_handle_t, key: &[u8; 16]) -> Result<usize, BlobError> {
        let mut len = 0usize;
        // SAFETY: a null output pointer asks NVS for the stored length only.
        check(unsafe {
            nvs_get_blob(handle, key.as_ptr().cast(), core::ptr::null_mut(), &mut len)
        })?;
        Ok(len)
    }

    impl EspFlash {
        pub(super) fn mount() -> Result<Self, BlobError> {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                log::warn!("NVS | partition unusable ({}), erasing", ret);
                check(unsafe { nvs_flash_erase() })?;
                check(unsafe { nvs_flash_init() })?;
            } else {
                check(ret)?;
            }
            log::info!("NVS | flash partition mounted");
            Ok(Self)
        }

        pub(super) fn get(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, BlobError> {
            let key = c_name(key);
            scoped(ns, nvs_open_mode_t_NVS_READONLY, |h| {
                let needed = blob_len(h, &key)?;
                if needed > buf.len() {
                    return Err(BlobError::Truncated { needed });
                }
                let mut len = buf.len();
                // SAFETY: `buf` is valid for `len` bytes.
                check(unsafe {
                    nvs_get_blob(h, key.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut len)
                })?;
                Ok(len)
            })
        }

        pub(super) fn get_vec(&self, ns: &str, key: &str, limit: usize) -> Result<Vec<u8>, BlobError> {
            let key = c_name(key);
            scoped(ns, nvs_open_mode_t_NVS_READONLY, |h| {
                let mut len = blob_len(h, &key)?;
                if len > limit {
                    return Err(BlobError::Truncated { needed: len });
                }
                let mut out = vec![0u8; len];
                // SAFETY: `out` is valid for `len` bytes.
                check(unsafe {
                    nvs_get_blob(h, key.as_ptr().cast(), out.as_mut_ptr().cast(), &mut len)
                })?;
                out.truncate(len);
                Ok(out)
            })
        }

        pub(super) fn set(&self, ns: &str, key: &str, data: &[u8]) -> Result<(), BlobError> {
            let key = c_name(key);
            scoped(ns, nvs_open_mode_t_NVS_READWRITE, |h| {
                // SAFETY: `data` is valid for `data.len()` bytes.
                check(unsafe {
                    nvs_set_blob(h, key.as_ptr().cast(), data.as_ptr().cast(), data.len())
                })?;
                check(unsafe { nvs_commit(h) })
            })
        }

        pub(super) fn erase(&self, ns: &str, key: &str) -> Result<(), BlobError> {
            let key = c_name(key);
            scoped(ns, nvs_open_mode_t_NVS_READWRITE, |h| {
                match check(unsafe { nvs_erase_key(h, key.as_ptr().cast()) }) {
                    Ok(()) | Err(BlobError::Missing) => {}
                    Err(e) => return Err(e),
                }
                check(unsafe { nvs_commit(h) })
            })
        }

        pub(super) fn contains(&self, ns: &str, key: &str) -> bool {
            let key = c_name(key);
            scoped(ns, nvs_open_mode_t_NVS_READONLY, |h| {
                Ok(unsafe { nvs_find_key(h, key.as_ptr().cast(), core::ptr::null_mut()) } == ESP_OK)
            })
            .unwrap_or(false)
        }
    }
}
