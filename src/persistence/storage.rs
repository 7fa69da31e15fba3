use std::{
    collections::HashMap,
    fs,
    io,
    path::PathBuf,
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Mutex,
    },
};

use super::app_data_dir;
use crate::core::TenderError;

const STORAGE_DIR: &str = "storage";
const VALUE_EXTENSION: &str = "json";

/// Origin-local key/value storage holding string values.
///
/// Mirrors the browser `localStorage` surface so the result store can run against
/// disk in production and against memory in tests.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, TenderError>;

    /// Replaces the value under `key`. Either the new value is fully stored or the
    /// previous value is left untouched.
    fn set_item(&self, key: &str, value: &str) -> Result<(), TenderError>;

    fn remove_item(&self, key: &str) -> Result<(), TenderError>;
}

fn validate_key(key: &str) -> Result<(), TenderError> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(TenderError::Custom(format!("Invalid storage key: {:?}", key)));
    }
    Ok(())
}

fn quota_exceeded(needed: usize, quota: usize) -> TenderError {
    TenderError::StorageUnavailable(format!(
        "quota exceeded ({} bytes needed, {} allowed)",
        needed, quota
    ))
}

/// One file per key inside a directory.
pub struct FileStorage {
    root: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStorage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, TenderError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            TenderError::StorageUnavailable(format!("cannot create {}: {}", root.display(), e))
        })?;
        Ok(Self { root, quota_bytes: None })
    }

    pub fn open_default() -> Result<Self, TenderError> {
        Self::open(app_data_dir().join(STORAGE_DIR))
    }

    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, VALUE_EXTENSION))
    }

    fn staging_path(&self, key: &str) -> PathBuf {
        self.root.join(format!(".{}.{}.tmp", key, VALUE_EXTENSION))
    }

    /// Bytes used by every stored value except the one under `key`.
    fn used_bytes_excluding(&self, key: &str) -> io::Result<usize> {
        let skip = self.key_path(key);
        let mut total = 0usize;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            total += fs::metadata(&path)?.len() as usize;
        }
        Ok(total)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, TenderError> {
        validate_key(key)?;
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TenderError::StorageUnavailable(e.to_string())),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), TenderError> {
        validate_key(key)?;

        if let Some(quota) = self.quota_bytes {
            let used = self
                .used_bytes_excluding(key)
                .map_err(|e| TenderError::StorageUnavailable(e.to_string()))?;
            let needed = used + value.len();
            if needed > quota {
                return Err(quota_exceeded(needed, quota));
            }
        }

        let staging = self.staging_path(key);
        let written = fs::write(&staging, value).and_then(|_| fs::rename(&staging, self.key_path(key)));
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(TenderError::StorageUnavailable(e.to_string()));
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), TenderError> {
        validate_key(key)?;
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TenderError::StorageUnavailable(e.to_string())),
        }
    }
}

/// In-memory storage for tests and embedders without a writable disk.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    unavailable: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self { quota_bytes: Some(quota_bytes), ..Self::default() }
    }

    /// Makes every subsequent call fail as if storage were disabled.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), TenderError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(TenderError::StorageUnavailable("storage is disabled".to_string()));
        }
        Ok(())
    }

    fn items(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, TenderError> {
        self.check_available()?;
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), TenderError> {
        self.check_available()?;
        let mut items = self.items();

        if let Some(quota) = self.quota_bytes {
            let used: usize =
                items.iter().filter(|(k, _)| k.as_str() != key).map(|(k, v)| k.len() + v.len()).sum();
            let needed = used + key.len() + value.len();
            if needed > quota {
                return Err(quota_exceeded(needed, quota));
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), TenderError> {
        self.check_available()?;
        self.items().remove(key);
        Ok(())
    }
}
