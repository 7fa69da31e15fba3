pub mod storage;

use std::{
    fs,
    io,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    de::DeserializeOwned,
    Serialize,
};

pub use storage::{
    FileStorage,
    MemoryStorage,
    Storage,
};

use crate::core::TenderError;

const APP_NAME: &str = "tender-results";

/// Per-user directory for the config file and stored values. Falls back to the
/// working directory when the platform has no local data dir.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir().map(|dir| dir.join(APP_NAME)).unwrap_or_else(|| PathBuf::from("."))
}

/// Writes `data` as pretty JSON to `path`, creating missing parent directories.
pub fn save_json<T: Serialize>(data: &T, path: &Path) -> Result<(), TenderError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    println!("Data saved to: {}", path.display());
    Ok(())
}

/// A missing file yields `T::default()` silently; unreadable or malformed contents
/// are logged and also yield the default.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let loaded = fs::read_to_string(path)
        .map_err(TenderError::from)
        .and_then(|json| serde_json::from_str(&json).map_err(TenderError::from));

    match loaded {
        Ok(data) => data,
        Err(TenderError::Io(e)) if e.kind() == io::ErrorKind::NotFound => T::default(),
        Err(e) => {
            eprintln!("Failed to load {}: {}. Using defaults.", path.display(), e);
            T::default()
        }
    }
}
