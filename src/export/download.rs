use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use chrono::{
    DateTime,
    Local,
};
use serde::Serialize;

use crate::{
    core::TenderError,
    persistence::app_data_dir,
};

/// A file handed over to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveredArtifact {
    pub path: PathBuf,
    pub filename: String,
    pub size: usize,
    pub content_type: Option<String>,
    pub completed_at: DateTime<Local>,
}

/// Where exported artifacts end up: the "save file" half of a download.
pub trait DownloadSink: Send + Sync {
    /// Saves `bytes` under a name derived from `filename` and returns the final path.
    fn deliver(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, TenderError>;
}

/// Saves downloads into a directory, browser style.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's download directory, or the app data dir when there is none.
    pub fn user_downloads() -> Self {
        Self::new(dirs::download_dir().unwrap_or_else(app_data_dir))
    }

    /// `name.ext`, then `name (1).ext`, `name (2).ext`, ... for the first free slot.
    fn available_path(&self, filename: &str) -> PathBuf {
        let candidate = self.dir.join(filename);
        if !candidate.exists() {
            return candidate;
        }

        let path = Path::new(filename);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
        let extension = path.extension().and_then(|e| e.to_str());

        (1..)
            .map(|n| match extension {
                Some(ext) => self.dir.join(format!("{} ({}).{}", stem, n, ext)),
                None => self.dir.join(format!("{} ({})", stem, n)),
            })
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, TenderError> {
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return Err(TenderError::Custom(format!("Invalid download filename: {:?}", filename)));
        }

        fs::create_dir_all(&self.dir)?;

        let staging = self.dir.join(format!(".{}.partial", filename));
        let target = self.available_path(filename);

        let result = fs::write(&staging, bytes).and_then(|_| fs::rename(&staging, &target));
        // The staging file never outlives the call.
        let _ = fs::remove_file(&staging);
        result?;

        Ok(target)
    }
}
