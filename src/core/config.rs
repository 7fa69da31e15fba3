use std::{
    path::PathBuf,
    time::Duration,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    core::TenderError,
    persistence::{
        app_data_dir,
        load_json_or_default,
        save_json,
    },
};

const CONFIG_FILE: &str = "config.json";

/// Storage key holding the current analysis result.
pub const STORAGE_KEY: &str = "tender_result";
/// Name of the notification fired after every successful store write.
pub const UPDATE_SIGNAL: &str = "tender_result_updated";
pub const EXPORT_ENDPOINT: &str = "download_excel";
pub const EXPORT_FILENAME: &str = "analyzed_tender.xlsx";

const DEFAULT_API_BASE: &str = "http://localhost:8000";
const DEFAULT_EXPORT_TIMEOUT_SECS: u64 = 60;
// Typical browser localStorage budget.
const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base: String,
    pub export_timeout_secs: u64,
    pub download_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub storage_quota_bytes: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            export_timeout_secs: DEFAULT_EXPORT_TIMEOUT_SECS,
            download_dir: None,
            data_dir: None,
            storage_quota_bytes: Some(DEFAULT_STORAGE_QUOTA_BYTES),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        app_data_dir().join(CONFIG_FILE)
    }

    /// The saved `config.json` as-is, without environment overrides.
    pub fn load_saved() -> Self {
        load_json_or_default(&Self::config_path())
    }

    /// Saved config with `TENDER_*` environment overrides applied.
    pub fn load() -> Self {
        let mut config = Self::load_saved();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    pub fn save(&self) -> Result<(), TenderError> {
        save_json(self, &Self::config_path())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_base) = lookup("TENDER_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.api_base = api_base.trim().to_string();
        }

        if let Some(raw) = lookup("TENDER_EXPORT_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.export_timeout_secs = secs,
                _ => eprintln!("Ignoring invalid TENDER_EXPORT_TIMEOUT_SECS: {:?}", raw),
            }
        }

        if let Some(dir) = lookup("TENDER_DOWNLOAD_DIR").filter(|v| !v.is_empty()) {
            self.download_dir = Some(PathBuf::from(dir));
        }

        if let Some(dir) = lookup("TENDER_DATA_DIR").filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            api_base: self.api_base.clone(),
            timeout: Duration::from_secs(self.export_timeout_secs.max(1)),
            filename: EXPORT_FILENAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub api_base: String,
    pub timeout: Duration,
    pub filename: String,
}

impl ExportConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            timeout: Duration::from_secs(DEFAULT_EXPORT_TIMEOUT_SECS),
            filename: EXPORT_FILENAME.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint_url(&self) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), EXPORT_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TENDER_API_BASE", " https://api.example.com/ "),
            ("TENDER_EXPORT_TIMEOUT_SECS", "15"),
            ("TENDER_DOWNLOAD_DIR", "/tmp/downloads"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_base, "https://api.example.com/");
        assert_eq!(config.export_timeout_secs, 15);
        assert_eq!(config.download_dir, Some(PathBuf::from("/tmp/downloads")));
        assert_eq!(config.data_dir, None);

        let export = config.export_config();
        assert_eq!(export.endpoint_url(), "https://api.example.com/download_excel");
        assert_eq!(export.timeout, Duration::from_secs(15));
        assert_eq!(export.filename, "analyzed_tender.xlsx");
    }

    #[test]
    fn test_invalid_timeout_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|name| match name {
            "TENDER_EXPORT_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config.export_timeout_secs, DEFAULT_EXPORT_TIMEOUT_SECS);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"api_base": "http://backend"}"#).unwrap();
        assert_eq!(config.api_base, "http://backend");
        assert_eq!(config.export_timeout_secs, DEFAULT_EXPORT_TIMEOUT_SECS);
        assert_eq!(config.storage_quota_bytes, Some(DEFAULT_STORAGE_QUOTA_BYTES));
    }
}
