pub mod config;
pub mod errors;
pub mod http;
pub mod merge;

pub use config::{
    AppConfig,
    ExportConfig,
    EXPORT_FILENAME,
    STORAGE_KEY,
    UPDATE_SIGNAL,
};
pub use errors::{
    ExportFailure,
    TenderError,
};
pub use merge::{
    merge_analyses,
    RawAnalysis,
    UploadResponse,
};

/// Analysis output produced by the backend. Passed through untouched.
pub type AnalysisResult = serde_json::Value;
