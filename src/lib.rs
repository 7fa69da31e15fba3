pub mod core;
pub mod export;
pub mod persistence;
pub mod results;

use std::sync::Arc;

pub use crate::{
    core::{
        AnalysisResult,
        AppConfig,
        ExportConfig,
        ExportFailure,
        TenderError,
    },
    export::{
        ArtifactExporter,
        DeliveredArtifact,
        DirectorySink,
        DownloadSink,
        ExportHandle,
        ExportState,
    },
    persistence::{
        FileStorage,
        MemoryStorage,
        Storage,
    },
    results::{
        ResultStore,
        ResultsSection,
        UpdateSignal,
    },
};

/// Opens the on-disk result store described by `config`.
pub fn open_store(config: &AppConfig) -> Result<ResultStore, TenderError> {
    let storage = match &config.data_dir {
        Some(dir) => FileStorage::open(dir)?,
        None => FileStorage::open_default()?,
    }
    .with_quota(config.storage_quota_bytes);
    Ok(ResultStore::new(Arc::new(storage)))
}

/// Wires an exporter over `store` that saves into the configured download directory.
pub fn exporter_for(
    config: &AppConfig,
    store: ResultStore,
) -> Result<ArtifactExporter, TenderError> {
    let sink = match &config.download_dir {
        Some(dir) => DirectorySink::new(dir),
        None => DirectorySink::user_downloads(),
    };
    ArtifactExporter::new(store, config.export_config(), Arc::new(sink))
}
