use std::sync::{
    Arc,
    Mutex,
};

use serde::{
    de::DeserializeOwned,
    Serialize,
};
use tokio::runtime::Handle;

use super::{
    signal::Unsubscribe,
    store::ResultStore,
};
use crate::{
    core::AnalysisResult,
    export::{
        ArtifactExporter,
        ExportHandle,
        ExportState,
    },
};

/// The results panel: shows the current result and offers the spreadsheet download.
///
/// Reads the store once on mount and again on every update signal, so it always
/// reflects the latest successful write.
pub struct ResultsSection<T = AnalysisResult> {
    exporter: ArtifactExporter<T>,
    runtime: Handle,
    current: Arc<Mutex<Option<T>>>,
    subscription: Option<Unsubscribe>,
}

impl<T> ResultsSection<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn mount(exporter: ArtifactExporter<T>, runtime: Handle) -> Self {
        let store: ResultStore<T> = exporter.store().clone();
        let current = Arc::new(Mutex::new(store.read()));

        let reader = store.clone();
        let snapshot = current.clone();
        let subscription = store.subscribe(move || {
            let latest = reader.read();
            *snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = latest;
        });

        Self { exporter, runtime, current, subscription: Some(subscription) }
    }

    pub fn current(&self) -> Option<T> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// The download action is only offered when there is something to export.
    pub fn is_export_available(&self) -> bool {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).is_some()
    }

    /// Starts an export in the background. `None` when there is nothing to export or
    /// an export is still running, like a disabled button.
    pub fn request_export(&self) -> Option<ExportHandle> {
        if !self.is_export_available() || self.exporter.is_requesting() {
            return None;
        }
        Some(self.exporter.spawn_export(&self.runtime))
    }

    pub fn export_state(&self) -> ExportState {
        self.exporter.state()
    }

    pub fn status_line(&self) -> Option<String> {
        self.exporter.state().status_line()
    }

    /// Stops listening for updates and cancels an export still in flight.
    pub fn unmount(self) {}
}

impl<T> Drop for ResultsSection<T> {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            self.exporter.cancel();
        }
    }
}
