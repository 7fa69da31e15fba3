//! Spreadsheet export of the current analysis result.
//!
//! The stored result is posted as JSON to `{api_base}/download_excel`; a 2xx reply body
//! is handed to a [`DownloadSink`] under the fixed file name. Each call moves the
//! exporter through [`ExportState`]:
//!
//! ```text
//! Idle -> Requesting -> Succeeded | Failed
//! ```
//!
//! Starting a new export supersedes one that is still in flight. A superseded attempt
//! never delivers a file.

pub mod download;
pub mod handle;

use std::sync::{
    atomic::{
        AtomicU64,
        Ordering,
    },
    Arc,
    Mutex,
    MutexGuard,
};

use reqwest::{
    header::CONTENT_TYPE,
    Client,
};
use serde::{
    de::DeserializeOwned,
    Serialize,
};
use tokio::{
    runtime::Handle,
    task::AbortHandle,
};

pub use download::{
    DeliveredArtifact,
    DirectorySink,
    DownloadSink,
};
pub use handle::{
    ExportHandle,
    ExportOutcome,
};

use crate::{
    core::{
        http,
        AnalysisResult,
        ExportConfig,
        ExportFailure,
        TenderError,
    },
    results::ResultStore,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExportState {
    #[default]
    Idle,
    Requesting,
    Succeeded(DeliveredArtifact),
    Failed(ExportFailure),
}

impl ExportState {
    /// Text to show next to the export button, if any.
    pub fn status_line(&self) -> Option<String> {
        match self {
            ExportState::Idle => None,
            ExportState::Requesting => Some("Preparing spreadsheet...".to_string()),
            ExportState::Succeeded(artifact) => {
                Some(format!("Saved {} to {}", artifact.filename, artifact.path.display()))
            }
            ExportState::Failed(ExportFailure::Cancelled) => Some("Export cancelled.".to_string()),
            ExportState::Failed(failure) if failure.is_retryable() => {
                Some(format!("Export failed: {}. Try again.", failure))
            }
            ExportState::Failed(failure) => Some(format!("Export failed: {}.", failure)),
        }
    }
}

struct Inner<T> {
    store: ResultStore<T>,
    client: Client,
    config: ExportConfig,
    sink: Arc<dyn DownloadSink>,
    state: Mutex<ExportState>,
    generation: AtomicU64,
    spawns: AtomicU64,
    in_flight: Mutex<Option<(u64, AbortHandle)>>,
}

pub struct ArtifactExporter<T = AnalysisResult> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ArtifactExporter<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> ArtifactExporter<T> {
    pub fn store(&self) -> &ResultStore<T> {
        &self.inner.store
    }

    pub fn state(&self) -> ExportState {
        lock(&self.inner.state).clone()
    }

    pub fn is_requesting(&self) -> bool {
        matches!(*lock(&self.inner.state), ExportState::Requesting)
    }

    /// Clears a finished outcome. Does nothing while a request is in flight.
    pub fn reset(&self) {
        let mut state = lock(&self.inner.state);
        if !matches!(*state, ExportState::Requesting) {
            *state = ExportState::Idle;
        }
    }

    /// Supersedes whatever attempt is in flight without starting a new one.
    ///
    /// If that attempt is already saving its file, this waits until the save is done
    /// and the attempt keeps its outcome.
    pub fn cancel(&self) {
        {
            let mut state = lock(&self.inner.state);
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            if matches!(*state, ExportState::Requesting) {
                *state = ExportState::Idle;
            }
        }
        if let Some((_, task)) = lock(&self.inner.in_flight).take() {
            task.abort();
        }
    }
}

impl<T> ArtifactExporter<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        store: ResultStore<T>,
        config: ExportConfig,
        sink: Arc<dyn DownloadSink>,
    ) -> Result<Self, TenderError> {
        let client = http::http_client(config.timeout)?;
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                client,
                config,
                sink,
                state: Mutex::new(ExportState::Idle),
                generation: AtomicU64::new(0),
                spawns: AtomicU64::new(0),
                in_flight: Mutex::new(None),
            }),
        })
    }

    /// Runs the export on `runtime`, cancelling any export spawned earlier.
    pub fn spawn_export(&self, runtime: &Handle) -> ExportHandle {
        self.cancel();

        let spawn_id = self.inner.spawns.fetch_add(1, Ordering::SeqCst);
        let exporter = self.clone();
        let join_handle = runtime.spawn(async move { exporter.export_current_result().await });
        *lock(&self.inner.in_flight) = Some((spawn_id, join_handle.abort_handle()));

        let canceller = self.clone();
        ExportHandle::new(join_handle, move || canceller.cancel_spawned(spawn_id))
    }

    fn cancel_spawned(&self, spawn_id: u64) {
        let still_in_flight =
            lock(&self.inner.in_flight).as_ref().is_some_and(|(id, _)| *id == spawn_id);
        if still_in_flight {
            self.cancel();
        }
    }

    /// Exports the stored result. `Ok(None)` means nothing was stored and no request
    /// was made; a finished outcome from an earlier export is cleared in that case.
    pub async fn export_current_result(&self) -> ExportOutcome {
        let Some(result) = self.inner.store.read() else {
            println!("No tender result stored; nothing to export");
            self.reset();
            return Ok(None);
        };

        let attempt = self.begin_attempt();
        println!(
            "Requesting {} from {}",
            self.inner.config.filename,
            self.inner.config.endpoint_url()
        );

        match self.fetch_artifact(&result).await {
            Ok((bytes, content_type)) => self.deliver(attempt, &bytes, content_type),
            Err(failure) => self.finish_failed(attempt, failure),
        }
    }

    // The generation only changes while the state lock is held.
    fn begin_attempt(&self) -> u64 {
        let mut state = lock(&self.inner.state);
        *state = ExportState::Requesting;
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == attempt
    }

    fn finish_failed(&self, attempt: u64, failure: ExportFailure) -> ExportOutcome {
        let mut state = lock(&self.inner.state);
        if !self.is_current(attempt) {
            return Err(ExportFailure::Cancelled);
        }
        eprintln!("Export failed: {}", failure);
        *state = ExportState::Failed(failure.clone());
        Err(failure)
    }

    /// Saves the file and records the outcome with the state lock held, so a cancel
    /// either lands before the generation check or after the outcome is recorded.
    fn deliver(&self, attempt: u64, bytes: &[u8], content_type: Option<String>) -> ExportOutcome {
        let config = &self.inner.config;
        let mut state = lock(&self.inner.state);
        if !self.is_current(attempt) {
            return Err(ExportFailure::Cancelled);
        }

        match self.inner.sink.deliver(&config.filename, bytes) {
            Ok(path) => {
                let artifact = DeliveredArtifact {
                    path,
                    filename: config.filename.clone(),
                    size: bytes.len(),
                    content_type,
                    completed_at: chrono::Local::now(),
                };
                println!("Export saved to {} ({} bytes)", artifact.path.display(), artifact.size);
                *state = ExportState::Succeeded(artifact.clone());
                Ok(Some(artifact))
            }
            Err(e) => {
                let failure = ExportFailure::Delivery(e.to_string());
                eprintln!("Export failed: {}", failure);
                *state = ExportState::Failed(failure.clone());
                Err(failure)
            }
        }
    }

    async fn fetch_artifact(&self, result: &T) -> Result<(Vec<u8>, Option<String>), ExportFailure> {
        let config = &self.inner.config;
        let body = serde_json::to_vec(result).map_err(|e| ExportFailure::Encode(e.to_string()))?;

        let response = self
            .inner
            .client
            .post(config.endpoint_url())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ExportFailure::from_reqwest(e, config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportFailure::RequestFailed { status: status.as_u16() });
        }

        let content_type = http::content_type(&response);
        let bytes =
            response.bytes().await.map_err(|e| ExportFailure::from_reqwest(e, config.timeout))?;
        Ok((bytes.to_vec(), content_type))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::persistence::MemoryStorage;

    struct RejectingSink;

    impl DownloadSink for RejectingSink {
        fn deliver(
            &self,
            _filename: &str,
            _bytes: &[u8],
        ) -> Result<std::path::PathBuf, TenderError> {
            Err(TenderError::Custom("should not be called".to_string()))
        }
    }

    fn exporter(api_base: &str) -> ArtifactExporter {
        let store = ResultStore::new(Arc::new(MemoryStorage::new()));
        let config = ExportConfig::new(api_base).with_timeout(Duration::from_millis(500));
        ArtifactExporter::new(store, config, Arc::new(RejectingSink)).unwrap()
    }

    #[tokio::test]
    async fn test_absent_result_is_a_no_op() {
        // Nothing listens on this port; a request would fail rather than return Ok(None).
        let exporter = exporter("http://127.0.0.1:9");
        assert_eq!(exporter.export_current_result().await, Ok(None));
        assert_eq!(exporter.state(), ExportState::Idle);
    }

    #[tokio::test]
    async fn test_connection_failure_is_reported() {
        let exporter = exporter("http://127.0.0.1:9");
        exporter.store().write(&json!({"score": 1})).unwrap();

        let outcome = exporter.export_current_result().await;
        assert!(matches!(
            outcome,
            Err(ExportFailure::Network(_)) | Err(ExportFailure::Timeout(_))
        ));
        assert!(matches!(exporter.state(), ExportState::Failed(_)));
        assert!(exporter.state().status_line().unwrap().starts_with("Export failed"));

        exporter.reset();
        assert_eq!(exporter.state(), ExportState::Idle);
    }

    #[tokio::test]
    async fn test_export_after_clear_returns_to_idle() {
        let exporter = exporter("http://127.0.0.1:9");
        exporter.store().write(&json!({"score": 1})).unwrap();
        assert!(exporter.export_current_result().await.is_err());
        assert!(matches!(exporter.state(), ExportState::Failed(_)));

        exporter.store().clear().unwrap();
        assert_eq!(exporter.export_current_result().await, Ok(None));
        assert_eq!(exporter.state(), ExportState::Idle);
        assert_eq!(exporter.state().status_line(), None);
    }

    #[test]
    fn test_delivery_failure_is_reported() {
        let exporter = exporter("http://127.0.0.1:9");
        let outcome = exporter.deliver(0, b"xlsx", None);
        assert!(matches!(outcome, Err(ExportFailure::Delivery(_))));
        assert!(matches!(exporter.state(), ExportState::Failed(ExportFailure::Delivery(_))));
    }

    #[test]
    fn test_superseded_attempt_does_not_deliver() {
        let exporter = exporter("http://127.0.0.1:9");
        let attempt = exporter.begin_attempt();
        exporter.cancel();

        // RejectingSink would turn a delivery into a Delivery failure.
        assert_eq!(exporter.deliver(attempt, b"xlsx", None), Err(ExportFailure::Cancelled));
        assert_eq!(exporter.state(), ExportState::Idle);
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(ExportState::Idle.status_line(), None);
        assert_eq!(
            ExportState::Failed(ExportFailure::RequestFailed { status: 500 }).status_line(),
            Some("Export failed: backend responded with HTTP 500. Try again.".to_string())
        );
        assert_eq!(
            ExportState::Failed(ExportFailure::Cancelled).status_line(),
            Some("Export cancelled.".to_string())
        );
    }
}
