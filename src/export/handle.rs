use tokio::task::JoinHandle;

use super::download::DeliveredArtifact;
use crate::core::ExportFailure;

pub type ExportOutcome = Result<Option<DeliveredArtifact>, ExportFailure>;

/// A spawned export attempt.
pub struct ExportHandle {
    join_handle: JoinHandle<ExportOutcome>,
    canceller: Box<dyn Fn() + Send + Sync>,
}

impl ExportHandle {
    pub(crate) fn new<F>(join_handle: JoinHandle<ExportOutcome>, canceller: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self { join_handle, canceller: Box::new(canceller) }
    }

    /// Stops the attempt. It resolves to [`ExportFailure::Cancelled`] and never delivers.
    pub fn cancel(&self) {
        (self.canceller)();
        self.join_handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }

    pub async fn join(self) -> ExportOutcome {
        match self.join_handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(ExportFailure::Cancelled),
            Err(e) => Err(ExportFailure::Network(format!("export task failed: {}", e))),
        }
    }
}
