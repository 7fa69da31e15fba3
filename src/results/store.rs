use std::{
    marker::PhantomData,
    sync::Arc,
};

use serde::{
    de::DeserializeOwned,
    Serialize,
};

use super::signal::{
    Unsubscribe,
    UpdateSignal,
};
use crate::{
    core::{
        AnalysisResult,
        TenderError,
        STORAGE_KEY,
    },
    persistence::Storage,
};

/// The single current analysis result, persisted under [`STORAGE_KEY`].
///
/// Every successful [`write`](ResultStore::write) is followed by exactly one
/// [`UpdateSignal`] emit; failed writes emit nothing and leave the previous value
/// in place. Last write wins.
pub struct ResultStore<T = AnalysisResult> {
    storage: Arc<dyn Storage>,
    signal: UpdateSignal,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for ResultStore<T> {
    fn clone(&self) -> Self {
        Self { storage: self.storage.clone(), signal: self.signal.clone(), _payload: PhantomData }
    }
}

impl<T> ResultStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_signal(storage, UpdateSignal::new())
    }

    pub fn with_signal(storage: Arc<dyn Storage>, signal: UpdateSignal) -> Self {
        Self { storage, signal, _payload: PhantomData }
    }

    pub fn signal(&self) -> &UpdateSignal {
        &self.signal
    }

    pub fn write(&self, result: &T) -> Result<(), TenderError> {
        let json = serde_json::to_string(result)?;
        if let Err(e) = self.storage.set_item(STORAGE_KEY, &json) {
            eprintln!(
                "Failed to store {}: {}. Keeping previous result, {} not sent.",
                STORAGE_KEY,
                e,
                self.signal.name()
            );
            return Err(match e {
                TenderError::StorageUnavailable(_) => e,
                other => TenderError::StorageUnavailable(other.to_string()),
            });
        }
        self.signal.emit();
        Ok(())
    }

    /// The stored result, or `None` when nothing usable is stored.
    ///
    /// Unreadable storage and corrupt JSON both read as absent.
    pub fn read(&self) -> Option<T> {
        let raw = self.read_raw()?;
        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                let corrupt = TenderError::CorruptStoredValue(e.to_string());
                eprintln!("Ignoring {}: {}", STORAGE_KEY, corrupt);
                None
            }
        }
    }

    pub fn read_raw(&self) -> Option<String> {
        match self.storage.get_item(STORAGE_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("Failed to read {}: {}", STORAGE_KEY, e);
                None
            }
        }
    }

    pub fn clear(&self) -> Result<(), TenderError> {
        self.storage.remove_item(STORAGE_KEY)?;
        self.signal.emit();
        Ok(())
    }

    pub fn subscribe<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.signal.subscribe(handler)
    }
}
