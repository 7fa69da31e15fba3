use std::sync::{
    atomic::{
        AtomicU64,
        Ordering,
    },
    Arc,
    Mutex,
    Weak,
};

use crate::core::UPDATE_SIGNAL;

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, Handler)>>,
}

impl Registry {
    fn handlers(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Handler)>> {
        self.handlers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: u64) {
        self.handlers().retain(|(handler_id, _)| *handler_id != id);
    }
}

/// Payload-free "re-read the store now" notification.
///
/// Clones share the same subscriber list. Handlers are called in registration order.
#[derive(Clone, Default)]
pub struct UpdateSignal {
    registry: Arc<Registry>,
}

impl UpdateSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &'static str {
        UPDATE_SIGNAL
    }

    pub fn subscribe<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.handlers().push((id, Arc::new(handler)));
        Unsubscribe { id, registry: Arc::downgrade(&self.registry) }
    }

    /// Notifies every current subscriber and returns how many were called.
    pub fn emit(&self) -> usize {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let snapshot: Vec<Handler> =
            self.registry.handlers().iter().map(|(_, handler)| handler.clone()).collect();
        for handler in &snapshot {
            handler();
        }
        snapshot.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers().len()
    }
}

/// Subscription guard. Deregisters on [`Unsubscribe::unsubscribe`] or when dropped.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct Unsubscribe {
    id: u64,
    registry: Weak<Registry>,
}

impl Unsubscribe {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
