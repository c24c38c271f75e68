//! Shared collaborator services injected into every plugin.
//!
//! None of these are owned by a plugin: the host creates one [`Services`]
//! bundle at startup and every plugin context receives a clone of the same
//! handles.
//!
//! | Handle | Trait | Default |
//! |--------|-------|---------|
//! | session | [`Session`] | [`NullSession`] |
//! | store | [`Store`] | [`MemoryStore`] |
//! | metrics | [`Metrics`] | [`CounterMetrics`] |
//! | translator | [`Translator`] | [`CatalogTranslator`] |
//! | scheduler | [`Scheduler`] | (concrete type) |

mod metrics;
mod scheduler;
mod session;
mod store;
mod translate;

use std::sync::Arc;

pub use metrics::{CounterMetrics, Metrics};
pub use scheduler::Scheduler;
pub use session::{NullSession, Session};
pub use store::{MemoryStore, Store, StoreExt};
pub use translate::{CatalogTranslator, Translator};

/// The bundle of service handles handed to plugin constructors.
#[derive(Clone)]
pub struct Services {
    /// Transport/session handle used to talk back to the platform.
    pub session: Arc<dyn Session>,
    /// Persistent key-value store.
    pub store: Arc<dyn Store>,
    /// Shared counters.
    pub metrics: Arc<dyn Metrics>,
    /// Translation lookup.
    pub translator: Arc<dyn Translator>,
    /// Background task scheduler.
    pub scheduler: Scheduler,
}

impl Services {
    /// Creates a bundle backed entirely by in-process defaults.
    pub fn in_memory() -> Self {
        Self {
            session: Arc::new(NullSession),
            store: Arc::new(MemoryStore::new()),
            metrics: Arc::new(CounterMetrics::new()),
            translator: Arc::new(CatalogTranslator::default()),
            scheduler: Scheduler::new(),
        }
    }

    /// Replaces the session handle.
    pub fn with_session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = session;
        self
    }

    /// Replaces the store handle.
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the metrics handle.
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replaces the translation lookup.
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("session", &self.session.id())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
