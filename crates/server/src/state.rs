//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::realtime::{Broadcaster, PresenceRegistry};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// store, the presence registry, and the broadcaster. The registry is owned
/// here and injected everywhere else - there is no ambient global presence
/// state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    presence: Arc<PresenceRegistry>,
    broadcaster: Broadcaster,
}

impl AppState {
    /// Create a new application state around a store implementation.
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<dyn Store>) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&presence));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                presence,
                broadcaster,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the persistence store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the presence registry.
    #[must_use]
    pub fn presence(&self) -> &PresenceRegistry {
        &self.inner.presence
    }

    /// Get a reference to the mutation broadcaster.
    #[must_use]
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }
}
