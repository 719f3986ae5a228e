//! # Application State
//!
//! Shared state for the Axum application: the rule registry and the
//! default signing key, held by the bulk engine so `/bulk` and the
//! single-document routes see the same configuration.

use std::sync::Arc;

use docket_crypto::PrivateKey;
use docket_doc::Registry;
use docket_engine::Bulk;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub bulk: Bulk,
}

impl AppState {
    /// Create a new application state.
    pub fn new(registry: Arc<Registry>, default_key: PrivateKey) -> Self {
        Self {
            bulk: Bulk::new(registry, default_key),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.bulk.registry()
    }

    /// Key used by `/sign` when the request carries none.
    pub fn default_key(&self) -> &PrivateKey {
        self.bulk.default_key()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("default_kid", &self.default_key().kid())
            .finish_non_exhaustive()
    }
}
