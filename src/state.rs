use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::AppConfig;
use crate::error::BridgeError;
use crate::routing::normalize_base_path;
use crate::transport::BackendClient;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub backend: BackendClient,
    base_path: String,
    requests: AtomicU64,
}

impl AppState {
    /// Build state from validated config.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend client cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, BridgeError> {
        let backend = BackendClient::new(&config)?;
        let base_path = normalize_base_path(&config.server.base_path);
        tracing::info!(
            backend = %backend.chat_url(),
            base_path = %base_path,
            "application state initialized"
        );
        Ok(Self {
            config,
            backend,
            base_path,
            requests: AtomicU64::new(0),
        })
    }

    /// Normalized route prefix (`""` or `/prefix`).
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Sequence number for the next chat request, starting at 1.
    pub fn next_request_seq(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[must_use]
    pub fn requests_served(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}
