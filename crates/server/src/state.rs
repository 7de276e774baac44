//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::FastprintConfig;
use crate::db::Storage;
use crate::media::MediaStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services borrow the storage and media store
/// for the duration of a request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: FastprintConfig,
    storage: Storage,
    media: MediaStore,
}

impl AppState {
    /// Create a new application state. Uploads are written below
    /// `config.media_root`.
    #[must_use]
    pub fn new(config: FastprintConfig, storage: Storage) -> Self {
        let media = MediaStore::new(config.media_root.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                media,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &FastprintConfig {
        &self.inner.config
    }

    /// Get a reference to the repositories.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    /// Get a reference to the upload store.
    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }
}
