// Application state shared by every request handler

use crate::config::{ApiConfig, Config};
use crate::error::AppError;
use crate::store::{BlockStore, InboxDb};
use std::sync::Arc;
use tracing::info;

/// Main application state
///
/// Cheap to clone: the database pool is shared behind an `Arc` and the
/// block store only holds its root path.
#[derive(Clone)]
pub struct AppState {
    /// Contact and file metadata
    pub db: Arc<InboxDb>,
    /// File payloads
    pub blocks: BlockStore,
    /// Pagination and upload limits
    pub limits: ApiConfig,
}

impl AppState {
    /// Create state from already opened stores
    pub fn new(db: InboxDb, blocks: BlockStore, limits: ApiConfig) -> Self {
        Self {
            db: Arc::new(db),
            blocks,
            limits,
        }
    }

    /// Open the database and block store described by `config`
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db = InboxDb::new(&config.storage.database_path).await?;
        let blocks = BlockStore::open(config.storage.blocks_dir()).await?;
        info!(
            data_dir = %config.storage.data_dir.display(),
            max_limit = config.api.max_limit,
            max_upload_bytes = config.api.max_upload_bytes,
            "Application state initialized"
        );
        Ok(Self::new(db, blocks, config.api))
    }
}

/// State backed by a throwaway directory; keep the `TempDir` alive for the
/// duration of the test
#[cfg(test)]
pub(crate) async fn create_test_state(limits: ApiConfig) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = InboxDb::new(&dir.path().join("inbox.db"))
        .await
        .expect("Failed to open database");
    let blocks = BlockStore::open(dir.path().join("blocks"))
        .await
        .expect("Failed to open block store");
    (AppState::new(db, blocks, limits), dir)
}
