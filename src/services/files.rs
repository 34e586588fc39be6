//! File service
//!
//! Moves file payloads between HTTP bodies and the block store, and keeps
//! the record store in step.

use crate::error::AppError;
use crate::models::{File, NewFile};
use crate::state::AppState;
use crate::store::StagedBlock;
use axum::extract::multipart::Field;
use tokio::fs;
use tracing::{error, info, warn};

/// An upload whose payload is fully staged but not yet committed
///
/// Dropping it discards the staged payload.
pub struct ReceivedUpload {
    block: StagedBlock,
    filename: Option<String>,
    content_type: Option<String>,
}

/// File service
pub struct FileService;

impl FileService {
    /// Stream one multipart field into a staged block
    ///
    /// The payload is written chunk by chunk; if the request is cancelled or
    /// the payload passes the upload ceiling, the staged data is discarded.
    /// Nothing reaches the block store until [`FileService::store`].
    ///
    /// # Returns
    /// * `Ok(ReceivedUpload)` - The staged payload and its part headers
    /// * `Err(AppError)` - Malformed body, oversized payload or storage failure
    pub async fn receive(
        state: &AppState,
        mut field: Field<'_>,
    ) -> Result<ReceivedUpload, AppError> {
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        let mut block = state.blocks.stage(state.limits.max_upload_bytes).await?;
        while let Some(chunk) = field.chunk().await? {
            block.write_chunk(&chunk).await?;
        }

        Ok(ReceivedUpload {
            block,
            filename,
            content_type,
        })
    }

    /// Commit a received payload and record it as a new file
    ///
    /// If the record cannot be written, the committed blob is removed again
    /// unless another file already points at the same content.
    pub async fn store(
        state: &AppState,
        namespace_id: &str,
        upload: ReceivedUpload,
    ) -> Result<File, AppError> {
        let block = upload.block.commit().await?;
        let new_file = NewFile::uploaded(
            namespace_id,
            upload.filename.as_deref(),
            upload.content_type.as_deref(),
            block.sha256,
            block.size,
        );

        match Self::create(state, &new_file).await {
            Ok(file) => Ok(file),
            Err(e) => {
                Self::discard_unreferenced(state, &new_file.data_sha256).await;
                Err(e)
            }
        }
    }

    /// Remove a blob that no file record points at
    async fn discard_unreferenced(state: &AppState, data_sha256: &str) {
        match state.db.blob_in_use(data_sha256).await {
            Ok(false) => {
                if let Err(e) = state.blocks.remove(data_sha256).await {
                    warn!(sha256 = %data_sha256, error = %e, "Failed to remove orphaned block");
                }
            }
            Ok(true) => {}
            Err(e) => {
                warn!(sha256 = %data_sha256, error = %e, "Could not check block references");
            }
        }
    }

    /// Record a received payload as a new file
    pub async fn create(state: &AppState, new_file: &NewFile) -> Result<File, AppError> {
        let file = state.db.insert_file(new_file).await?;
        info!(
            file_id = %file.id,
            namespace_id = %file.namespace_id,
            filename = ?file.filename,
            size = file.size,
            "Stored uploaded file"
        );
        Ok(file)
    }

    /// Look up a file and open its payload for streaming
    ///
    /// # Returns
    /// * `Ok((File, fs::File))` - Metadata and an open handle on the payload
    /// * `Err(AppError::FileNotFound)` - No such file in the namespace
    pub async fn open(
        state: &AppState,
        namespace_id: &str,
        file_id: &str,
    ) -> Result<(File, fs::File), AppError> {
        let stored = state
            .db
            .get_file(namespace_id, file_id)
            .await?
            .ok_or_else(|| AppError::FileNotFound(file_id.to_string()))?;

        let handle = state.blocks.read(&stored.data_sha256).await.map_err(|e| {
            error!(
                file_id = %file_id,
                sha256 = %stored.data_sha256,
                error = %e,
                "File record has no readable payload"
            );
            AppError::from(e)
        })?;

        Ok((stored.file, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::state::create_test_state;
    use tokio::io::AsyncReadExt;

    async fn store_payload(state: &AppState, payload: &[u8]) -> NewFile {
        let mut staged: StagedBlock = state.blocks.stage(1024).await.unwrap();
        staged.write_chunk(payload).await.unwrap();
        let block = staged.commit().await.unwrap();
        NewFile::uploaded("ns", Some("notes.txt"), Some("text/plain"), block.sha256, block.size)
    }

    #[tokio::test]
    async fn test_create_then_open() {
        let (state, _dir) = create_test_state(ApiConfig::default()).await;
        let new_file = store_payload(&state, b"meeting notes").await;
        let file = FileService::create(&state, &new_file).await.unwrap();
        assert_eq!(file.size, 13);

        let (meta, mut handle) = FileService::open(&state, "ns", &file.id).await.unwrap();
        assert_eq!(meta, file);
        let mut content = Vec::new();
        handle.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"meeting notes");
    }

    #[tokio::test]
    async fn test_open_unknown_file() {
        let (state, _dir) = create_test_state(ApiConfig::default()).await;
        let result = FileService::open(&state, "ns", "nonexistent").await;
        match result.unwrap_err() {
            AppError::FileNotFound(_) => {
                // Expected error
            }
            other => {
                panic!("Expected FileNotFound error, got: {:?}", other);
            }
        }
    }

    #[tokio::test]
    async fn test_discard_unreferenced() {
        let (state, _dir) = create_test_state(ApiConfig::default()).await;
        let kept = store_payload(&state, b"kept").await;
        FileService::create(&state, &kept).await.unwrap();
        let orphan = store_payload(&state, b"orphan").await;

        FileService::discard_unreferenced(&state, &kept.data_sha256).await;
        FileService::discard_unreferenced(&state, &orphan.data_sha256).await;

        assert!(state.blocks.read(&kept.data_sha256).await.is_ok());
        assert!(state.blocks.read(&orphan.data_sha256).await.is_err());
    }

    #[tokio::test]
    async fn test_open_missing_payload_is_internal() {
        let (state, _dir) = create_test_state(ApiConfig::default()).await;
        let new_file = NewFile::uploaded("ns", None, None, "0".repeat(64), 0);
        let file = FileService::create(&state, &new_file).await.unwrap();

        let result = FileService::open(&state, "ns", &file.id).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
