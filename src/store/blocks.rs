//! Content-addressed block store
//!
//! Payloads are stored on local disk under the hex SHA-256 of their content,
//! fanned out as `<root>/ab/cd/abcd…`. Writes go through a [`StagedBlock`]
//! which deletes its staging file on drop unless committed, so an upload
//! abandoned mid-stream leaves nothing behind.

use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

const STAGING_DIR: &str = "tmp";

/// Block store errors
#[derive(Error, Debug)]
pub enum BlockError {
    /// Payload grew past the configured ceiling
    #[error("payload exceeds {limit} bytes")]
    TooLarge {
        /// Ceiling in bytes
        limit: u64,
    },

    /// Key is not a hex SHA-256 digest
    #[error("invalid block key: {0}")]
    InvalidKey(String),

    /// No blob stored under this key
    #[error("block missing: {0}")]
    Missing(String),

    /// Filesystem failure
    #[error("block store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Location and size of a committed blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlock {
    /// Hex SHA-256 of the content
    pub sha256: String,
    /// Content length in bytes
    pub size: u64,
}

/// Filesystem-backed block store
#[derive(Debug, Clone)]
pub struct BlockStore {
    root: PathBuf,
}

impl BlockStore {
    /// Open (and create if needed) a block store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlockError> {
        let root = root.into();
        fs::create_dir_all(root.join(STAGING_DIR)).await?;
        debug!(root = %root.display(), "Opened block store");
        Ok(Self { root })
    }

    /// Begin writing a new blob of at most `limit` bytes
    pub async fn stage(&self, limit: u64) -> Result<StagedBlock, BlockError> {
        let path = self
            .root
            .join(STAGING_DIR)
            .join(format!("{}.part", Uuid::new_v4()));
        let file = fs::File::create(&path).await?;

        Ok(StagedBlock {
            file: Some(file),
            path,
            final_root: self.root.clone(),
            hasher: Sha256::new(),
            size: 0,
            limit,
            committed: false,
        })
    }

    /// Open a stored blob for streaming
    pub async fn read(&self, sha256: &str) -> Result<fs::File, BlockError> {
        let path = blob_path(&self.root, sha256)?;
        fs::File::open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => BlockError::Missing(sha256.to_string()),
            _ => BlockError::Io(e),
        })
    }

    /// Delete a stored blob; a blob that is already gone is not an error
    pub async fn remove(&self, sha256: &str) -> Result<(), BlockError> {
        let path = blob_path(&self.root, sha256)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(sha256 = %sha256, "Removed block");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlockError::Io(e)),
        }
    }

    #[cfg(test)]
    fn staging_entries(&self) -> usize {
        std::fs::read_dir(self.root.join(STAGING_DIR))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn blob_path(root: &Path, sha256: &str) -> Result<PathBuf, BlockError> {
    let valid = sha256.len() == 64
        && sha256
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !valid {
        return Err(BlockError::InvalidKey(sha256.to_string()));
    }
    Ok(root.join(&sha256[0..2]).join(&sha256[2..4]).join(sha256))
}

/// A blob being written; removed from disk on drop unless committed
pub struct StagedBlock {
    file: Option<fs::File>,
    path: PathBuf,
    final_root: PathBuf,
    hasher: Sha256,
    size: u64,
    limit: u64,
    committed: bool,
}

impl StagedBlock {
    #[cfg(test)]
    fn size(&self) -> u64 {
        self.size
    }

    /// Append a chunk, failing once the running size passes the limit
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), BlockError> {
        let new_size = self.size + chunk.len() as u64;
        if new_size > self.limit {
            return Err(BlockError::TooLarge { limit: self.limit });
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| {
                BlockError::Io(std::io::Error::other("staged block already closed"))
            })?;
        file.write_all(chunk).await?;
        self.hasher.update(chunk);
        self.size = new_size;
        Ok(())
    }

    /// Flush the staged data and move it to its content address
    pub async fn commit(mut self) -> Result<StoredBlock, BlockError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        let sha256 = hex::encode(std::mem::take(&mut self.hasher).finalize());
        let dest = blob_path(&self.final_root, &sha256)?;

        if fs::try_exists(&dest).await? {
            // Identical content already stored; the staging file is dropped below
            debug!(sha256 = %sha256, "Block already present, deduplicated");
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(&self.path, &dest).await?;
            self.committed = true;
        }

        Ok(StoredBlock {
            sha256,
            size: self.size,
        })
    }
}

impl Drop for StagedBlock {
    fn drop(&mut self) {
        self.file.take();
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove staged block");
            }
        }
    }
}
